//! # KTWIN Transport
//!
//! Implementations of the gateway contracts defined in `ktwin-core`.
//!
//! ## Features
//!
//! - `http-client`: graph service, event store and broker gateways
//! - `http-server`: inbound CloudEvents server
//! - `full`: both
//!
//! The offline collaborators and the CloudEvents binding are always
//! available.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  ktwin-framework    │  (dispatchers, service context)
//! ├─────────────────────┤
//! │  ktwin-core         │  (gateway traits)
//! ├─────────────────────┤
//! │  ktwin-transport    │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! | Contract | Live | Offline |
//! |----------|------|---------|
//! | `GraphSource` | `HttpGraphSource` | `StaticGraphSource` |
//! | `EventStore` | `HttpEventStore` | `MemoryEventStore` |
//! | `Broker` | `HttpBroker` | `LoopbackBroker` |
//! | `EnvelopeSink` | `CloudEventServer` feeds it | - |

pub mod http;
pub mod offline;

pub use offline::{LoopbackBroker, MemoryEventStore, StaticGraphSource};

#[cfg(feature = "http-client")]
pub use http::{HttpBroker, HttpEventStore, HttpGateway, HttpGraphSource, RequestPolicy};

#[cfg(feature = "http-server")]
pub use http::CloudEventServer;
