//! # KTWIN Core
//!
//! Shared building blocks of the KTWIN smart-city twin services.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! The envelope model and its wire form:
//! - **Type strings**: `ktwin.<kind>.<interface>[.<command>]` parsed into [`EventType`]
//! - **Envelopes**: decoded events with an opaque payload ([`Envelope`])
//! - **Codec**: [`EnvelopeCodec`] with an injectable [`Clock`] and [`IdSource`]
//!
//! ### Graph Layer
//!
//! The twin relationship graph:
//! - **Model**: [`TwinGraph`], [`TwinGraphNode`], [`TwinInstanceRef`]
//! - **Loading**: [`GraphLoader`] over a [`GraphSource`]
//! - **Lookups**: [`resolve_by_name`] and [`resolve_by_target_interface`]
//!
//! ### Integration Layer
//!
//! Contracts implemented by transports: [`GraphSource`], [`EventStore`],
//! [`Broker`] and [`EnvelopeSink`].
//!
//! ## Event Flow
//!
//! ```text
//! ┌────────────┐ WireMessage ┌───────────────┐ Envelope ┌────────────┐
//! │  Inbound   │────────────▶│ EnvelopeCodec │─────────▶│  Handlers  │
//! │  request   │             └───────────────┘          └─────┬──────┘
//! └────────────┘                                              │
//!                     ┌──────────────┬────────────────────────┤
//!                     ▼              ▼                        ▼
//!               ┌──────────┐   ┌──────────┐          ┌──────────────┐
//!               │EventStore│   │  Broker  │          │  TwinGraph   │
//!               └──────────┘   └──────────┘          └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ktwin_core::{EnvelopeCodec, EnvelopeKind};
//!
//! let codec = EnvelopeCodec::default();
//! let wire = codec
//!     .encode(
//!         "ngsi-ld-city-offstreetparking",
//!         "ngsi-ld-city-offstreetparking-nb001-ofp0005",
//!         EnvelopeKind::command("updatevehiclecount"),
//!         &serde_json::json!({ "vehicleEntranceCount": 1 }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(
//!     wire.event_type,
//!     "ktwin.command.ngsi-ld-city-offstreetparking.updatevehiclecount"
//! );
//!
//! let envelope = codec.decode(&wire).unwrap();
//! assert_eq!(envelope.command_name(), Some("updatevehiclecount"));
//! ```

pub mod error;
pub mod foundation;
pub mod graph;
pub mod integration;

pub use error::{KtwinError, KtwinResult};

// Re-export foundation types
pub use foundation::{
    CONTENT_TYPE_JSON, CONTENT_TYPE_STRUCTURED, Clock, DEFAULT_NAMESPACE, Envelope, EnvelopeCodec,
    EnvelopeKind, EventType, FixedClock, FixedId, IdSource, SPEC_VERSION, SystemClock, UuidSource,
    WireMessage,
};

// Re-export graph types
pub use graph::{
    GraphLoader, SNAPSHOT_FILE, TwinGraph, TwinGraphNode, TwinInstanceRef, resolve_by_name,
    resolve_by_target_interface,
};

// Re-export integration types
pub use integration::{
    BoxedBroker, BoxedEnvelopeSink, BoxedEventStore, BoxedGraphSource, Broker, EnvelopeSink,
    EventStore, GraphSource,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{KtwinError, KtwinResult};
    pub use super::foundation::{Envelope, EnvelopeCodec, EnvelopeKind, WireMessage};
    pub use super::graph::{TwinGraph, TwinInstanceRef};
    pub use super::integration::{Broker, EnvelopeSink, EventStore, GraphSource};
}
