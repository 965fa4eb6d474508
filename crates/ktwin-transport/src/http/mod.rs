//! HTTP transport.
//!
//! This module provides the CloudEvents binding, the outbound gateways and
//! the inbound server.

pub mod cloudevents;

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::{
    DEFAULT_TIMEOUT, HttpBroker, HttpEventStore, HttpGateway, HttpGraphSource, RequestPolicy,
};

#[cfg(feature = "http-server")]
mod server;
#[cfg(feature = "http-server")]
pub use server::{CloudEventServer, HANDLING_ERROR, PROCESSING_ERROR, router};
