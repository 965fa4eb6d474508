//! Integration layer - contracts with the services a twin talks to.
//!
//! Transports provide implementations of these traits; the framework only
//! depends on the traits.
//!
//! ```text
//! ┌──────────────┐  fetch_fragment   ┌───────────────┐
//! │ GraphLoader  │──────────────────▶│  GraphSource  │
//! └──────────────┘                   └───────────────┘
//! ┌──────────────┐  get_latest / put ┌───────────────┐
//! │ServiceContext│──────────────────▶│  EventStore   │
//! │              │  publish          ├───────────────┤
//! │              │──────────────────▶│    Broker     │
//! └──────────────┘                   └───────────────┘
//! ┌──────────────┐  on_wire          ┌───────────────┐
//! │ HTTP server  │──────────────────▶│ EnvelopeSink  │
//! └──────────────┘                   └───────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::KtwinResult;
use crate::foundation::wire::WireMessage;
use crate::graph::model::TwinGraph;

// =============================================================================
// Graph Source
// =============================================================================

/// Provides the graph fragment of one twin instance.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Fetches the fragment for `instance_name`.
    ///
    /// Returns `Ok(None)` when the source does not know the instance.
    async fn fetch_fragment(&self, instance_name: &str) -> KtwinResult<Option<TwinGraph>>;
}

/// Shared graph source.
pub type BoxedGraphSource = Arc<dyn GraphSource>;

// =============================================================================
// Event Store
// =============================================================================

/// Latest-state storage per twin.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Returns the most recent stored event of a twin, if any.
    async fn get_latest(
        &self,
        interface_name: &str,
        instance_id: &str,
    ) -> KtwinResult<Option<WireMessage>>;

    /// Stores `msg` as the latest event of its twin.
    async fn put(&self, msg: WireMessage) -> KtwinResult<()>;
}

/// Shared event store.
pub type BoxedEventStore = Arc<dyn EventStore>;

// =============================================================================
// Broker
// =============================================================================

/// Outbound publication of events and commands.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publishes `msg`.
    async fn publish(&self, msg: WireMessage) -> KtwinResult<()>;
}

/// Shared broker.
pub type BoxedBroker = Arc<dyn Broker>;

// =============================================================================
// Envelope Sink
// =============================================================================

/// Receiver of inbound wire messages.
///
/// The HTTP server hands every request it accepts to a sink.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    /// Processes one inbound message.
    async fn on_wire(&self, msg: WireMessage) -> KtwinResult<()>;
}

/// Shared envelope sink.
pub type BoxedEnvelopeSink = Arc<dyn EnvelopeSink>;
