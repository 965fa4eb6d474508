//! In-process collaborators for local and test runs.
//!
//! Nothing here touches the network: the graph comes from a static JSON
//! blob, the event store keeps the last event of each twin in memory, and
//! the broker records what it is asked to publish.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use ktwin_core::{
    Broker, EventStore, EventType, GraphSource, KtwinError, KtwinResult, TwinGraph, WireMessage,
};

// =============================================================================
// Static Graph
// =============================================================================

/// Returns the same graph for every instance.
#[derive(Debug, Clone, Default)]
pub struct StaticGraphSource {
    graph: TwinGraph,
}

impl StaticGraphSource {
    /// Wraps an already built graph.
    pub fn new(graph: TwinGraph) -> Self {
        Self { graph }
    }

    /// Parses the graph from its JSON form.
    pub fn from_json(raw: &str) -> KtwinResult<Self> {
        let graph = TwinGraph::from_json(raw.as_bytes())
            .map_err(|e| KtwinError::graph_load("static graph", e.to_string()))?;
        Ok(Self::new(graph))
    }
}

#[async_trait]
impl GraphSource for StaticGraphSource {
    async fn fetch_fragment(&self, _instance_name: &str) -> KtwinResult<Option<TwinGraph>> {
        Ok(Some(self.graph.clone()))
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Keeps the last stored event of each twin.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<(String, String), WireMessage>>,
}

impl MemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of twins with a stored event.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get_latest(
        &self,
        interface_name: &str,
        instance_id: &str,
    ) -> KtwinResult<Option<WireMessage>> {
        let key = (interface_name.to_string(), instance_id.to_string());
        Ok(self.events.lock().get(&key).cloned())
    }

    async fn put(&self, msg: WireMessage) -> KtwinResult<()> {
        let event_type: EventType = msg.event_type.parse()?;
        let key = (event_type.interface().to_string(), msg.source.clone());

        debug!(interface = %key.0, instance = %key.1, "Stored twin event in memory");
        self.events.lock().insert(key, msg);
        Ok(())
    }
}

// =============================================================================
// Loopback Broker
// =============================================================================

/// Records published messages instead of sending them.
#[derive(Debug, Default)]
pub struct LoopbackBroker {
    published: Mutex<Vec<WireMessage>>,
}

impl LoopbackBroker {
    /// Creates a broker with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message published so far.
    pub fn published(&self) -> Vec<WireMessage> {
        self.published.lock().clone()
    }

    /// Removes and returns every recorded message.
    pub fn drain(&self) -> Vec<WireMessage> {
        std::mem::take(&mut *self.published.lock())
    }
}

#[async_trait]
impl Broker for LoopbackBroker {
    async fn publish(&self, msg: WireMessage) -> KtwinResult<()> {
        debug!(event_type = %msg.event_type, source = %msg.source, "Loopback publish");
        self.published.lock().push(msg);
        Ok(())
    }
}
