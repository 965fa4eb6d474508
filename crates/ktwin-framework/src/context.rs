//! The application context shared by every handler.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use ktwin_core::{
    BoxedBroker, BoxedEventStore, Envelope, EnvelopeCodec, EnvelopeKind, KtwinResult, TwinGraph,
};

use crate::command;
use crate::graph_cache::GraphCache;

/// Everything a twin service needs to talk to its collaborators.
///
/// Cloning is cheap; clones share the graph cache and the gateways.
#[derive(Clone)]
pub struct ServiceContext {
    codec: EnvelopeCodec,
    graph: Arc<GraphCache>,
    store: BoxedEventStore,
    broker: BoxedBroker,
}

impl ServiceContext {
    /// Creates a context.
    pub fn new(
        codec: EnvelopeCodec,
        graph: GraphCache,
        store: BoxedEventStore,
        broker: BoxedBroker,
    ) -> Self {
        Self {
            codec,
            graph: Arc::new(graph),
            store,
            broker,
        }
    }

    /// Returns the envelope codec.
    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    /// Returns the graph cache.
    pub fn graph_cache(&self) -> &GraphCache {
        &self.graph
    }

    /// Returns the event store.
    pub fn store(&self) -> &BoxedEventStore {
        &self.store
    }

    /// Returns the broker.
    pub fn broker(&self) -> &BoxedBroker {
        &self.broker
    }

    /// Returns the twin graph, loading it on first use.
    pub async fn graph(&self) -> KtwinResult<Arc<TwinGraph>> {
        self.graph.get().await
    }

    /// Reloads the twin graph.
    pub async fn reload_graph(&self) -> KtwinResult<Arc<TwinGraph>> {
        self.graph.reload().await
    }

    /// Returns the latest stored envelope of a twin.
    ///
    /// `Ok(None)` means the twin has no stored state yet.
    pub async fn latest(
        &self,
        interface_name: &str,
        instance_id: &str,
    ) -> KtwinResult<Option<Envelope>> {
        match self.store.get_latest(interface_name, instance_id).await? {
            Some(msg) => self.codec.decode(&msg).map(Some),
            None => Ok(None),
        }
    }

    /// Stores `envelope` as the latest state of its twin.
    ///
    /// The envelope is sent with the `store` kind, keeping its id and
    /// timestamp.
    pub async fn persist(&self, envelope: &Envelope) -> KtwinResult<()> {
        let msg = self.codec.to_wire_as(envelope, EnvelopeKind::Stored)?;
        debug!(
            interface = %envelope.interface(),
            instance = %envelope.instance_id(),
            "Persisting twin state"
        );
        self.store.put(msg).await
    }

    /// Sends a command to the twin related to `source_instance`.
    ///
    /// See [`command::publish_command`].
    pub async fn publish_command<T: Serialize>(
        &self,
        command_name: &str,
        payload: &T,
        relationship_name: &str,
        source_instance: &str,
    ) -> KtwinResult<()> {
        let graph = self.graph().await?;
        command::publish_command(
            &self.codec,
            self.broker.as_ref(),
            command_name,
            payload,
            relationship_name,
            source_instance,
            &graph,
        )
        .await
    }

    /// Publishes an event for a twin.
    pub async fn publish_event<T: Serialize>(
        &self,
        interface_name: &str,
        instance_id: &str,
        kind: EnvelopeKind,
        payload: &T,
    ) -> KtwinResult<()> {
        command::publish_event(
            &self.codec,
            self.broker.as_ref(),
            interface_name,
            instance_id,
            kind,
            payload,
        )
        .await
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("codec", &self.codec)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use ktwin_core::{EventStore, GraphLoader, KtwinError, TwinGraphNode, TwinInstanceRef};
    use ktwin_transport::{LoopbackBroker, MemoryEventStore, StaticGraphSource};

    use super::*;

    fn context(store: Arc<MemoryEventStore>, broker: Arc<LoopbackBroker>) -> ServiceContext {
        let graph = TwinGraph::new().with_node(
            TwinGraphNode::new("spot-1", "spot")
                .with_relationship(TwinInstanceRef::new("refParking", "parking", "ofp-1")),
        );
        let loader = GraphLoader::new(Arc::new(StaticGraphSource::new(graph)), ["spot-1"]);
        ServiceContext::new(EnvelopeCodec::default(), GraphCache::new(loader), store, broker)
    }

    #[tokio::test]
    async fn test_persist_then_latest() {
        let store = Arc::new(MemoryEventStore::new());
        let ctx = context(store.clone(), Arc::new(LoopbackBroker::new()));

        assert!(ctx.latest("parking", "ofp-1").await.unwrap().is_none());

        let envelope = ctx
            .codec()
            .build("parking", "ofp-1", EnvelopeKind::Observation, &json!({"n": 1}))
            .unwrap();
        ctx.persist(&envelope).await.unwrap();

        let raw = store.get_latest("parking", "ofp-1").await.unwrap().unwrap();
        assert_eq!(raw.event_type, "ktwin.store.parking");

        let latest = ctx.latest("parking", "ofp-1").await.unwrap().unwrap();
        assert_eq!(latest.kind(), &EnvelopeKind::Stored);
        assert_eq!(latest.id(), envelope.id());
        assert_eq!(latest.payload(), envelope.payload());
    }

    #[tokio::test]
    async fn test_publish_command_uses_cached_graph() {
        let broker = Arc::new(LoopbackBroker::new());
        let ctx = context(Arc::new(MemoryEventStore::new()), broker.clone());

        ctx.publish_command("Reset", &json!({}), "refParking", "spot-1")
            .await
            .unwrap();
        assert!(ctx.graph_cache().cached().is_some());

        let err = ctx
            .publish_command("Reset", &json!({}), "refPole", "spot-1")
            .await
            .unwrap_err();
        assert!(matches!(err, KtwinError::RelationshipNotFound { .. }));

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "ktwin.command.parking.reset");
    }
}
