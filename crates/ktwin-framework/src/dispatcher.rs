//! Route table for a twin service.
//!
//! A [`Dispatcher`] holds the routes a service registers at startup and runs
//! each inbound envelope against all of them in registration order:
//!
//! ```text
//!                  ┌─▶ event   route (interface)            ─▶ handler
//! Envelope ──▶ Dispatcher ─▶ command route (interface, cmd) ─▶ handler(target)
//!                  └─▶ ...
//! ```

use std::sync::Arc;

use tracing::debug;

use ktwin_core::{Envelope, KtwinResult};

use crate::command::{self, handle_command};
use crate::context::ServiceContext;
use crate::event::dispatch_event;
use crate::handler::{BoxedCommandHandler, BoxedEventHandler, CommandHandler, EventHandler};

enum Route {
    Event {
        interface: String,
        handler: BoxedEventHandler,
    },
    Command {
        interface: String,
        command: String,
        handler: BoxedCommandHandler,
    },
}

/// Ordered event and command routes.
#[derive(Default)]
pub struct Dispatcher {
    routes: Vec<Route>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes events of `interface` to `handler`.
    pub fn on_event(mut self, interface: impl Into<String>, handler: impl EventHandler) -> Self {
        self.routes.push(Route::Event {
            interface: interface.into(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Routes the command `command` of `interface` to `handler`.
    pub fn on_command(
        mut self,
        interface: impl Into<String>,
        command: impl Into<String>,
        handler: impl CommandHandler,
    ) -> Self {
        self.routes.push(Route::Command {
            interface: interface.into(),
            command: command.into(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs every route against `envelope`.
    ///
    /// The graph is only loaded when a command route accepts the envelope.
    /// Returns the number of handlers that ran; the first error stops
    /// dispatch.
    pub async fn dispatch(&self, ctx: &ServiceContext, envelope: &Envelope) -> KtwinResult<usize> {
        let mut invoked = 0;

        for route in &self.routes {
            let ran = match route {
                Route::Event { interface, handler } => {
                    dispatch_event(envelope, interface, handler.as_ref()).await?
                }
                Route::Command {
                    interface,
                    command,
                    handler,
                } => {
                    if command::accepts(envelope, interface, command) {
                        let graph = ctx.graph().await?;
                        handle_command(envelope, interface, command, &graph, handler.as_ref())
                            .await?
                    } else {
                        false
                    }
                }
            };

            if ran {
                invoked += 1;
            }
        }

        if invoked == 0 {
            debug!(
                interface = %envelope.interface(),
                instance = %envelope.instance_id(),
                "No route handled the envelope"
            );
        }
        Ok(invoked)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<String> = self
            .routes
            .iter()
            .map(|route| match route {
                Route::Event { interface, .. } => format!("event:{interface}"),
                Route::Command {
                    interface, command, ..
                } => format!("command:{interface}.{command}"),
            })
            .collect();
        f.debug_struct("Dispatcher").field("routes", &routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use ktwin_core::{
        EnvelopeCodec, EnvelopeKind, GraphLoader, GraphSource, KtwinError, TwinGraph,
        TwinGraphNode, TwinInstanceRef,
    };
    use ktwin_transport::{LoopbackBroker, MemoryEventStore, StaticGraphSource};

    use super::*;
    use crate::graph_cache::GraphCache;

    const PARKING: &str = "ngsi-ld-city-offstreetparking";
    const SPOT: &str = "ngsi-ld-city-offstreetparkingspot";

    #[derive(Default)]
    struct CountingSource {
        loads: AtomicUsize,
        graph: TwinGraph,
    }

    #[async_trait]
    impl GraphSource for CountingSource {
        async fn fetch_fragment(&self, _instance_name: &str) -> KtwinResult<Option<TwinGraph>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.graph.clone()))
        }
    }

    fn graph() -> TwinGraph {
        TwinGraph::new().with_node(
            TwinGraphNode::new("spot-1", SPOT).with_relationship(TwinInstanceRef::new(
                "refOffStreetParking",
                PARKING,
                "ofp-5",
            )),
        )
    }

    fn context_with(source: Arc<dyn GraphSource>) -> (ServiceContext, Arc<MemoryEventStore>) {
        let store = Arc::new(MemoryEventStore::new());
        let ctx = ServiceContext::new(
            EnvelopeCodec::default(),
            GraphCache::new(GraphLoader::new(source, ["ofp-5"])),
            store.clone(),
            Arc::new(LoopbackBroker::new()),
        );
        (ctx, store)
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Parking {
        occupied_spot_number: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct EntranceCommand {
        entrance_count: i64,
    }

    #[tokio::test]
    async fn test_command_updates_state_from_zero_baseline() {
        let (ctx, store) = context_with(Arc::new(StaticGraphSource::new(graph())));

        let handler = {
            let ctx = ctx.clone();
            move |command: Envelope, target: TwinInstanceRef| {
                let ctx = ctx.clone();
                async move {
                    let payload: EntranceCommand = command.decode_payload()?;
                    let (mut state, parking) =
                        match ctx.latest(&target.interface_name, &target.instance_id).await? {
                            Some(latest) => {
                                let parking: Parking = latest.decode_payload()?;
                                (latest, parking)
                            }
                            None => (command.clone(), Parking::default()),
                        };

                    let updated = Parking {
                        occupied_spot_number: parking.occupied_spot_number
                            + payload.entrance_count,
                    };
                    state.set_payload(&updated)?;
                    ctx.persist(&state).await
                }
            }
        };
        let dispatcher = Dispatcher::new().on_command(PARKING, "updateVehicleCount", handler);

        let command = ctx
            .codec()
            .build(
                PARKING,
                "ofp-5",
                EnvelopeKind::command("updatevehiclecount"),
                &json!({"entranceCount": 1}),
            )
            .unwrap();

        assert_eq!(dispatcher.dispatch(&ctx, &command).await.unwrap(), 1);

        let stored = ctx.latest(PARKING, "ofp-5").await.unwrap().unwrap();
        let parking: Parking = stored.decode_payload().unwrap();
        assert_eq!(parking.occupied_spot_number, 1);
        assert_eq!(store.len(), 1);

        dispatcher.dispatch(&ctx, &command).await.unwrap();
        let stored = ctx.latest(PARKING, "ofp-5").await.unwrap().unwrap();
        assert_eq!(stored.decode_payload::<Parking>().unwrap().occupied_spot_number, 2);
    }

    #[tokio::test]
    async fn test_events_do_not_load_graph() {
        let source = Arc::new(CountingSource {
            graph: graph(),
            ..Default::default()
        });
        let (ctx, _store) = context_with(source.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let dispatcher = Dispatcher::new()
            .on_event(SPOT, move |_envelope: Envelope| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, KtwinError>(())
                }
            })
            .on_command(PARKING, "updatevehiclecount", |_c: Envelope, _t: TwinInstanceRef| {
                async { Ok::<_, KtwinError>(()) }
            });
        assert_eq!(dispatcher.len(), 2);

        let event = ctx
            .codec()
            .build(SPOT, "spot-1", EnvelopeKind::Observation, &json!({"status": "free"}))
            .unwrap();

        assert_eq!(dispatcher.dispatch(&ctx, &event).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_error_stops_dispatch() {
        let (ctx, _store) = context_with(Arc::new(StaticGraphSource::new(graph())));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let dispatcher = Dispatcher::new()
            .on_event(SPOT, |_envelope: Envelope| async {
                Err::<(), _>(KtwinError::handler("sensor offline"))
            })
            .on_event(SPOT, move |_envelope: Envelope| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, KtwinError>(())
                }
            });

        let event = ctx
            .codec()
            .build(SPOT, "spot-1", EnvelopeKind::Observation, &json!({}))
            .unwrap();

        assert!(dispatcher.dispatch(&ctx, &event).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_command_without_route_fails() {
        let (ctx, _store) = context_with(Arc::new(StaticGraphSource::default()));
        let dispatcher = Dispatcher::new().on_command(
            PARKING,
            "updatevehiclecount",
            |_c: Envelope, _t: TwinInstanceRef| async { Ok::<_, KtwinError>(()) },
        );

        let command = ctx
            .codec()
            .build(PARKING, "ofp-5", EnvelopeKind::command("updatevehiclecount"), &json!({}))
            .unwrap();

        assert!(matches!(
            dispatcher.dispatch(&ctx, &command).await,
            Err(KtwinError::NoRouteFound { .. })
        ));
    }
}
