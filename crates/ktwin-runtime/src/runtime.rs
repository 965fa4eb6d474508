//! Service lifecycle: inbound server, dispatch and shutdown.
//!
//! ```text
//!  HTTP POST ──► CloudEventServer ──► DispatchSink ──► Dispatcher ──► handlers
//!                  (cloudevents)        (decode, log)     (routes)
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ktwin_runtime::{TwinRuntime, config::load_config};
//!
//! let config = load_config()?;
//! let runtime = TwinRuntime::from_config(config, |ctx| {
//!     Dispatcher::new().on_event(SPOT_INTERFACE, spot_handler(ctx.clone()))
//! })?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ktwin_core::{EnvelopeSink, KtwinResult, WireMessage};
use ktwin_framework::{Dispatcher, ServiceContext};
use ktwin_transport::CloudEventServer;

use crate::config::KtwinConfig;
use crate::context::build_context;
use crate::error::RuntimeResult;
use crate::logging;

// =============================================================================
// Dispatch Sink
// =============================================================================

/// Decodes inbound messages and runs them through a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchSink {
    ctx: ServiceContext,
    dispatcher: Arc<Dispatcher>,
}

impl DispatchSink {
    /// Creates a sink dispatching with `ctx`.
    pub fn new(ctx: ServiceContext, dispatcher: Arc<Dispatcher>) -> Self {
        Self { ctx, dispatcher }
    }
}

#[async_trait]
impl EnvelopeSink for DispatchSink {
    async fn on_wire(&self, msg: WireMessage) -> KtwinResult<()> {
        let envelope = self.ctx.codec().decode(&msg)?;

        info!(
            instance = %envelope.instance_id(),
            interface = %envelope.interface(),
            kind = envelope.kind().wire_token(),
            "Event received"
        );

        let handled = self.dispatcher.dispatch(&self.ctx, &envelope).await?;
        debug!(id = %envelope.id(), handled, "Event dispatched");
        Ok(())
    }
}

// =============================================================================
// Twin Runtime
// =============================================================================

/// A twin service: configuration, collaborators and routes.
pub struct TwinRuntime {
    config: KtwinConfig,
    ctx: ServiceContext,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
}

impl TwinRuntime {
    /// Creates a runtime from already built parts.
    pub fn new(config: KtwinConfig, ctx: ServiceContext, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            ctx,
            dispatcher: Arc::new(dispatcher),
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a runtime for `config`.
    ///
    /// Initializes logging, builds the collaborators for the configured mode
    /// and registers the routes returned by `routes`.
    pub fn from_config<F>(config: KtwinConfig, routes: F) -> RuntimeResult<Self>
    where
        F: FnOnce(&ServiceContext) -> Dispatcher,
    {
        logging::init_from_config(&config.logging);

        let ctx = build_context(&config)?;
        let dispatcher = routes(&ctx);

        info!(
            service = %config.service.name,
            routes = dispatcher.len(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(Self::new(config, ctx, dispatcher))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KtwinConfig {
        &self.config
    }

    /// Returns the service context.
    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Returns a token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Returns the sink feeding the dispatcher.
    pub fn sink(&self) -> DispatchSink {
        DispatchSink::new(self.ctx.clone(), self.dispatcher.clone())
    }

    /// Preloads the graph if configured and binds the inbound server.
    pub async fn start(&self) -> RuntimeResult<CloudEventServer> {
        if self.config.service.preload_graph {
            let graph = self.ctx.graph().await?;
            info!(nodes = graph.len(), "Twin graph preloaded");
        }

        let server = CloudEventServer::bind(
            &self.config.server.bind_addr(),
            &self.config.server.path,
            Arc::new(self.sink()),
        )
        .await?;

        Ok(server)
    }

    /// Serves until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = self.start().await?;
        server.serve(shutdown).await?;
        Ok(())
    }

    /// Serves until Ctrl+C, SIGTERM or the shutdown token.
    pub async fn run(&self) -> RuntimeResult<()> {
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => token.cancel(),
                _ = token.cancelled() => {}
            }
        });

        self.run_until(self.shutdown.clone().cancelled_owned()).await
    }
}

impl std::fmt::Debug for TwinRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwinRuntime")
            .field("service", &self.config.service.name)
            .field("mode", &self.config.service.mode)
            .field("routes", &self.dispatcher.len())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
