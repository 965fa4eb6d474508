//! Construction of the [`ServiceContext`] for the configured mode.
//!
//! | Mode | Graph | Event store | Broker |
//! |------|-------|-------------|--------|
//! | `live` | graph service over HTTP, snapshot written | HTTP | HTTP |
//! | `local` / `test` | `graph.static_graph` | in memory | loopback |

use std::sync::Arc;

use tracing::{debug, info};

use ktwin_core::{EnvelopeCodec, GraphLoader};
use ktwin_framework::{GraphCache, ServiceContext};
use ktwin_transport::{
    HttpBroker, HttpEventStore, HttpGateway, HttpGraphSource, LoopbackBroker, MemoryEventStore,
    RequestPolicy, StaticGraphSource,
};

use crate::config::{ConfigError, KtwinConfig};
use crate::error::{RuntimeError, RuntimeResult};

/// Builds the context described by `config`.
pub fn build_context(config: &KtwinConfig) -> RuntimeResult<ServiceContext> {
    let codec = EnvelopeCodec::new(&config.service.namespace);

    let ctx = if config.service.mode.is_offline() {
        build_offline(codec, config)?
    } else {
        build_live(codec, config)?
    };

    info!(
        service = %config.service.name,
        mode = %config.service.mode,
        seeds = config.service.seed_instances.len(),
        "Service context ready"
    );
    Ok(ctx)
}

fn build_live(codec: EnvelopeCodec, config: &KtwinConfig) -> RuntimeResult<ServiceContext> {
    let policy = RequestPolicy::default()
        .with_timeout(config.http.timeout())
        .with_retry_reads(config.http.retry_reads);
    let gateway = HttpGateway::new(policy).map_err(|e| RuntimeError::HttpClient(e.to_string()))?;

    let endpoints = &config.endpoints;
    let graph_url = required(&endpoints.graph_url, "endpoints.graph_url")?;
    let store_url = required(&endpoints.event_store_url, "endpoints.event_store_url")?;
    let broker_url = required(&endpoints.broker_url, "endpoints.broker_url")?;

    let mut loader = GraphLoader::new(
        Arc::new(HttpGraphSource::new(gateway.clone(), graph_url)),
        config.service.seed_instances.iter().cloned(),
    );
    if let Some(path) = config.service.snapshot() {
        loader = loader.with_snapshot(path.clone());
    }

    Ok(ServiceContext::new(
        codec,
        GraphCache::new(loader),
        Arc::new(HttpEventStore::new(gateway.clone(), store_url)),
        Arc::new(HttpBroker::new(gateway, broker_url)),
    ))
}

fn build_offline(codec: EnvelopeCodec, config: &KtwinConfig) -> RuntimeResult<ServiceContext> {
    let source = match config.graph.static_json() {
        Some(raw) => StaticGraphSource::from_json(raw)?,
        None => {
            debug!("No static graph configured, starting with an empty graph");
            StaticGraphSource::default()
        }
    };

    // The static source ignores the seed, but the loader needs one to fetch.
    let seeds = if config.service.seed_instances.is_empty() {
        vec![config.service.name.clone()]
    } else {
        config.service.seed_instances.clone()
    };

    Ok(ServiceContext::new(
        codec,
        GraphCache::new(GraphLoader::new(Arc::new(source), seeds)),
        Arc::new(MemoryEventStore::new()),
        Arc::new(LoopbackBroker::new()),
    ))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> RuntimeResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::missing_field(field).into())
}
