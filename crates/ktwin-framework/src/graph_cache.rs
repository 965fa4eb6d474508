//! One-time graph initialization with explicit reload.
//!
//! ```text
//! get() ──▶ cached? ──yes──▶ Arc<TwinGraph>
//!              │ no
//!              ▼
//!       lock loader ──▶ cached? ──yes──▶ Arc<TwinGraph>
//!                          │ no
//!                          ▼
//!                    GraphLoader::load ──▶ store ──▶ Arc<TwinGraph>
//! ```
//!
//! Concurrent first callers wait on the same load. A failed load leaves the
//! cache empty, so the next call tries again.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::info;

use ktwin_core::{GraphLoader, KtwinResult, TwinGraph};

/// Lazily loaded, shared twin graph.
#[derive(Debug)]
pub struct GraphCache {
    loader: GraphLoader,
    graph: RwLock<Option<Arc<TwinGraph>>>,
    loading: Mutex<()>,
}

impl GraphCache {
    /// Creates an empty cache that loads through `loader`.
    pub fn new(loader: GraphLoader) -> Self {
        Self {
            loader,
            graph: RwLock::new(None),
            loading: Mutex::new(()),
        }
    }

    /// Returns the cached graph without loading it.
    pub fn cached(&self) -> Option<Arc<TwinGraph>> {
        self.graph.read().clone()
    }

    /// Returns the graph, loading it on first use.
    pub async fn get(&self) -> KtwinResult<Arc<TwinGraph>> {
        if let Some(graph) = self.cached() {
            return Ok(graph);
        }

        let _loading = self.loading.lock().await;
        if let Some(graph) = self.cached() {
            return Ok(graph);
        }

        let graph = Arc::new(self.loader.load().await?);
        *self.graph.write() = Some(graph.clone());
        Ok(graph)
    }

    /// Loads a fresh graph and replaces the cached one.
    ///
    /// On failure the previous graph stays in place.
    pub async fn reload(&self) -> KtwinResult<Arc<TwinGraph>> {
        let _loading = self.loading.lock().await;

        let graph = Arc::new(self.loader.load().await?);
        *self.graph.write() = Some(graph.clone());

        info!(nodes = graph.len(), "Twin graph reloaded");
        Ok(graph)
    }
}
