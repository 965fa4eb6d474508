//! Graph loading from a [`GraphSource`].
//!
//! The loader asks the source for the fragment of each seed instance and
//! unions the results in seed order. A source that does not know a seed
//! contributes nothing; any other failure aborts the load.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::model::TwinGraph;
use crate::error::KtwinResult;
use crate::integration::GraphSource;

/// Default file name of the graph snapshot.
pub const SNAPSHOT_FILE: &str = "ktwin_graph.json";

/// Loads the twin graph for a set of seed instances.
#[derive(Clone)]
pub struct GraphLoader {
    source: Arc<dyn GraphSource>,
    seeds: Vec<String>,
    snapshot_path: Option<PathBuf>,
}

impl GraphLoader {
    /// Creates a loader over `source` for the given seeds.
    pub fn new<I, S>(source: Arc<dyn GraphSource>, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source,
            seeds: seeds.into_iter().map(Into::into).collect(),
            snapshot_path: None,
        }
    }

    /// Writes a JSON snapshot of every loaded graph to `path`.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Returns the seed instances.
    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    /// Loads and unions the fragments of every seed.
    pub async fn load(&self) -> KtwinResult<TwinGraph> {
        let mut graph = TwinGraph::new();

        for seed in &self.seeds {
            match self.source.fetch_fragment(seed).await? {
                Some(fragment) => {
                    let added = graph.union(fragment);
                    debug!(seed = %seed, added, "Merged graph fragment");
                }
                None => {
                    info!(seed = %seed, "No twin graph found for instance");
                }
            }
        }

        info!(nodes = graph.len(), seeds = self.seeds.len(), "Twin graph loaded");

        if let Some(path) = &self.snapshot_path {
            write_snapshot(path, &graph).await;
        }

        Ok(graph)
    }
}

impl std::fmt::Debug for GraphLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphLoader")
            .field("seeds", &self.seeds)
            .field("snapshot_path", &self.snapshot_path)
            .finish_non_exhaustive()
    }
}

async fn write_snapshot(path: &Path, graph: &TwinGraph) {
    let bytes = match serde_json::to_vec(graph) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to serialize twin graph snapshot");
            return;
        }
    };

    match tokio::fs::write(path, bytes).await {
        Ok(()) => debug!(path = %path.display(), "Wrote twin graph snapshot"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write twin graph snapshot"),
    }
}
