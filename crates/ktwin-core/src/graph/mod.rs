//! Twin graph: model, loading and relationship lookups.

pub mod loader;
pub mod model;
pub mod resolver;

pub use loader::{GraphLoader, SNAPSHOT_FILE};
pub use model::{TwinGraph, TwinGraphNode, TwinInstanceRef};
pub use resolver::{resolve_by_name, resolve_by_target_interface};
