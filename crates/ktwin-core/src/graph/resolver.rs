//! Relationship lookups over a [`TwinGraph`].
//!
//! Both lookups are pure and return the first match in load order.

use super::model::{TwinGraph, TwinInstanceRef};

/// Finds the relationship `relationship_name` declared by `instance_name`.
pub fn resolve_by_name<'g>(
    instance_name: &str,
    relationship_name: &str,
    graph: &'g TwinGraph,
) -> Option<&'g TwinInstanceRef> {
    graph
        .nodes
        .iter()
        .filter(|node| node.name == instance_name)
        .flat_map(|node| node.relationships.iter())
        .find(|rel| rel.name == relationship_name)
}

/// Finds the first relationship anywhere in the graph that points at
/// `target_interface`.
///
/// The owning node is not considered: whichever node declares a matching
/// relationship first wins.
pub fn resolve_by_target_interface<'g>(
    target_interface: &str,
    graph: &'g TwinGraph,
) -> Option<&'g TwinInstanceRef> {
    graph
        .nodes
        .iter()
        .flat_map(|node| node.relationships.iter())
        .find(|rel| rel.interface_name == target_interface)
}
