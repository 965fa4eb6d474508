//! Twin graph data model.
//!
//! The JSON form matches what the graph service returns for one instance:
//!
//! ```json
//! {
//!   "twinInstances": [
//!     {
//!       "name": "ngsi-ld-city-offstreetparkingspot-nb001-p00007",
//!       "interface": "ngsi-ld-city-offstreetparkingspot",
//!       "relationships": [
//!         {
//!           "name": "refOffStreetParking",
//!           "interface": "ngsi-ld-city-offstreetparking",
//!           "instance": "ngsi-ld-city-offstreetparking-nb001-ofp0005"
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A named edge to another twin instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TwinInstanceRef {
    /// Relationship name.
    pub name: String,
    /// Interface of the target twin.
    #[serde(rename = "interface")]
    pub interface_name: String,
    /// Instance id of the target twin.
    #[serde(rename = "instance")]
    pub instance_id: String,
}

impl TwinInstanceRef {
    /// Creates a relationship reference.
    pub fn new(
        name: impl Into<String>,
        interface_name: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            interface_name: interface_name.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// A twin instance and its outgoing relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwinGraphNode {
    /// Instance name.
    pub name: String,
    /// Interface of this instance.
    #[serde(rename = "interface")]
    pub interface_name: String,
    /// Outgoing relationships, in declaration order.
    #[serde(default)]
    pub relationships: Vec<TwinInstanceRef>,
}

impl TwinGraphNode {
    /// Creates a node without relationships.
    pub fn new(name: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface_name: interface_name.into(),
            relationships: Vec::new(),
        }
    }

    /// Adds a relationship.
    pub fn with_relationship(mut self, relationship: TwinInstanceRef) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// The set of twin instances known to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwinGraph {
    /// Nodes in load order.
    #[serde(rename = "twinInstances", default)]
    pub nodes: Vec<TwinGraphNode>,
}

impl TwinGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    pub fn with_node(mut self, node: TwinGraphNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Parses a graph from its JSON form.
    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node with the given name.
    pub fn node(&self, name: &str) -> Option<&TwinGraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Appends the nodes of `fragment` whose names are not present yet.
    ///
    /// Returns the number of nodes added.
    pub fn union(&mut self, fragment: TwinGraph) -> usize {
        let mut seen: HashSet<String> = self.nodes.iter().map(|n| n.name.clone()).collect();
        let before = self.nodes.len();

        for node in fragment.nodes {
            if seen.insert(node.name.clone()) {
                self.nodes.push(node);
            }
        }

        self.nodes.len() - before
    }
}
