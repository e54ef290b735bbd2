use crate::{Boundary, BoundaryUpdate, Edge, EdgeUpdate, Node, NodeUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Descriptive metadata carried with a graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphMetadata {
    pub name: String,
    pub version: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl GraphMetadata {
    /// Create new metadata stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            created: now,
            modified: now,
        }
    }

    /// Update the modified timestamp
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// A complete graph value: the unit of export, import and snapshotting
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub boundaries: Vec<Boundary>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(nodes: Vec<Node>, edges: Vec<Edge>, boundaries: Vec<Boundary>) -> Self {
        Self {
            nodes,
            edges,
            boundaries,
            metadata: GraphMetadata::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.boundaries.is_empty()
    }

    /// Compare entity collections only, ignoring metadata timestamps
    pub fn same_entities(&self, other: &Graph) -> bool {
        self.nodes == other.nodes
            && self.edges == other.edges
            && self.boundaries == other.boundaries
    }
}

/// Relational view used by validation rules that need to resolve references
pub trait EntityLookup {
    /// Whether a node with this id exists
    fn has_node(&self, id: &str) -> bool;

    /// Whether any entity (node, edge or boundary) uses this id
    fn has_id(&self, id: &str) -> bool;
}

/// Precomputed lookup over a graph value
pub struct GraphLookup {
    node_ids: HashSet<String>,
    all_ids: HashSet<String>,
}

impl GraphLookup {
    pub fn new(graph: &Graph) -> Self {
        let node_ids: HashSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let all_ids = node_ids
            .iter()
            .cloned()
            .chain(graph.edges.iter().map(|e| e.id.clone()))
            .chain(graph.boundaries.iter().map(|b| b.id.clone()))
            .collect();
        Self { node_ids, all_ids }
    }
}

impl EntityLookup for GraphLookup {
    fn has_node(&self, id: &str) -> bool {
        self.node_ids.contains(id)
    }

    fn has_id(&self, id: &str) -> bool {
        self.all_ids.contains(id)
    }
}

/// Grouped changes applied as one logical operation.
///
/// Applied in a fixed order: adds (nodes, edges, boundaries), then updates,
/// then deletes with edges before nodes before boundaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphBatch {
    #[serde(default)]
    pub add_nodes: Vec<Node>,
    #[serde(default)]
    pub add_edges: Vec<Edge>,
    #[serde(default)]
    pub add_boundaries: Vec<Boundary>,
    #[serde(default)]
    pub update_nodes: Vec<(String, NodeUpdate)>,
    #[serde(default)]
    pub update_edges: Vec<(String, EdgeUpdate)>,
    #[serde(default)]
    pub update_boundaries: Vec<(String, BoundaryUpdate)>,
    #[serde(default)]
    pub delete_nodes: Vec<String>,
    #[serde(default)]
    pub delete_edges: Vec<String>,
    #[serde(default)]
    pub delete_boundaries: Vec<String>,
}

impl GraphBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.add_nodes.len()
            + self.add_edges.len()
            + self.add_boundaries.len()
            + self.update_nodes.len()
            + self.update_edges.len()
            + self.update_boundaries.len()
            + self.delete_nodes.len()
            + self.delete_edges.len()
            + self.delete_boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
