use crate::entity::Properties;
use serde::{Deserialize, Serialize};

/// Transport of a data flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Https,
    Grpc,
    #[serde(other)]
    Unknown,
}

impl EdgeType {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, EdgeType::Unknown)
    }
}

/// Data flow from one node to one or more destination nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: String,

    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    /// Source node (data flows FROM this node)
    pub source: String,

    /// Destination nodes, in order (data flows TO these nodes)
    pub targets: Vec<String>,

    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        id: impl Into<String>,
        edge_type: EdgeType,
        source: impl Into<String>,
        targets: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type,
            source: source.into(),
            targets,
            properties: Properties::new(),
        }
    }

    /// Single-destination convenience constructor
    pub fn link(
        id: impl Into<String>,
        edge_type: EdgeType,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(id, edge_type, source, vec![target.into()])
    }

    /// Check if this edge involves a given node as source or target
    pub fn involves(&self, node_id: &str) -> bool {
        self.starts_from(node_id) || self.targets_node(node_id)
    }

    /// Check if this edge starts from a given node
    pub fn starts_from(&self, node_id: &str) -> bool {
        self.source == node_id
    }

    /// Check if a given node is one of this edge's targets
    pub fn targets_node(&self, node_id: &str) -> bool {
        self.targets.iter().any(|t| t == node_id)
    }

    /// Every node id this edge references, source first, duplicates included
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source.as_str()).chain(self.targets.iter().map(String::as_str))
    }

    /// Directed (source, target) arcs this edge contributes
    pub fn arcs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.targets
            .iter()
            .map(move |t| (self.source.as_str(), t.as_str()))
    }

    pub fn merged(&self, update: &EdgeUpdate) -> Edge {
        Edge {
            id: self.id.clone(),
            edge_type: update.edge_type.unwrap_or(self.edge_type),
            source: update.source.clone().unwrap_or_else(|| self.source.clone()),
            targets: update.targets.clone().unwrap_or_else(|| self.targets.clone()),
            properties: update
                .properties
                .clone()
                .unwrap_or_else(|| self.properties.clone()),
        }
    }
}

/// Partial update for an edge
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeUpdate {
    #[serde(rename = "type")]
    pub edge_type: Option<EdgeType>,
    pub source: Option<String>,
    pub targets: Option<Vec<String>>,
    pub properties: Option<Properties>,
}

impl EdgeUpdate {
    pub fn targets(targets: Vec<String>) -> Self {
        Self {
            targets: Some(targets),
            ..Default::default()
        }
    }
}
