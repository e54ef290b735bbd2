use crate::entity::Rect;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for a `GraphStore`. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub history: HistoryConfig,
    pub limits: ValidationLimits,
    pub spatial: SpatialConfig,
    pub search: SearchConfig,
    pub paths: PathConfig,
}

impl StoreConfig {
    /// Parse a config from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse store config")
    }

    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read store config: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to load store config from: {}", path.display()))
    }
}

/// Undo/redo capacity and compaction cadence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Undo stack capacity; the redo stack holds half of this
    pub max_history_size: usize,
    /// Compaction is considered once per this many recorded snapshots
    pub compression_threshold: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: 50,
            compression_threshold: 10,
        }
    }
}

/// Thresholds used by the validator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_name_length: usize,
    pub max_position_magnitude: f64,
    pub max_properties: usize,
    pub max_property_length: usize,
    pub max_edge_targets: usize,
    pub max_boundary_dimension: f64,
    pub max_graph_nodes: usize,
    pub max_graph_edges: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_name_length: 100,
            max_position_magnitude: 1_000_000.0,
            max_properties: 50,
            max_property_length: 10_000,
            max_edge_targets: 10,
            max_boundary_dimension: 100_000.0,
            max_graph_nodes: 10_000,
            max_graph_edges: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpatialConfig {
    /// Initial quadtree root; grows to cover points outside it
    pub world: Rect,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            world: Rect::new(-10_000.0, -10_000.0, 20_000.0, 20_000.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Result cap applied when `SearchOptions::limit` is unset
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 100 }
    }
}

/// Hard caps for path enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    pub max_depth: usize,
    pub max_paths: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            max_paths: 10,
        }
    }
}
