// Diagram Graph Core - Library

pub mod algorithms;
pub mod config;
pub mod edge;
pub mod entity;
pub mod error;
pub mod event;
pub mod graph;
pub mod history;
pub mod id_generator;
pub mod search;
pub mod spatial;
pub mod store;
pub mod validation;

// Re-export main types for convenience
pub use algorithms::{BoundaryClusters, Centrality, Cycle, DataFlowPath, GraphStatistics};
pub use config::{
    HistoryConfig, PathConfig, SearchConfig, SpatialConfig, StoreConfig, ValidationLimits,
};
pub use edge::{Edge, EdgeType, EdgeUpdate};
pub use entity::{
    Boundary, BoundaryType, BoundaryUpdate, Node, NodeType, NodeUpdate, Position, Properties,
    PropertyValue, Rect, Size,
};
pub use error::StoreError;
pub use event::{ChangeEvent, ChangeListener, ChangeOperation, EntityKind, ListenerId};
pub use graph::{EntityLookup, Graph, GraphBatch, GraphLookup, GraphMetadata};
pub use history::{History, Snapshot};
pub use id_generator::IdGenerator;
pub use search::SearchOptions;
pub use spatial::QuadTree;
pub use store::{BatchReport, GraphStore, SkippedItem};
pub use validation::{
    Rule, RuleContext, ValidationCode, ValidationIssue, ValidationReport, ValidationResult,
    ValidationSeverity, Validator,
};
