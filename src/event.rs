use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A change notification with timestamp.
///
/// Listeners should read this as "something changed, re-read the graph",
/// not as a precise diff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EntityKind,
    pub id: String,
    pub operation: ChangeOperation,
}

impl ChangeEvent {
    /// Create a new event with the current timestamp
    pub fn new(kind: EntityKind, id: impl Into<String>, operation: ChangeOperation) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            id: id.into(),
            operation,
        }
    }
}

/// Which collection a change touched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Edge,
    Boundary,
    /// Whole-graph changes: batches, undo/redo, loads
    Graph,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
            EntityKind::Boundary => "boundary",
            EntityKind::Graph => "graph",
        };
        f.write_str(name)
    }
}

/// Types of changes a listener can observe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Add,
    Update,
    Delete,
    Batch,
    Undo,
    Redo,
    Restore,
    Load,
    Clear,
}

/// Handle returned by `GraphStore::add_change_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Boxed change listener
pub type ChangeListener = Box<dyn FnMut(&ChangeEvent) + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = ChangeEvent::new(EntityKind::Node, "n1", ChangeOperation::Add);

        assert!(event.timestamp <= Utc::now());
        assert_eq!(event.id, "n1");
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::Boundary.to_string(), "boundary");
        assert_ne!(EntityKind::Node, EntityKind::Edge);
    }

    #[test]
    fn test_event_serialization() {
        let event = ChangeEvent::new(EntityKind::Edge, "e1", ChangeOperation::Delete);

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ChangeEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.kind, EntityKind::Edge);
        assert_eq!(deserialized.operation, ChangeOperation::Delete);
        assert_eq!(deserialized.id, "e1");
    }
}
