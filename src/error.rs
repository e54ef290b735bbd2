use crate::event::EntityKind;
use crate::validation::{ValidationIssue, ValidationResult};

/// Typed failure of a store operation. A rejected mutation leaves the store unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Validation produced at least one error-severity issue
    #[error("{kind} {id} rejected: {}", summarize(.issues))]
    Rejected {
        kind: EntityKind,
        id: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("id already in use: {id}")]
    DuplicateId { id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Wholesale graph validation failed; nothing was loaded
    #[error("graph rejected with {} error(s)", .result.errors().len())]
    InvalidGraph { result: ValidationResult },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("checkpoint not found: {name}")]
    CheckpointNotFound { name: String },
}

impl StoreError {
    /// Validation codes carried by a rejection, if any
    pub fn codes(&self) -> Vec<&str> {
        match self {
            StoreError::Rejected { issues, .. } => issues.iter().map(|i| i.code.as_str()).collect(),
            StoreError::InvalidGraph { result } => {
                result.errors().into_iter().map(|i| i.code.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{} ({})", i.message, i.code))
        .collect::<Vec<_>>()
        .join("; ")
}
