//! Error types for reconciliation

use minimact_vdom::VdomError;
use thiserror::Error;

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors that can occur while reconciling two trees
///
/// A structural mismatch between the roots is not an error: it is resolved
/// by replacing the root.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    /// One of the input trees was rejected before diffing
    #[error("Invalid input tree: {0}")]
    InvalidTree(#[from] VdomError),

    /// The emitted patch list did not reproduce the new tree
    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl ReconcileError {
    /// Create an invariant-violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        ReconcileError::InternalInvariantViolation(message.into())
    }
}
