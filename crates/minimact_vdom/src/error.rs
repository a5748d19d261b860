//! Error types for the node and patch model

use crate::path::HexPath;
use thiserror::Error;

/// Result type for node-model operations
pub type Result<T> = std::result::Result<T, VdomError>;

/// Errors raised while parsing, validating or patching a node tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VdomError {
    /// Input was not a well-formed node or patch document
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Output could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A configured size limit was exceeded
    #[error("Limit exceeded: {what} is {actual}, limit is {limit}")]
    LimitExceeded {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    /// Two nodes in one tree carry the same path
    #[error("Duplicate path in tree: {0}")]
    DuplicatePath(HexPath),

    /// A patch addressed a path that does not exist in the tree
    #[error("Path not found: {0}")]
    PathNotFound(HexPath),

    /// A patch expected an element at this path
    #[error("Node at {0} is not an element")]
    NotAnElement(HexPath),

    /// A patch expected a text node at this path
    #[error("Node at {0} is not a text node")]
    NotText(HexPath),

    /// A child index fell outside the parent's child list
    #[error("Child index {index} out of bounds for {parent} ({len} children)")]
    IndexOutOfBounds {
        parent: HexPath,
        index: usize,
        len: usize,
    },

    /// A reorder list was not a permutation of the child indices
    #[error("Invalid reorder for {parent}: {reason}")]
    InvalidOrder { parent: HexPath, reason: String },
}

impl VdomError {
    /// Create a limit-exceeded error
    pub fn limit(what: &'static str, actual: usize, limit: usize) -> Self {
        VdomError::LimitExceeded {
            what,
            actual,
            limit,
        }
    }

    /// Whether this error came from a malformed or oversized input document
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            VdomError::Deserialization(_) | VdomError::LimitExceeded { .. } | VdomError::DuplicatePath(_)
        )
    }
}

impl From<serde_json::Error> for VdomError {
    fn from(err: serde_json::Error) -> Self {
        VdomError::Deserialization(err.to_string())
    }
}
