//! Error types for the core library

use core::fmt;

/// Reasons a handle failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Handle is the null sentinel
    Null,
    /// Handle is stale (its slot was freed, possibly reused since)
    Stale,
    /// Handle index was never allocated
    OutOfBounds,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Null => write!(f, "Handle is null"),
            HandleError::Stale => write!(f, "Handle is stale (already destroyed)"),
            HandleError::OutOfBounds => write!(f, "Handle index out of bounds"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HandleError {}
