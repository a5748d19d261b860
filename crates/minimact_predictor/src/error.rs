//! Error types for the predictor

use thiserror::Error;

/// Result type for predictor operations
pub type Result<T> = std::result::Result<T, PredictorError>;

/// Errors that can occur in the predictor
///
/// `learn` and `predict` never fail; these come from persistence and from
/// parsing boundary payloads.
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Input was not well-formed JSON of the expected shape
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Saved state could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Snapshot was written by an incompatible format version
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Snapshot parsed but its contents are inconsistent
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PredictorError {
    /// Whether this error means the input could not be read as a snapshot
    ///
    /// Everything except an IO failure counts: the boundary reports all of
    /// them as deserialization errors.
    pub fn is_deserialization(&self) -> bool {
        !matches!(self, PredictorError::Io(_) | PredictorError::Serialization(_))
    }
}

impl From<serde_json::Error> for PredictorError {
    fn from(err: serde_json::Error) -> Self {
        PredictorError::Deserialization(err.to_string())
    }
}
