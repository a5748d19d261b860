//! Error types and status codes for the C boundary

use crate::strings;
use minimact_core::HandleError;
use minimact_predictor::PredictorError;
use minimact_reconciler::ReconcileError;
use minimact_vdom::VdomError;
use std::ffi::c_char;
use thiserror::Error;

/// Result type for boundary operations
pub type Result<T> = std::result::Result<T, FfiError>;

/// Status codes reported to the host
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success = 0,
    Deserialization = 1,
    UnknownHandle = 2,
    InvalidUtf8 = 3,
    NullPointer = 4,
    LimitExceeded = 5,
    Serialization = 6,
    InternalInvariantViolation = 7,
    InvalidString = 8,
}

/// Errors surfaced across the boundary
#[derive(Debug, Error)]
pub enum FfiError {
    /// An input payload could not be parsed
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Handle was destroyed, never issued, or the invalid sentinel
    #[error("Unknown predictor handle {handle:#x}: {reason}")]
    UnknownHandle { handle: u64, reason: HandleError },

    /// A string argument was not UTF-8
    #[error("Argument '{0}' is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A required pointer argument was null
    #[error("Argument '{0}' is null")]
    NullPointer(&'static str),

    /// An input payload exceeded a size limit
    #[error("{0}")]
    LimitExceeded(VdomError),

    /// A result could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Something that must not happen did; includes caught panics
    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolation(String),

    /// A pointer passed to the free call was not a live string from this library
    #[error("Pointer {0:#x} is not a live string allocated by this library")]
    InvalidString(usize),
}

impl FfiError {
    /// Status code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            FfiError::Deserialization(_) => ErrorCode::Deserialization,
            FfiError::UnknownHandle { .. } => ErrorCode::UnknownHandle,
            FfiError::InvalidUtf8(_) => ErrorCode::InvalidUtf8,
            FfiError::NullPointer(_) => ErrorCode::NullPointer,
            FfiError::LimitExceeded(_) => ErrorCode::LimitExceeded,
            FfiError::Serialization(_) => ErrorCode::Serialization,
            FfiError::InternalInvariantViolation(_) => ErrorCode::InternalInvariantViolation,
            FfiError::InvalidString(_) => ErrorCode::InvalidString,
        }
    }

    /// Create an unknown-handle error
    pub fn unknown_handle(handle: u64, reason: HandleError) -> Self {
        FfiError::UnknownHandle { handle, reason }
    }
}

impl From<VdomError> for FfiError {
    fn from(err: VdomError) -> Self {
        match err {
            VdomError::LimitExceeded { .. } => FfiError::LimitExceeded(err),
            VdomError::Serialization(message) => FfiError::Serialization(message),
            e if e.is_input_error() => FfiError::Deserialization(e.to_string()),
            e => FfiError::InternalInvariantViolation(e.to_string()),
        }
    }
}

impl From<ReconcileError> for FfiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::InvalidTree(e) => e.into(),
            ReconcileError::InternalInvariantViolation(message) => {
                FfiError::InternalInvariantViolation(message)
            }
        }
    }
}

impl From<PredictorError> for FfiError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::Serialization(message) => FfiError::Serialization(message),
            e if e.is_deserialization() => FfiError::Deserialization(e.to_string()),
            e => FfiError::InternalInvariantViolation(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for FfiError {
    fn from(err: serde_json::Error) -> Self {
        FfiError::Deserialization(err.to_string())
    }
}

/// Status returned by fallible entry points
///
/// `message` is null on success. On failure it is a string owned by the
/// library; release it with `minimact_free_string`.
#[repr(C)]
#[derive(Debug)]
pub struct FfiResult {
    pub code: i32,
    pub message: *mut c_char,
}

impl FfiResult {
    /// Successful status
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: std::ptr::null_mut(),
        }
    }

    /// Failed status carrying the error's message
    pub fn from_error(err: &FfiError) -> Self {
        Self {
            code: err.code() as i32,
            message: strings::into_raw_lossy(err.to_string()),
        }
    }

    /// Whether this is a success status
    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success as i32
    }
}
