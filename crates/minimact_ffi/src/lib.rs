//! # minimact_ffi - C ABI for the Minimact Core
//!
//! Exposes the reconciler, the predictor and the telemetry controls to a
//! host runtime through plain `extern "C"` functions. Trees, patch lists,
//! state changes and statistics cross the boundary as JSON text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Host runtime   │────▶│    exports      │  extern "C", catch_unwind
//! └─────────────────┘     └────────┬────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │    strings      │◀────│      api        │  parse, validate, dispatch
//! │ (live set)      │     └────────┬────────┘
//! └─────────────────┘              │
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │    registry     │  u64 handle -> Predictor
//!                         └─────────────────┘
//! ```
//!
//! ## Ownership
//!
//! Predictors are owned by the registry; the host holds a `u64` handle and
//! releases it with `minimact_predictor_destroy`. A destroyed handle stays
//! invalid even after its slot is reused. Strings returned by the library,
//! error messages included, are owned by the host until passed to
//! `minimact_free_string`, which detects double and foreign frees.

pub mod api;
pub mod error;
pub mod exports;
pub mod registry;
pub mod strings;

pub use error::{ErrorCode, FfiError, FfiResult, Result};
pub use exports::*;
pub use registry::{PredictorHandle, MINIMACT_INVALID_HANDLE};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api;
    pub use crate::error::{ErrorCode, FfiError, FfiResult};
    pub use crate::registry::MINIMACT_INVALID_HANDLE;
}
