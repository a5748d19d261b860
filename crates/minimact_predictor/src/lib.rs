//! # minimact_predictor - Predictive Patch Cache
//!
//! Learns, per state-change shape, which patch list a transition produced,
//! so common transitions can be applied before the authoritative render
//! finishes.
//!
//! ## Lifecycle
//!
//! 1. `predict(change, current)` before rendering: an optimistic patch list,
//!    or nothing
//! 2. the caller renders and calls `learn(change, old, new)` with the real
//!    trees, which reinforces or revises the pattern
//!
//! Confidence rises toward a ceiling on consistent observations and is
//! scaled down (not reset) on an inconsistent one, so a single outlier does
//! not discard an otherwise reliable pattern. Each state key's resident
//! patterns, the number of distinct state keys and the table's estimated
//! memory are bounded; the configured [`EvictionPolicy`] picks what goes.
//!
//! ## Example
//!
//! ```
//! use minimact_predictor::{Predictor, StateChange};
//! use minimact_vdom::{HexPath, VElement, VNode};
//!
//! let root = HexPath::root().child(0);
//! let view = |n: u32| -> VNode {
//!     VElement::new("span", root.clone())
//!         .with_child(VNode::text(n.to_string(), root.child(0)))
//!         .into()
//! };
//!
//! let predictor = Predictor::new();
//! let change = StateChange::new().with("count", 0, 1);
//! predictor.learn(&change, &view(0), &view(1));
//!
//! let prediction = predictor.predict(&change, &view(0)).unwrap();
//! assert_eq!(prediction.patches.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod pattern;
pub mod persistence;
pub mod predictor;
pub mod state;
pub mod stats;

pub use config::{EvictionPolicy, PredictorConfig};
pub use error::{PredictorError, Result};
pub use pattern::{PatternTable, PredictionPattern, TableLimits};
pub use persistence::{PredictorSnapshot, SNAPSHOT_VERSION};
pub use predictor::{LearnOutcome, PredictionResult, Predictor};
pub use state::{ShapeKey, StateChange, StateShape, TransitionKind, ValueChange};
pub use stats::PredictorStats;
