//! # minimact_vdom - Virtual Node Model
//!
//! The data both sides of a reconciliation speak:
//!
//! - [`VNode`]: element, text and null nodes, each with a structural path
//! - [`HexPath`]: the path type; paths identify nodes and are preserved verbatim
//! - [`Patch`]: the seven edit operations a reconciler emits
//! - [`ValidationConfig`]: size limits enforced on every inbound tree
//! - [`apply_patches`]: a reference applier for checking patch lists
//!
//! Everything here is plain data with serde support; JSON is the boundary
//! format.

pub mod apply;
pub mod error;
pub mod node;
pub mod patch;
pub mod path;
pub mod validation;

pub use apply::{apply_patch, apply_patches, patched};
pub use error::{Result, VdomError};
pub use node::{NodeKind, VElement, VNode, VNull, VText, KEY_ATTRIBUTE};
pub use patch::{patches_from_json, patches_to_json, Patch};
pub use path::{HexPath, HEX_GAP};
pub use validation::{from_json_checked, ValidationConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::apply::{apply_patches, patched};
    pub use crate::error::VdomError;
    pub use crate::node::{VElement, VNode, VNull, VText};
    pub use crate::patch::Patch;
    pub use crate::path::HexPath;
    pub use crate::validation::ValidationConfig;
}
