//! # minimact_reconciler - Virtual Tree Reconciliation
//!
//! Given an old and a new tree, computes the ordered patch list that turns
//! one into the other.
//!
//! ## Rules
//!
//! - Text vs text: `UpdateText` when the content differs
//! - Null vs null: nothing
//! - Element vs element with the same tag and path: attribute patches,
//!   then child patches
//! - Anything else: one `ReplaceNode` at the old node's path, no recursion
//!
//! Children are paired by path, which under the renderer's slot numbering
//! is pairing by index. When some child carries a `key` attribute the key
//! must agree as well, and since a keyed child keeps its path when it moves,
//! moved children produce a single `ReorderChildren` instead of
//! remove/insert pairs. A child whose path changed is a different node:
//! it is removed and the new one inserted.
//!
//! ## Example
//!
//! ```
//! use minimact_reconciler::reconcile;
//! use minimact_vdom::{HexPath, Patch, VElement, VNode};
//!
//! let root = HexPath::root().child(0);
//! let old: VNode = VElement::new("div", root.clone()).with_attr("class", "x").into();
//! let new: VNode = VElement::new("div", root.clone()).with_attr("class", "y").into();
//!
//! let patches = reconcile(&old, &new).unwrap();
//! assert_eq!(patches, vec![Patch::SetAttribute {
//!     path: root,
//!     name: "class".into(),
//!     value: "y".into(),
//! }]);
//! ```

pub mod diff;
pub mod error;
pub mod reconciler;

pub use diff::diff;
pub use error::{ReconcileError, Result};
pub use reconciler::{reconcile, ReconcileConfig, Reconciler};
