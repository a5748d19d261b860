//! Patches - the edit vocabulary the reconciler emits
//!
//! A patch list is ordered: each patch addresses the tree as it stands
//! after every earlier patch in the same list has been applied.

use crate::node::VNode;
use crate::path::HexPath;
use serde::{Deserialize, Serialize};

/// A single edit operation on a virtual tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Patch {
    /// Replace a text node's content
    UpdateText { path: HexPath, content: String },
    /// Add or change an attribute
    SetAttribute {
        path: HexPath,
        name: String,
        value: String,
    },
    /// Drop an attribute
    RemoveAttribute { path: HexPath, name: String },
    /// Swap the node at `path` for a whole new subtree
    ReplaceNode { path: HexPath, node: VNode },
    /// Insert `node` so it ends up at `index` in the parent's children
    InsertChild {
        parent_path: HexPath,
        index: usize,
        node: VNode,
    },
    /// Remove the child currently at `index`
    RemoveChild { parent_path: HexPath, index: usize },
    /// Permute the parent's children
    ///
    /// `order[i]` is the current index of the child that ends up at `i`.
    ReorderChildren {
        parent_path: HexPath,
        order: Vec<usize>,
    },
}

impl Patch {
    /// The path this patch resolves against (the parent for child-list patches)
    pub fn target(&self) -> &HexPath {
        match self {
            Patch::UpdateText { path, .. }
            | Patch::SetAttribute { path, .. }
            | Patch::RemoveAttribute { path, .. }
            | Patch::ReplaceNode { path, .. } => path,
            Patch::InsertChild { parent_path, .. }
            | Patch::RemoveChild { parent_path, .. }
            | Patch::ReorderChildren { parent_path, .. } => parent_path,
        }
    }

    /// Short name of the patch kind, as it appears in JSON
    pub fn kind_name(&self) -> &'static str {
        match self {
            Patch::UpdateText { .. } => "UpdateText",
            Patch::SetAttribute { .. } => "SetAttribute",
            Patch::RemoveAttribute { .. } => "RemoveAttribute",
            Patch::ReplaceNode { .. } => "ReplaceNode",
            Patch::InsertChild { .. } => "InsertChild",
            Patch::RemoveChild { .. } => "RemoveChild",
            Patch::ReorderChildren { .. } => "ReorderChildren",
        }
    }

    /// Rough heap footprint in bytes, carried nodes included
    pub fn estimate_size(&self) -> usize {
        let payload = match self {
            Patch::UpdateText { path, content } => path.as_str().len() + content.len(),
            Patch::SetAttribute { path, name, value } => path.as_str().len() + name.len() + value.len(),
            Patch::RemoveAttribute { path, name } => path.as_str().len() + name.len(),
            Patch::ReplaceNode { path, node } => path.as_str().len() + node.estimate_size(),
            Patch::InsertChild {
                parent_path, node, ..
            } => parent_path.as_str().len() + node.estimate_size(),
            Patch::RemoveChild { parent_path, .. } => parent_path.as_str().len(),
            Patch::ReorderChildren { parent_path, order } => {
                parent_path.as_str().len() + order.len() * std::mem::size_of::<usize>()
            }
        };
        std::mem::size_of::<Patch>() + payload
    }
}

/// Serialize a patch list to JSON
pub fn patches_to_json(patches: &[Patch]) -> crate::Result<String> {
    serde_json::to_string(patches).map_err(|e| crate::VdomError::Serialization(e.to_string()))
}

/// Parse a patch list from JSON
pub fn patches_from_json(json: &str) -> crate::Result<Vec<Patch>> {
    Ok(serde_json::from_str(json)?)
}
