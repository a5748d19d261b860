//! Patch application
//!
//! Applies a patch list to an in-memory tree the same way a client would:
//! every path resolves against the tree as left by the preceding patches.
//! The reconciler uses this for its self-check and the predictor for its
//! applicability check; neither ships patched trees anywhere.

use crate::error::{Result, VdomError};
use crate::node::{VElement, VNode};
use crate::patch::Patch;
use crate::path::HexPath;

fn element_mut<'a>(root: &'a mut VNode, path: &HexPath) -> Result<&'a mut VElement> {
    match root.find_mut(path) {
        Some(VNode::Element(el)) => Ok(el),
        Some(_) => Err(VdomError::NotAnElement(path.clone())),
        None => Err(VdomError::PathNotFound(path.clone())),
    }
}

/// Apply a single patch in place
pub fn apply_patch(root: &mut VNode, patch: &Patch) -> Result<()> {
    match patch {
        Patch::UpdateText { path, content } => match root.find_mut(path) {
            Some(VNode::Text(text)) => {
                text.content.clone_from(content);
                Ok(())
            }
            Some(_) => Err(VdomError::NotText(path.clone())),
            None => Err(VdomError::PathNotFound(path.clone())),
        },
        Patch::SetAttribute { path, name, value } => {
            element_mut(root, path)?
                .attributes
                .insert(name.clone(), value.clone());
            Ok(())
        }
        Patch::RemoveAttribute { path, name } => {
            element_mut(root, path)?.attributes.remove(name);
            Ok(())
        }
        Patch::ReplaceNode { path, node } => {
            let target = root
                .find_mut(path)
                .ok_or_else(|| VdomError::PathNotFound(path.clone()))?;
            *target = node.clone();
            Ok(())
        }
        Patch::InsertChild {
            parent_path,
            index,
            node,
        } => {
            let parent = element_mut(root, parent_path)?;
            if *index > parent.children.len() {
                return Err(VdomError::IndexOutOfBounds {
                    parent: parent_path.clone(),
                    index: *index,
                    len: parent.children.len(),
                });
            }
            parent.children.insert(*index, node.clone());
            Ok(())
        }
        Patch::RemoveChild { parent_path, index } => {
            let parent = element_mut(root, parent_path)?;
            if *index >= parent.children.len() {
                return Err(VdomError::IndexOutOfBounds {
                    parent: parent_path.clone(),
                    index: *index,
                    len: parent.children.len(),
                });
            }
            parent.children.remove(*index);
            Ok(())
        }
        Patch::ReorderChildren { parent_path, order } => {
            let parent = element_mut(root, parent_path)?;
            reorder(parent, parent_path, order)
        }
    }
}

fn reorder(parent: &mut VElement, parent_path: &HexPath, order: &[usize]) -> Result<()> {
    let len = parent.children.len();
    if order.len() != len {
        return Err(VdomError::InvalidOrder {
            parent: parent_path.clone(),
            reason: format!("order has {} entries for {} children", order.len(), len),
        });
    }

    let mut seen = vec![false; len];
    for &from in order {
        match seen.get_mut(from) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(VdomError::InvalidOrder {
                    parent: parent_path.clone(),
                    reason: format!("index {} is out of range or repeated", from),
                })
            }
        }
    }

    let mut slots: Vec<Option<VNode>> = parent.children.drain(..).map(Some).collect();
    parent.children = order
        .iter()
        .filter_map(|&from| slots[from].take())
        .collect();
    Ok(())
}

/// Apply a patch list in place
///
/// Stops at the first failing patch; earlier patches stay applied. Use
/// [`patched`] when the original must survive a failure.
pub fn apply_patches(root: &mut VNode, patches: &[Patch]) -> Result<()> {
    for (i, patch) in patches.iter().enumerate() {
        apply_patch(root, patch).map_err(|e| {
            log::debug!("patch {} ({}) failed: {}", i, patch.kind_name(), e);
            e
        })?;
    }
    Ok(())
}

/// Apply a patch list to a copy of `root` and return the result
pub fn patched(root: &VNode, patches: &[Patch]) -> Result<VNode> {
    let mut copy = root.clone();
    apply_patches(&mut copy, patches)?;
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> VNode {
        VElement::new("ul", "1")
            .with_child(VNode::text("a", "1.1"))
            .with_child(VNode::text("b", "1.2"))
            .with_child(VNode::text("c", "1.3"))
            .into()
    }

    fn texts(node: &VNode) -> Vec<String> {
        node.children()
            .iter()
            .filter_map(|c| match c {
                VNode::Text(t) => Some(t.content.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_update_text() {
        let mut tree = list();
        apply_patch(
            &mut tree,
            &Patch::UpdateText {
                path: "1.2".into(),
                content: "B".into(),
            },
        )
        .unwrap();
        assert_eq!(texts(&tree), vec!["a", "B", "c"]);
    }

    #[test]
    fn test_update_text_on_element_fails() {
        let mut tree = list();
        let err = apply_patch(
            &mut tree,
            &Patch::UpdateText {
                path: "1".into(),
                content: "B".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err, VdomError::NotText("1".into()));
    }

    #[test]
    fn test_attributes() {
        let mut tree = list();
        apply_patches(
            &mut tree,
            &[
                Patch::SetAttribute {
                    path: "1".into(),
                    name: "class".into(),
                    value: "x".into(),
                },
                Patch::SetAttribute {
                    path: "1".into(),
                    name: "id".into(),
                    value: "y".into(),
                },
                Patch::RemoveAttribute {
                    path: "1".into(),
                    name: "id".into(),
                },
            ],
        )
        .unwrap();
        let el = tree.as_element().unwrap();
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.attributes["class"], "x");
    }

    #[test]
    fn test_insert_remove_sequence() {
        let mut tree = list();
        apply_patches(
            &mut tree,
            &[
                Patch::RemoveChild {
                    parent_path: "1".into(),
                    index: 0,
                },
                Patch::InsertChild {
                    parent_path: "1".into(),
                    index: 2,
                    node: VNode::text("d", "1.4"),
                },
            ],
        )
        .unwrap();
        assert_eq!(texts(&tree), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut tree = list();
        let err = apply_patch(
            &mut tree,
            &Patch::InsertChild {
                parent_path: "1".into(),
                index: 4,
                node: VNode::null("1.9"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, VdomError::IndexOutOfBounds { index: 4, len: 3, .. }));
    }

    #[test]
    fn test_reorder() {
        let mut tree = list();
        apply_patch(
            &mut tree,
            &Patch::ReorderChildren {
                parent_path: "1".into(),
                order: vec![2, 0, 1],
            },
        )
        .unwrap();
        assert_eq!(texts(&tree), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_invalid_reorder_leaves_children() {
        let mut tree = list();
        let err = apply_patch(
            &mut tree,
            &Patch::ReorderChildren {
                parent_path: "1".into(),
                order: vec![0, 0, 1],
            },
        )
        .unwrap_err();
        assert!(matches!(err, VdomError::InvalidOrder { .. }));
        assert_eq!(tree.children().len(), 3);

        let err = apply_patch(
            &mut tree,
            &Patch::ReorderChildren {
                parent_path: "1".into(),
                order: vec![0, 1],
            },
        )
        .unwrap_err();
        assert!(matches!(err, VdomError::InvalidOrder { .. }));
    }

    #[test]
    fn test_replace_root() {
        let tree = list();
        let out = patched(
            &tree,
            &[Patch::ReplaceNode {
                path: "1".into(),
                node: VNode::text("gone", "1"),
            }],
        )
        .unwrap();
        assert_eq!(out, VNode::text("gone", "1"));
        assert_eq!(tree, list());
    }

    #[test]
    fn test_missing_path() {
        let err = patched(
            &list(),
            &[Patch::RemoveAttribute {
                path: "7".into(),
                name: "x".into(),
            }],
        )
        .unwrap_err();
        assert_eq!(err, VdomError::PathNotFound("7".into()));
    }
}
