//! Paired depth-first traversal producing the patch list
//!
//! Paths are node identities. A child in the old list continues a child in
//! the new list only when both carry the same path (and, in keyed mode, the
//! same key); everything else is a removal plus an insertion at parent and
//! index. Under the renderer's numbering an unkeyed child keeps its slot's
//! path, so this is positional matching, and a keyed child keeps its key's
//! path, so a move is a reorder. Patch order is the order a client applies
//! them in: attribute patches before child patches, and no patch ever puts a
//! path into the tree while an older node still carries it.

use minimact_vdom::{HexPath, Patch, VElement, VNode};
use std::collections::HashMap;

/// Diff two trees without validating them
///
/// Recursion depth follows tree depth; callers taking untrusted input go
/// through [`crate::Reconciler::reconcile`], which bounds it first.
pub fn diff(old: &VNode, new: &VNode) -> Vec<Patch> {
    let mut patches = Vec::new();
    if old.path() != new.path() || old.kind() != new.kind() {
        log::debug!(
            "root mismatch ({:?} at {} vs {:?} at {}), replacing",
            old.kind(),
            old.path(),
            new.kind(),
            new.path()
        );
    }
    diff_node(old, new, &mut patches);
    patches
}

pub(crate) fn diff_node(old: &VNode, new: &VNode, patches: &mut Vec<Patch>) {
    if old.path() != new.path() {
        replace(old, new, patches);
        return;
    }

    match (old, new) {
        (VNode::Text(old_text), VNode::Text(new_text)) => {
            if old_text.content != new_text.content {
                patches.push(Patch::UpdateText {
                    path: old_text.path.clone(),
                    content: new_text.content.clone(),
                });
            }
        }
        (VNode::Null(_), VNode::Null(_)) => {}
        (VNode::Element(old_el), VNode::Element(new_el)) if old_el.tag == new_el.tag => {
            diff_attributes(old_el, new_el, patches);
            diff_children(old_el, new_el, patches);
        }
        _ => replace(old, new, patches),
    }
}

fn replace(old: &VNode, new: &VNode, patches: &mut Vec<Patch>) {
    patches.push(Patch::ReplaceNode {
        path: old.path().clone(),
        node: new.clone(),
    });
}

fn diff_attributes(old: &VElement, new: &VElement, patches: &mut Vec<Patch>) {
    for (name, value) in &new.attributes {
        if old.attributes.get(name) != Some(value) {
            patches.push(Patch::SetAttribute {
                path: old.path.clone(),
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    for name in old.attributes.keys() {
        if !new.attributes.contains_key(name) {
            patches.push(Patch::RemoveAttribute {
                path: old.path.clone(),
                name: name.clone(),
            });
        }
    }
}

fn diff_children(old: &VElement, new: &VElement, patches: &mut Vec<Patch>) {
    let mut keyed = old.children.iter().chain(&new.children).any(|c| c.key().is_some());
    if keyed && (has_duplicate_keys(&old.children) || has_duplicate_keys(&new.children)) {
        log::warn!(
            "duplicate keys under {} ({}), matching children by path only",
            old.path,
            old.tag
        );
        keyed = false;
    }

    match match_children(&old.children, &new.children, keyed) {
        Some(matches) => diff_matched(&old.path, &old.children, &new.children, &matches, patches),
        None => {
            log::warn!(
                "repeated child paths under {} ({}), diffing by index",
                old.path,
                old.tag
            );
            diff_by_index(&old.path, &old.children, &new.children, patches);
        }
    }
}

fn has_duplicate_keys(children: &[VNode]) -> bool {
    let mut seen = std::collections::HashSet::with_capacity(children.len());
    children.iter().filter_map(VNode::key).any(|key| !seen.insert(key))
}

/// Last resort for sibling lists whose paths repeat, which validated trees
/// never have
fn diff_by_index(parent: &HexPath, old: &[VNode], new: &[VNode], patches: &mut Vec<Patch>) {
    let common = old.len().min(new.len());
    for (old_child, new_child) in old.iter().zip(new) {
        diff_node(old_child, new_child, patches);
    }

    for (index, node) in new.iter().enumerate().skip(common) {
        patches.push(Patch::InsertChild {
            parent_path: parent.clone(),
            index,
            node: node.clone(),
        });
    }
    for index in (common..old.len()).rev() {
        patches.push(Patch::RemoveChild {
            parent_path: parent.clone(),
            index,
        });
    }
}

/// Identity of a child within its parent's list: key (keyed mode only) and path
type Identity<'a> = (Option<&'a str>, &'a HexPath);

fn identities(children: &[VNode], keyed: bool) -> Option<HashMap<Identity<'_>, usize>> {
    let mut map = HashMap::with_capacity(children.len());
    for (index, child) in children.iter().enumerate() {
        let key = if keyed { child.key() } else { None };
        if map.insert((key, child.path()), index).is_some() {
            return None;
        }
    }
    Some(map)
}

/// For each new child, the index of the old child it continues
///
/// `None` when a path repeats within either list.
fn match_children(old: &[VNode], new: &[VNode], keyed: bool) -> Option<Vec<Option<usize>>> {
    let old_ids = identities(old, keyed)?;
    let new_ids = identities(new, keyed)?;
    let mut matches = vec![None; new.len()];
    for (id, &new_index) in &new_ids {
        matches[new_index] = old_ids.get(id).copied();
    }
    Some(matches)
}

fn diff_matched(
    parent: &HexPath,
    old: &[VNode],
    new: &[VNode],
    matches: &[Option<usize>],
    patches: &mut Vec<Patch>,
) {
    let mut kept = vec![false; old.len()];
    for &old_index in matches.iter().flatten() {
        kept[old_index] = true;
    }

    // Removals first, from the back so earlier indices stay valid.
    for index in (0..old.len()).rev().filter(|&i| !kept[i]) {
        patches.push(Patch::RemoveChild {
            parent_path: parent.clone(),
            index,
        });
    }

    // Position of each surviving old child once removals are applied.
    let mut survivor_pos = vec![0; old.len()];
    let mut next = 0;
    for (i, &is_kept) in kept.iter().enumerate() {
        if is_kept {
            survivor_pos[i] = next;
            next += 1;
        }
    }

    let mut order = Vec::with_capacity(next);
    for (new_index, old_index) in matches.iter().enumerate() {
        if let Some(old_index) = *old_index {
            diff_node(&old[old_index], &new[new_index], patches);
            order.push(survivor_pos[old_index]);
        }
    }

    if order.iter().enumerate().any(|(i, &from)| i != from) {
        patches.push(Patch::ReorderChildren {
            parent_path: parent.clone(),
            order,
        });
    }

    for (index, node) in new.iter().enumerate() {
        if matches[index].is_none() {
            patches.push(Patch::InsertChild {
                parent_path: parent.clone(),
                index,
                node: node.clone(),
            });
        }
    }
}
