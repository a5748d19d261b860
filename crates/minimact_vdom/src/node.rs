//! Virtual nodes - the tree representation both sides of a diff are made of
//!
//! A tree is plain data: elements, text and null placeholders, each carrying
//! the structural path the renderer assigned to it. The JSON form is
//! internally tagged by `"type"`:
//!
//! ```json
//! { "type": "Element", "tag": "div", "path": "10000000",
//!   "attributes": { "class": "x" }, "children": [
//!     { "type": "Text", "content": "hi", "path": "10000000.10000000" },
//!     { "type": "Null", "path": "10000000.20000000" } ] }
//! ```

use crate::error::Result;
use crate::path::HexPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute that carries an element's reconciliation key
pub const KEY_ATTRIBUTE: &str = "key";

/// Discriminant of a node, for diagnostics and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    Null,
}

/// A node in a virtual tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VNode {
    /// An element with a tag, attributes and children
    Element(VElement),
    /// A text leaf
    Text(VText),
    /// Nothing rendered here; still occupies a slot
    Null(VNull),
}

/// An element node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VElement {
    /// Tag name
    pub tag: String,
    /// Attributes, ordered by name
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Child nodes in document order
    #[serde(default)]
    pub children: Vec<VNode>,
    /// Structural path
    pub path: HexPath,
}

/// A text node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VText {
    /// Text content
    pub content: String,
    /// Structural path
    pub path: HexPath,
}

/// A null placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VNull {
    /// Structural path
    pub path: HexPath,
}

impl VElement {
    /// Create an element with no attributes or children
    pub fn new(tag: impl Into<String>, path: impl Into<HexPath>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            path: path.into(),
        }
    }

    /// Set an attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the reconciliation key
    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.with_attr(KEY_ATTRIBUTE, key)
    }

    /// Append a child
    pub fn with_child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children
    pub fn with_children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// The reconciliation key, if any
    pub fn key(&self) -> Option<&str> {
        self.attributes.get(KEY_ATTRIBUTE).map(String::as_str)
    }
}

impl VText {
    /// Create a text node
    pub fn new(content: impl Into<String>, path: impl Into<HexPath>) -> Self {
        Self {
            content: content.into(),
            path: path.into(),
        }
    }
}

impl VNull {
    /// Create a null placeholder
    pub fn new(path: impl Into<HexPath>) -> Self {
        Self { path: path.into() }
    }
}

impl From<VElement> for VNode {
    fn from(el: VElement) -> Self {
        VNode::Element(el)
    }
}

impl From<VText> for VNode {
    fn from(text: VText) -> Self {
        VNode::Text(text)
    }
}

impl From<VNull> for VNode {
    fn from(null: VNull) -> Self {
        VNode::Null(null)
    }
}

impl VNode {
    /// Shorthand for an element node
    pub fn element(tag: impl Into<String>, path: impl Into<HexPath>) -> VElement {
        VElement::new(tag, path)
    }

    /// Shorthand for a text node
    pub fn text(content: impl Into<String>, path: impl Into<HexPath>) -> Self {
        VNode::Text(VText::new(content, path))
    }

    /// Shorthand for a null placeholder
    pub fn null(path: impl Into<HexPath>) -> Self {
        VNode::Null(VNull::new(path))
    }

    /// The node's structural path
    pub fn path(&self) -> &HexPath {
        match self {
            VNode::Element(el) => &el.path,
            VNode::Text(text) => &text.path,
            VNode::Null(null) => &null.path,
        }
    }

    /// The node's kind
    pub fn kind(&self) -> NodeKind {
        match self {
            VNode::Element(_) => NodeKind::Element,
            VNode::Text(_) => NodeKind::Text,
            VNode::Null(_) => NodeKind::Null,
        }
    }

    /// The reconciliation key (elements only)
    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element(el) => el.key(),
            _ => None,
        }
    }

    /// Borrow as an element
    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Children of an element; empty for leaves
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Total number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(VNode::node_count).sum::<usize>()
    }

    /// Height of this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(VNode::depth).max().unwrap_or(0)
    }

    /// Find the node carrying `path` in this subtree
    ///
    /// Paths are identities, not positions, so this does not assume the
    /// renderer nests child paths under their parent's. When it does, the
    /// lookup follows the path prefix down the tree; otherwise it falls back
    /// to a pre-order search.
    pub fn find(&self, path: &HexPath) -> Option<&VNode> {
        let route = self.route_to(path)?;
        let mut node = self;
        for index in route {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    /// Mutable variant of [`VNode::find`]
    pub fn find_mut(&mut self, path: &HexPath) -> Option<&mut VNode> {
        let route = self.route_to(path)?;
        let mut node = self;
        for index in route {
            node = match node {
                VNode::Element(el) => el.children.get_mut(index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Child indices leading from `self` to the node carrying `path`
    pub fn route_to(&self, path: &HexPath) -> Option<Vec<usize>> {
        let mut route = Vec::new();
        if self.descend(path, &mut route) {
            return Some(route);
        }
        route.clear();
        self.search(path, &mut route).then_some(route)
    }

    fn descend(&self, path: &HexPath, route: &mut Vec<usize>) -> bool {
        if self.path() == path {
            return true;
        }
        for (index, child) in self.children().iter().enumerate() {
            if child.path() == path || child.path().is_ancestor_of(path) {
                route.push(index);
                if child.descend(path, route) {
                    return true;
                }
                route.pop();
            }
        }
        false
    }

    fn search(&self, path: &HexPath, route: &mut Vec<usize>) -> bool {
        if self.path() == path {
            return true;
        }
        for (index, child) in self.children().iter().enumerate() {
            route.push(index);
            if child.search(path, route) {
                return true;
            }
            route.pop();
        }
        false
    }

    /// Visit every node in pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a VNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Parse a tree from JSON without limit checks
    ///
    /// Boundary code should prefer [`crate::from_json_checked`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::VdomError::Serialization(e.to_string()))
    }
}
