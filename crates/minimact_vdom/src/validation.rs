//! Tree validation - bounds every input before the core works on it
//!
//! All work in the core is bounded by tree size, so these limits are what
//! keeps a hostile or buggy caller from making a single call arbitrarily
//! expensive. Validation also enforces path uniqueness within one tree.

use crate::error::{Result, VdomError};
use crate::node::VNode;
use crate::path::HexPath;
use std::collections::HashSet;

/// Limits applied to every tree crossing the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Maximum tree height (a lone leaf has height 1)
    pub max_depth: usize,
    /// Maximum total node count, null placeholders included
    pub max_nodes: usize,
    /// Maximum children of a single element
    pub max_children: usize,
    /// Maximum attribute name length in bytes
    pub max_attribute_name: usize,
    /// Maximum attribute value length in bytes
    pub max_attribute_value: usize,
    /// Maximum text content length in bytes
    pub max_text: usize,
    /// Maximum JSON document length in bytes
    pub max_json: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_nodes: 10_000,
            max_children: 1_000,
            max_attribute_name: 256,
            max_attribute_value: 4_096,
            max_text: 1024 * 1024,
            max_json: 1024 * 1024,
        }
    }
}

struct Validator<'a> {
    config: &'a ValidationConfig,
    nodes: usize,
    paths: HashSet<&'a HexPath>,
}

impl<'a> Validator<'a> {
    fn visit(&mut self, node: &'a VNode, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(VdomError::limit("tree depth", depth, self.config.max_depth));
        }

        self.nodes += 1;
        if self.nodes > self.config.max_nodes {
            return Err(VdomError::limit("node count", self.nodes, self.config.max_nodes));
        }

        if !self.paths.insert(node.path()) {
            return Err(VdomError::DuplicatePath(node.path().clone()));
        }

        match node {
            VNode::Text(text) => {
                if text.content.len() > self.config.max_text {
                    return Err(VdomError::limit(
                        "text length",
                        text.content.len(),
                        self.config.max_text,
                    ));
                }
            }
            VNode::Null(_) => {}
            VNode::Element(el) => {
                if el.children.len() > self.config.max_children {
                    return Err(VdomError::limit(
                        "child count",
                        el.children.len(),
                        self.config.max_children,
                    ));
                }
                for (name, value) in &el.attributes {
                    if name.len() > self.config.max_attribute_name {
                        return Err(VdomError::limit(
                            "attribute name length",
                            name.len(),
                            self.config.max_attribute_name,
                        ));
                    }
                    if value.len() > self.config.max_attribute_value {
                        return Err(VdomError::limit(
                            "attribute value length",
                            value.len(),
                            self.config.max_attribute_value,
                        ));
                    }
                }
                for child in &el.children {
                    self.visit(child, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl VNode {
    /// Check this tree against `config`
    pub fn validate(&self, config: &ValidationConfig) -> Result<()> {
        let mut validator = Validator {
            config,
            nodes: 0,
            paths: HashSet::new(),
        };
        validator.visit(self, 1)
    }

    /// Rough heap footprint of this subtree in bytes
    pub fn estimate_size(&self) -> usize {
        match self {
            VNode::Text(text) => std::mem::size_of::<VNode>() + text.content.len() + text.path.as_str().len(),
            VNode::Null(null) => std::mem::size_of::<VNode>() + null.path.as_str().len(),
            VNode::Element(el) => {
                let attrs: usize = el.attributes.iter().map(|(k, v)| k.len() + v.len()).sum();
                let children: usize = el.children.iter().map(VNode::estimate_size).sum();
                std::mem::size_of::<VNode>() + el.tag.len() + el.path.as_str().len() + attrs + children
            }
        }
    }
}

/// Parse and validate a tree in one step
///
/// The document length is checked before parsing, so an oversized payload
/// is rejected without being read.
pub fn from_json_checked(json: &str, config: &ValidationConfig) -> Result<VNode> {
    if json.len() > config.max_json {
        return Err(VdomError::limit("JSON size", json.len(), config.max_json));
    }
    let node: VNode = serde_json::from_str(json)?;
    node.validate(config)?;
    Ok(node)
}
