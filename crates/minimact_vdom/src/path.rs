//! Structural paths - stable addresses for nodes
//!
//! A path is a dot-separated list of hexadecimal segments, one per tree
//! level, e.g. `"10000000.20000000"`. The rendering step assigns them and
//! the core treats them as node identities: they are compared and carried
//! verbatim, never renumbered. Consecutive slots are `HEX_GAP` apart so a
//! renderer can place a new node between two existing ones without touching
//! their paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance between the segments of consecutive child slots
pub const HEX_GAP: u32 = 0x1000_0000;

/// A structural path identifying a node
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexPath(String);

impl HexPath {
    /// The root path (empty string)
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Wrap an existing path string without touching it
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Build a path from raw segment values
    pub fn from_segments(segments: &[u32]) -> Self {
        let path = segments
            .iter()
            .map(|seg| format!("{:08x}", seg))
            .collect::<Vec<_>>()
            .join(".");
        Self(path)
    }

    /// Path of the child in slot `index` under this path
    ///
    /// Slots past `u32::MAX / HEX_GAP - 1` saturate to the last representable
    /// segment; renderers that need more siblings assign their own segments.
    pub fn child(&self, index: usize) -> Self {
        let slot = u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .and_then(|i| i.checked_mul(HEX_GAP))
            .unwrap_or(u32::MAX);
        self.child_segment(slot)
    }

    /// Path of a child with an explicit segment value
    pub fn child_segment(&self, segment: u32) -> Self {
        if self.0.is_empty() {
            Self(format!("{:08x}", segment))
        } else {
            Self(format!("{}.{:08x}", self.0, segment))
        }
    }

    /// Parent path, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rfind('.') {
            Some(last_dot) => Some(Self(self.0[..last_dot].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Number of segments (0 for the root)
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.bytes().filter(|&b| b == b'.').count() + 1
        }
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &HexPath) -> bool {
        if self.0.is_empty() {
            return !other.0.is_empty();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }

    /// Parse the hex segments
    pub fn segments(&self) -> Result<Vec<u32>, std::num::ParseIntError> {
        if self.0.is_empty() {
            return Ok(Vec::new());
        }
        self.0.split('.').map(|seg| u32::from_str_radix(seg, 16)).collect()
    }

    /// The underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<String> for HexPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HexPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
