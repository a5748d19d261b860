//! State changes and the shapes patterns are keyed on
//!
//! A state change lists every key that changed with its old and new value:
//!
//! ```json
//! { "count": { "old": 1, "new": 2 }, "open": { "old": false, "new": true } }
//! ```
//!
//! Its shape is the set of keys only. Values are ignored, so `count` going
//! 1→2 and 7→8 land on the same pattern. With transition classification on,
//! each key also records whether it went up, down or flipped.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Old and new value of one state key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub old: Value,
    pub new: Value,
}

/// What triggered a re-render: state key to (old, new)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateChange(BTreeMap<String, ValueChange>);

impl StateChange {
    /// An empty change
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StateChange::insert`]
    pub fn with(mut self, key: impl Into<String>, old: impl Into<Value>, new: impl Into<Value>) -> Self {
        self.insert(key, old, new);
        self
    }

    /// Record that `key` went from `old` to `new`
    pub fn insert(&mut self, key: impl Into<String>, old: impl Into<Value>, new: impl Into<Value>) {
        self.0.insert(
            key.into(),
            ValueChange {
                old: old.into(),
                new: new.into(),
            },
        );
    }

    /// The change for one key
    pub fn get(&self, key: &str) -> Option<&ValueChange> {
        self.0.get(key)
    }

    /// Changed keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of changed keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse from the boundary JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Shape of this change
    pub fn shape(&self, classify_transitions: bool) -> StateShape {
        StateShape::of(self, classify_transitions)
    }
}

/// How a single key's value moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Number went up
    Increment,
    /// Number went down
    Decrement,
    /// Boolean flipped
    Toggle,
    /// Anything else
    Literal,
}

impl TransitionKind {
    /// Classify a value change
    pub fn classify(change: &ValueChange) -> Self {
        match (&change.old, &change.new) {
            (Value::Number(old), Value::Number(new)) => match (old.as_f64(), new.as_f64()) {
                (Some(a), Some(b)) if b > a => TransitionKind::Increment,
                (Some(a), Some(b)) if b < a => TransitionKind::Decrement,
                _ => TransitionKind::Literal,
            },
            (Value::Bool(old), Value::Bool(new)) if old != new => TransitionKind::Toggle,
            _ => TransitionKind::Literal,
        }
    }
}

/// One key of a shape
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeKey {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionKind>,
}

/// The set of keys a state change touched, independent of values and order
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateShape(Vec<ShapeKey>);

impl StateShape {
    /// Shape of `change`
    pub fn of(change: &StateChange, classify_transitions: bool) -> Self {
        // BTreeMap iteration keeps keys sorted and unique.
        let keys = change
            .0
            .iter()
            .map(|(key, value)| ShapeKey {
                key: key.clone(),
                transition: classify_transitions.then(|| TransitionKind::classify(value)),
            })
            .collect();
        Self(keys)
    }

    /// Build a shape from bare keys
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<ShapeKey> = keys
            .into_iter()
            .map(|k| ShapeKey {
                key: k.into(),
                transition: None,
            })
            .collect();
        keys.sort();
        keys.dedup();
        Self(keys)
    }

    /// The touched state keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|k| k.key.as_str())
    }

    /// Whether the shape touches `key`
    pub fn touches(&self, key: &str) -> bool {
        self.0.iter().any(|k| k.key == key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keys are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether keys are sorted and unique, as every constructor leaves them
    pub(crate) fn is_canonical(&self) -> bool {
        self.0.windows(2).all(|pair| pair[0] < pair[1] && pair[0].key != pair[1].key)
    }
}

impl fmt::Display for StateShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", key.key)?;
            if let Some(kind) = key.transition {
                write!(f, ":{:?}", kind)?;
            }
        }
        write!(f, "}}")
    }
}
