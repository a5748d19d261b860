//! Saving and loading the pattern table
//!
//! A snapshot carries the configuration, the logical clock and every
//! resident pattern. Loading checks the whole document before building
//! anything, so a rejected snapshot never yields a half-populated predictor.

use crate::config::PredictorConfig;
use crate::error::{PredictorError, Result};
use crate::pattern::{PatternTable, PredictionPattern, TableLimits};
use crate::predictor::Predictor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorSnapshot {
    pub version: u32,
    pub config: PredictorConfig,
    pub clock: u64,
    pub patterns: Vec<PredictionPattern>,
}

impl PredictorSnapshot {
    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PredictorError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        self.config
            .validate()
            .map_err(|e| PredictorError::InvalidSnapshot(e.to_string()))?;

        let mut shapes = BTreeSet::new();
        let mut per_key: BTreeMap<&str, usize> = BTreeMap::new();
        let mut memory_bytes = 0usize;
        for pattern in &self.patterns {
            let shape = &pattern.shape;
            if !shape.is_canonical() {
                return Err(PredictorError::InvalidSnapshot(format!(
                    "shape {} is not sorted and unique",
                    shape
                )));
            }
            if !shapes.insert(shape) {
                return Err(PredictorError::InvalidSnapshot(format!("duplicate shape {}", shape)));
            }
            if !pattern.confidence.is_finite() || !(0.0..=1.0).contains(&pattern.confidence) {
                return Err(PredictorError::InvalidSnapshot(format!(
                    "confidence {} of {} is outside [0, 1]",
                    pattern.confidence, shape
                )));
            }
            if pattern.observations == 0 {
                return Err(PredictorError::InvalidSnapshot(format!(
                    "pattern {} has no observations",
                    shape
                )));
            }
            if pattern.last_used > self.clock {
                return Err(PredictorError::InvalidSnapshot(format!(
                    "pattern {} used at {} after snapshot clock {}",
                    shape, pattern.last_used, self.clock
                )));
            }
            if pattern.created > pattern.last_used {
                return Err(PredictorError::InvalidSnapshot(format!(
                    "pattern {} created at {} after its last use at {}",
                    shape, pattern.created, pattern.last_used
                )));
            }
            memory_bytes += pattern.estimate_size();
            for key in shape.keys() {
                let count = per_key.entry(key).or_default();
                *count += 1;
                if *count > self.config.max_patterns_per_key {
                    return Err(PredictorError::InvalidSnapshot(format!(
                        "more than {} patterns for state key '{}'",
                        self.config.max_patterns_per_key, key
                    )));
                }
            }
        }
        if per_key.len() > self.config.max_state_keys {
            return Err(PredictorError::InvalidSnapshot(format!(
                "{} state keys exceed the limit of {}",
                per_key.len(),
                self.config.max_state_keys
            )));
        }
        if memory_bytes > self.config.max_memory_bytes {
            return Err(PredictorError::InvalidSnapshot(format!(
                "patterns need {} bytes, over the budget of {}",
                memory_bytes, self.config.max_memory_bytes
            )));
        }
        Ok(())
    }
}

impl Predictor {
    /// Capture the pattern table and configuration
    pub fn snapshot(&self) -> PredictorSnapshot {
        let inner = self.inner().lock();
        PredictorSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config().clone(),
            clock: inner.table.clock(),
            patterns: inner.table.iter().cloned().collect(),
        }
    }

    /// Build a predictor from a snapshot, all or nothing
    pub fn from_snapshot(snapshot: PredictorSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let mut table = PatternTable::new(TableLimits::of(&snapshot.config));
        table.set_clock(snapshot.clock);
        for pattern in snapshot.patterns {
            table.insert(pattern);
        }
        Ok(Predictor::from_parts(snapshot.config, Some(table)))
    }

    /// Serialize to JSON
    pub fn save_to_json(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot()).map_err(|e| PredictorError::Serialization(e.to_string()))
    }

    /// Rebuild a predictor from [`Predictor::save_to_json`] output
    pub fn load_from_json(json: &str) -> Result<Self> {
        let snapshot: PredictorSnapshot = serde_json::from_str(json)?;
        let predictor = Self::from_snapshot(snapshot)?;
        log::debug!("loaded predictor with {} patterns", predictor.pattern_count());
        Ok(predictor)
    }

    /// Write a snapshot to a file
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.save_to_json()?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Load a snapshot from a file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::load_from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateChange, StateShape};

    fn learned() -> Predictor {
        use minimact_vdom::{HexPath, VElement, VNode};
        let root = HexPath::root().child(0);
        let tree = |text: &str| -> VNode {
            VElement::new("p", root.clone())
                .with_child(VNode::text(text, root.child(0)))
                .into()
        };
        let predictor = Predictor::new();
        predictor.learn(&StateChange::new().with("a", 0, 1), &tree("0"), &tree("1"));
        predictor.learn(&StateChange::new().with("b", 0, 1), &tree("x"), &tree("y"));
        predictor
    }

    #[test]
    fn test_snapshot_round_trip() {
        let predictor = learned();
        let snapshot = predictor.snapshot();
        assert_eq!(snapshot.patterns.len(), 2);
        let json = predictor.save_to_json().unwrap();
        let loaded = Predictor::load_from_json(&json).unwrap();
        assert_eq!(loaded.snapshot(), snapshot);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut snapshot = learned().snapshot();
        snapshot.version = 99;
        let err = Predictor::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, PredictorError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn test_bad_confidence_rejected() {
        let mut snapshot = learned().snapshot();
        snapshot.patterns[1].confidence = 1.5;
        assert!(matches!(
            Predictor::from_snapshot(snapshot),
            Err(PredictorError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_cap_violation_rejected() {
        let mut snapshot = learned().snapshot();
        snapshot.config.max_patterns_per_key = 1;
        let mut extra = snapshot.patterns[0].clone();
        extra.shape = StateShape::from_keys(["a", "z"]);
        snapshot.patterns.push(extra);
        assert!(matches!(
            Predictor::from_snapshot(snapshot),
            Err(PredictorError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_duplicate_shape_rejected() {
        let mut snapshot = learned().snapshot();
        let copy = snapshot.patterns[0].clone();
        snapshot.patterns.push(copy);
        assert!(Predictor::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_future_clock_rejected() {
        let mut snapshot = learned().snapshot();
        snapshot.patterns[0].last_used = snapshot.clock + 1;
        assert!(Predictor::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_state_key_limit_checked_on_load() {
        let mut snapshot = learned().snapshot();
        snapshot.config.max_state_keys = 1;
        assert!(matches!(
            Predictor::from_snapshot(snapshot),
            Err(PredictorError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_memory_budget_checked_on_load() {
        let mut snapshot = learned().snapshot();
        let needed: usize = snapshot.patterns.iter().map(PredictionPattern::estimate_size).sum();
        snapshot.config.max_memory_bytes = needed - 1;
        assert!(Predictor::from_snapshot(snapshot.clone()).is_err());

        snapshot.config.max_memory_bytes = needed;
        let loaded = Predictor::from_snapshot(snapshot).unwrap();
        assert_eq!(loaded.pattern_count(), 2);
        assert_eq!(loaded.stats().memory_bytes, needed);
    }

    #[test]
    fn test_created_after_last_use_rejected() {
        let mut snapshot = learned().snapshot();
        snapshot.patterns[0].created = snapshot.patterns[0].last_used + 1;
        assert!(Predictor::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = Predictor::load_from_json("{\"version\":1").unwrap_err();
        assert!(matches!(err, PredictorError::Deserialization(_)));
        assert!(err.is_deserialization());
    }
}
