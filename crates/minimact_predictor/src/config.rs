//! Predictor configuration

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};

/// Which resident pattern goes first when a bound is hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Least recently learned or looked up
    #[default]
    LeastRecentlyUsed,
    /// Fewest observations
    LeastFrequentlyUsed,
    /// Earliest created
    OldestFirst,
}

/// Tunables for one predictor instance
///
/// Saved alongside the pattern table, so a loaded predictor behaves exactly
/// like the one that was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Predictions below this confidence are withheld
    pub min_confidence: f64,
    /// Cap on resident patterns touching any one state key
    pub max_patterns_per_key: usize,
    /// Cap on distinct state keys with a resident pattern
    pub max_state_keys: usize,
    /// Budget for the estimated size of all resident patterns
    pub max_memory_bytes: usize,
    /// Victim selection for all three bounds
    pub eviction_policy: EvictionPolicy,
    /// Confidence of a freshly learned pattern
    pub initial_confidence: f64,
    /// Share of the remaining headroom gained on a consistent observation
    pub reinforcement_rate: f64,
    /// Factor applied to confidence on an inconsistent observation
    pub decay_factor: f64,
    /// Ceiling confidence approaches but never reaches
    pub max_confidence: f64,
    /// Withhold a prediction whose patches do not apply to the current tree
    pub verify_applicability: bool,
    /// Distinguish increments, decrements and toggles of the same key
    pub classify_transitions: bool,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            max_patterns_per_key: 100,
            max_state_keys: 1000,
            max_memory_bytes: 100 * 1024 * 1024,
            eviction_policy: EvictionPolicy::LeastRecentlyUsed,
            initial_confidence: 0.75,
            reinforcement_rate: 0.25,
            decay_factor: 0.5,
            max_confidence: 0.99,
            verify_applicability: true,
            classify_transitions: false,
        }
    }
}

fn in_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

impl PredictorConfig {
    /// Default configuration with the two creation-time tunables overridden
    pub fn with_limits(min_confidence: f64, max_patterns_per_key: usize) -> Self {
        Self {
            min_confidence,
            max_patterns_per_key,
            ..Default::default()
        }
    }

    /// Check every value is in range
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("min_confidence", self.min_confidence),
            ("initial_confidence", self.initial_confidence),
            ("reinforcement_rate", self.reinforcement_rate),
            ("decay_factor", self.decay_factor),
            ("max_confidence", self.max_confidence),
        ];
        for (name, value) in unit {
            if !in_unit(value) {
                return Err(PredictorError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        let bounds = [
            ("max_patterns_per_key", self.max_patterns_per_key),
            ("max_state_keys", self.max_state_keys),
            ("max_memory_bytes", self.max_memory_bytes),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(PredictorError::InvalidConfig(format!("{} must be at least 1", name)));
            }
        }
        if self.initial_confidence > self.max_confidence {
            return Err(PredictorError::InvalidConfig(format!(
                "initial_confidence {} exceeds max_confidence {}",
                self.initial_confidence, self.max_confidence
            )));
        }
        Ok(())
    }
}
