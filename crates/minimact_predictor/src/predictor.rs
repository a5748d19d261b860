//! The predictor engine
//!
//! `learn` runs the reconciler on an observed transition and folds the
//! resulting patch list into the pattern for that transition's shape.
//! `predict` hands back the stored list when its confidence clears the
//! threshold. Both take `&self`; one internal lock makes them mutually
//! exclusive per instance so a predictor can be shared across threads.

use crate::config::PredictorConfig;
use crate::error::Result;
use crate::pattern::{PatternTable, PredictionPattern, TableLimits};
use crate::state::{StateChange, StateShape};
use crate::stats::{Counters, PredictorStats};
use minimact_reconciler::{ReconcileConfig, Reconciler};
use minimact_telemetry::metrics;
use minimact_vdom::{patched, Patch, VNode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What a `learn` call did to the pattern table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearnOutcome {
    /// First observation of this shape
    Created,
    /// Same patches as stored; confidence raised
    Reinforced,
    /// Different patches; confidence lowered and patches replaced
    Revised,
    /// Reconciliation failed; nothing recorded
    Skipped,
}

/// An optimistic patch list for a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Patches to apply optimistically
    pub patches: Vec<Patch>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Shape the prediction was found under
    pub shape: StateShape,
    /// Observations behind the pattern
    pub observations: u64,
    /// Share of this pattern's verified predictions that were correct
    pub accuracy: Option<f64>,
}

pub(crate) struct Inner {
    pub(crate) table: PatternTable,
    pub(crate) counters: Counters,
}

/// A learning cache from state-change shapes to patch lists
pub struct Predictor {
    config: PredictorConfig,
    reconciler: Reconciler,
    inner: Mutex<Inner>,
}

impl Predictor {
    /// Create a predictor with the default configuration
    pub fn new() -> Self {
        Self::from_parts(PredictorConfig::default(), None)
    }

    /// Create a predictor with a custom configuration
    pub fn with_config(config: PredictorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, None))
    }

    /// Assemble a predictor around an existing table; `config` must be valid
    pub(crate) fn from_parts(config: PredictorConfig, table: Option<PatternTable>) -> Self {
        let table = table.unwrap_or_else(|| PatternTable::new(TableLimits::of(&config)));
        metrics().record_predictor_created();
        Self {
            reconciler: Reconciler::new(ReconcileConfig::default()),
            config,
            inner: Mutex::new(Inner {
                table,
                counters: Counters::default(),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub(crate) fn inner(&self) -> &Mutex<Inner> {
        &self.inner
    }

    /// Observe a transition and update the pattern for its shape
    ///
    /// Never fails: when the trees cannot be reconciled the table is left
    /// untouched and [`LearnOutcome::Skipped`] is returned.
    pub fn learn(&self, change: &StateChange, old: &VNode, new: &VNode) -> LearnOutcome {
        let start = Instant::now();
        let shape = change.shape(self.config.classify_transitions);

        let patches = match self.reconciler.reconcile(old, new) {
            Ok(patches) => patches,
            Err(e) => {
                log::warn!("learn {}: skipped, reconciliation failed: {}", shape, e);
                let elapsed = start.elapsed();
                {
                    let mut inner = self.inner.lock();
                    inner.counters.learns += 1;
                    inner.counters.learns_skipped += 1;
                    inner.counters.learn_time += elapsed;
                }
                metrics().record_learn(elapsed, true);
                return LearnOutcome::Skipped;
            }
        };

        let mut inner = self.inner.lock();
        let now = inner.table.tick();
        let config = &self.config;
        let consistent = inner.table.get_mut(&shape).map(|pattern| {
            pattern.observations += 1;
            pattern.last_used = now;
            if pattern.patches == patches {
                pattern.confidence += (config.max_confidence - pattern.confidence) * config.reinforcement_rate;
                true
            } else {
                pattern.confidence *= config.decay_factor;
                false
            }
        });
        let (outcome, evicted) = match consistent {
            Some(true) => (LearnOutcome::Reinforced, 0),
            Some(false) => (LearnOutcome::Revised, inner.table.replace_patches(&shape, patches)),
            None => {
                let pattern = PredictionPattern::new(shape.clone(), patches, config.initial_confidence, now);
                (LearnOutcome::Created, inner.table.insert(pattern))
            }
        };

        let elapsed = start.elapsed();
        inner.counters.learns += 1;
        inner.counters.evictions += evicted as u64;
        inner.counters.learn_time += elapsed;
        drop(inner);

        log::debug!("learn {}: {:?}", shape, outcome);
        metrics().record_learn(elapsed, false);
        metrics().record_evictions(evicted);
        outcome
    }

    /// Look up a prediction for `change`
    ///
    /// Returns `None` when the shape is unknown, its confidence is below
    /// the threshold, or (with `verify_applicability`) its patches do not
    /// apply to `current`. The tree is never modified.
    pub fn predict(&self, change: &StateChange, current: &VNode) -> Option<PredictionResult> {
        let start = Instant::now();
        let shape = change.shape(self.config.classify_transitions);

        let mut inner = self.inner.lock();
        let now = inner.table.tick();
        let result = match inner.table.get_mut(&shape) {
            None => {
                log::trace!("predict {}: no pattern", shape);
                None
            }
            Some(pattern) => {
                pattern.last_used = now;
                if pattern.confidence < self.config.min_confidence {
                    log::debug!(
                        "predict {}: confidence {:.3} below threshold {:.3}",
                        shape,
                        pattern.confidence,
                        self.config.min_confidence
                    );
                    None
                } else if self.config.verify_applicability && patched(current, &pattern.patches).is_err() {
                    log::debug!("predict {}: stored patches do not apply to the current tree", shape);
                    None
                } else {
                    pattern.predictions += 1;
                    Some(PredictionResult {
                        patches: pattern.patches.clone(),
                        confidence: pattern.confidence,
                        shape: shape.clone(),
                        observations: pattern.observations,
                        accuracy: pattern.accuracy(),
                    })
                }
            }
        };

        let elapsed = start.elapsed();
        inner.counters.predictions += 1;
        if result.is_some() {
            inner.counters.hits += 1;
        }
        inner.counters.predict_time += elapsed;
        drop(inner);

        metrics().record_prediction(elapsed, result.is_some());
        result
    }

    /// Compare the stored patches for `change` with the authoritative ones
    ///
    /// Returns `None` when no pattern exists for the shape.
    pub fn verify(&self, change: &StateChange, actual: &[Patch]) -> Option<bool> {
        let shape = change.shape(self.config.classify_transitions);
        let mut inner = self.inner.lock();
        let matched = {
            let pattern = inner.table.get_mut(&shape)?;
            let matched = pattern.patches == actual;
            if matched {
                pattern.correct += 1;
            } else {
                pattern.incorrect += 1;
            }
            matched
        };
        if matched {
            inner.counters.verified_correct += 1;
        } else {
            inner.counters.verified_incorrect += 1;
        }
        log::debug!("verify {}: {}", shape, if matched { "correct" } else { "incorrect" });
        Some(matched)
    }

    /// Snapshot of this instance's activity
    pub fn stats(&self) -> PredictorStats {
        let inner = self.inner.lock();
        let table = &inner.table;
        let avg_confidence = if table.is_empty() {
            0.0
        } else {
            table.iter().map(|p| p.confidence).sum::<f64>() / table.len() as f64
        };
        inner
            .counters
            .snapshot(table.len(), table.key_count(), table.memory_bytes(), avg_confidence)
    }

    /// Copy of the pattern stored for `shape`
    pub fn pattern(&self, shape: &StateShape) -> Option<PredictionPattern> {
        self.inner.lock().table.get(shape).cloned()
    }

    /// Resident patterns touching `key`
    pub fn patterns_for_key(&self, key: &str) -> usize {
        self.inner.lock().table.count_for_key(key)
    }

    /// Total resident patterns
    pub fn pattern_count(&self) -> usize {
        self.inner.lock().table.len()
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Predictor {
    fn drop(&mut self) {
        metrics().record_predictor_destroyed();
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("config", &self.config)
            .field("patterns", &self.pattern_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_vdom::{HexPath, VElement};

    fn counter(value: i64) -> VNode {
        let root = HexPath::root().child(0);
        VElement::new("span", root.clone())
            .with_child(VNode::text(value.to_string(), root.child(0)))
            .into()
    }

    fn increment() -> StateChange {
        StateChange::new().with("count", 0, 1)
    }

    #[test]
    fn test_learn_then_predict() {
        let predictor = Predictor::new();
        assert_eq!(predictor.learn(&increment(), &counter(0), &counter(1)), LearnOutcome::Created);

        let prediction = predictor.predict(&increment(), &counter(0)).unwrap();
        assert_eq!(prediction.patches.len(), 1);
        assert_eq!(prediction.confidence, 0.75);
        assert_eq!(prediction.observations, 1);
    }

    #[test]
    fn test_unknown_shape_misses() {
        let predictor = Predictor::new();
        predictor.learn(&increment(), &counter(0), &counter(1));
        let other = StateChange::new().with("name", "a", "b");
        assert!(predictor.predict(&other, &counter(0)).is_none());

        let stats = predictor.stats();
        assert_eq!(stats.predictions, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_reinforce_and_revise() {
        let predictor = Predictor::new();
        let shape = increment().shape(false);
        predictor.learn(&increment(), &counter(0), &counter(1));
        assert_eq!(predictor.learn(&increment(), &counter(0), &counter(1)), LearnOutcome::Reinforced);
        let reinforced = predictor.pattern(&shape).unwrap().confidence;
        assert!((reinforced - (0.75 + (0.99 - 0.75) * 0.25)).abs() < 1e-12);

        assert_eq!(predictor.learn(&increment(), &counter(1), &counter(2)), LearnOutcome::Revised);
        let revised = predictor.pattern(&shape).unwrap();
        assert!((revised.confidence - reinforced * 0.5).abs() < 1e-12);
        assert_eq!(revised.observations, 3);
        assert!(matches!(&revised.patches[0], Patch::UpdateText { content, .. } if content == "2"));
    }

    #[test]
    fn test_low_confidence_withheld() {
        let predictor = Predictor::with_config(PredictorConfig {
            min_confidence: 0.9,
            ..Default::default()
        })
        .unwrap();
        predictor.learn(&increment(), &counter(0), &counter(1));
        assert!(predictor.predict(&increment(), &counter(0)).is_none());
    }

    #[test]
    fn test_inapplicable_prediction_withheld() {
        let predictor = Predictor::new();
        predictor.learn(&increment(), &counter(0), &counter(1));
        let elsewhere = VNode::text("unrelated", HexPath::root().child(5));
        assert!(predictor.predict(&increment(), &elsewhere).is_none());

        let lenient = Predictor::with_config(PredictorConfig {
            verify_applicability: false,
            ..Default::default()
        })
        .unwrap();
        lenient.learn(&increment(), &counter(0), &counter(1));
        assert!(lenient.predict(&increment(), &elsewhere).is_some());
    }

    #[test]
    fn test_failed_reconcile_is_skipped() {
        let predictor = Predictor::new();
        let dup: VNode = VElement::new("div", "1")
            .with_child(VNode::null("1.1"))
            .with_child(VNode::null("1.1"))
            .into();
        assert_eq!(predictor.learn(&increment(), &counter(0), &dup), LearnOutcome::Skipped);
        assert_eq!(predictor.pattern_count(), 0);
        assert_eq!(predictor.stats().learns_skipped, 1);
    }

    #[test]
    fn test_verify() {
        let predictor = Predictor::new();
        predictor.learn(&increment(), &counter(0), &counter(1));
        let actual = minimact_reconciler::reconcile(&counter(0), &counter(1)).unwrap();
        assert_eq!(predictor.predict(&increment(), &counter(0)).unwrap().accuracy, None);
        assert_eq!(predictor.verify(&increment(), &actual), Some(true));
        assert_eq!(predictor.verify(&increment(), &[]), Some(false));
        assert_eq!(predictor.verify(&StateChange::new().with("x", 1, 2), &[]), None);
        assert_eq!(predictor.predict(&increment(), &counter(0)).unwrap().accuracy, Some(0.5));

        let stats = predictor.stats();
        assert_eq!(stats.verified_correct, 1);
        assert_eq!(stats.verified_incorrect, 1);
        assert!((stats.accuracy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_classified_transitions_learn_separately() {
        let predictor = Predictor::with_config(PredictorConfig {
            classify_transitions: true,
            ..Default::default()
        })
        .unwrap();
        let up = StateChange::new().with("count", 1, 2);
        let down = StateChange::new().with("count", 2, 1);
        predictor.learn(&up, &counter(1), &counter(2));
        predictor.learn(&down, &counter(2), &counter(1));
        assert_eq!(predictor.pattern_count(), 2);
        assert_eq!(predictor.patterns_for_key("count"), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Predictor::with_config(PredictorConfig::with_limits(2.0, 10)).is_err());
    }
}
