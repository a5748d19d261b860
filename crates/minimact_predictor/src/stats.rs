//! Per-instance predictor statistics

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running counters kept inside a predictor
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub learns: u64,
    pub learns_skipped: u64,
    pub predictions: u64,
    pub hits: u64,
    pub verified_correct: u64,
    pub verified_incorrect: u64,
    pub evictions: u64,
    pub learn_time: Duration,
    pub predict_time: Duration,
}

/// Read-only snapshot of one predictor's activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorStats {
    /// Learn calls, including skipped ones
    pub learns: u64,
    /// Learn calls that left the table untouched
    pub learns_skipped: u64,
    /// Predict calls
    pub predictions: u64,
    /// Predict calls that returned a prediction
    pub hits: u64,
    /// Predict calls that returned nothing
    pub misses: u64,
    /// `hits / predictions`
    pub hit_rate: f64,
    /// Verified predictions that matched
    pub verified_correct: u64,
    /// Verified predictions that did not
    pub verified_incorrect: u64,
    /// `verified_correct / verified`, 0 when nothing was verified
    pub accuracy: f64,
    /// Mean learn latency in microseconds
    pub avg_learn_us: u64,
    /// Mean predict latency in microseconds
    pub avg_predict_us: u64,
    /// Resident patterns
    pub patterns: usize,
    /// Distinct state keys with a resident pattern
    pub state_keys: usize,
    /// Estimated size of the resident patterns
    pub memory_bytes: usize,
    /// Patterns evicted since creation
    pub evictions: u64,
    /// Mean confidence over resident patterns
    pub avg_confidence: f64,
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean_micros(total: Duration, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    u64::try_from(total.as_micros() / u128::from(count)).unwrap_or(u64::MAX)
}

impl Counters {
    pub(crate) fn snapshot(
        &self,
        patterns: usize,
        state_keys: usize,
        memory_bytes: usize,
        avg_confidence: f64,
    ) -> PredictorStats {
        let verified = self.verified_correct + self.verified_incorrect;
        PredictorStats {
            learns: self.learns,
            learns_skipped: self.learns_skipped,
            predictions: self.predictions,
            hits: self.hits,
            misses: self.predictions - self.hits,
            hit_rate: ratio(self.hits, self.predictions),
            verified_correct: self.verified_correct,
            verified_incorrect: self.verified_incorrect,
            accuracy: ratio(self.verified_correct, verified),
            avg_learn_us: mean_micros(self.learn_time, self.learns),
            avg_predict_us: mean_micros(self.predict_time, self.predictions),
            patterns,
            state_keys,
            memory_bytes,
            evictions: self.evictions,
            avg_confidence,
        }
    }
}
