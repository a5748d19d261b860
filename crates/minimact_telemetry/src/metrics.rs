//! Counters and latency windows for reconcile and predictor calls
//!
//! Recording is lock-free for the counters; only the latency windows take
//! a short lock. Nothing in here is ever read back by the core itself.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Samples kept per latency window
pub const LATENCY_WINDOW: usize = 1_000;

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// The process-wide metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Bounded window of recent latencies, in microseconds
#[derive(Debug)]
pub struct LatencyWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl LatencyWindow {
    /// Create a window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(LATENCY_WINDOW)),
            capacity: capacity.max(1),
        }
    }

    /// Record a sample, dropping the oldest when full
    pub fn push(&mut self, micros: u64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(micros);
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of the held samples (0 when empty)
    pub fn average(&self) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        self.samples.iter().sum::<u64>() / self.samples.len() as u64
    }

    /// Nearest-rank percentile, `p` in [0, 1] (0 when empty)
    pub fn percentile(&self, p: f64) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let rank = ((sorted.len() as f64) * p.clamp(0.0, 1.0)) as usize;
        sorted[rank.min(sorted.len() - 1)]
    }

    /// Drop every sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Counter set shared by every reconcile and predictor call in the process
pub struct Metrics {
    reconcile_calls: AtomicU64,
    reconcile_errors: AtomicU64,
    patches_emitted: AtomicU64,

    learns: AtomicU64,
    learns_skipped: AtomicU64,
    predictions: AtomicU64,
    prediction_hits: AtomicU64,
    prediction_misses: AtomicU64,

    live_predictors: AtomicUsize,
    peak_predictors: AtomicUsize,
    evictions: AtomicU64,
    validation_failures: AtomicU64,

    reconcile_latency: Mutex<LatencyWindow>,
    predict_latency: Mutex<LatencyWindow>,
    learn_latency: Mutex<LatencyWindow>,

    started: Instant,
}

/// Point-in-time copy of [`Metrics`], serializable for the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,

    pub reconcile_calls: u64,
    pub reconcile_errors: u64,
    pub patches_emitted: u64,
    pub avg_reconcile_us: u64,
    pub p95_reconcile_us: u64,

    pub learns: u64,
    pub learns_skipped: u64,
    pub avg_learn_us: u64,
    pub predictions: u64,
    pub prediction_hits: u64,
    pub prediction_misses: u64,
    pub prediction_hit_rate: f64,
    pub avg_predict_us: u64,
    pub p95_predict_us: u64,

    pub live_predictors: usize,
    pub peak_predictors: usize,
    pub evictions: u64,
    pub validation_failures: u64,
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl Metrics {
    /// Create a standalone instance; most code wants [`metrics()`]
    pub fn new() -> Self {
        Self {
            reconcile_calls: AtomicU64::new(0),
            reconcile_errors: AtomicU64::new(0),
            patches_emitted: AtomicU64::new(0),
            learns: AtomicU64::new(0),
            learns_skipped: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            prediction_hits: AtomicU64::new(0),
            prediction_misses: AtomicU64::new(0),
            live_predictors: AtomicUsize::new(0),
            peak_predictors: AtomicUsize::new(0),
            evictions: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            reconcile_latency: Mutex::new(LatencyWindow::new(LATENCY_WINDOW)),
            predict_latency: Mutex::new(LatencyWindow::new(LATENCY_WINDOW)),
            learn_latency: Mutex::new(LatencyWindow::new(LATENCY_WINDOW)),
            started: Instant::now(),
        }
    }

    /// Record one reconcile call; `patches` is `None` when it failed
    pub fn record_reconcile(&self, elapsed: Duration, patches: Option<usize>) {
        self.reconcile_calls.fetch_add(1, Ordering::Relaxed);
        match patches {
            Some(count) => {
                self.patches_emitted.fetch_add(count as u64, Ordering::Relaxed);
            }
            None => {
                self.reconcile_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.reconcile_latency.lock().push(micros(elapsed));
    }

    /// Record one predict call
    pub fn record_prediction(&self, elapsed: Duration, hit: bool) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.prediction_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.prediction_misses.fetch_add(1, Ordering::Relaxed);
        }
        self.predict_latency.lock().push(micros(elapsed));
    }

    /// Record one learn call; `skipped` when it left the pattern table untouched
    pub fn record_learn(&self, elapsed: Duration, skipped: bool) {
        self.learns.fetch_add(1, Ordering::Relaxed);
        if skipped {
            self.learns_skipped.fetch_add(1, Ordering::Relaxed);
        }
        self.learn_latency.lock().push(micros(elapsed));
    }

    /// A predictor instance came alive
    pub fn record_predictor_created(&self) {
        let live = self.live_predictors.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_predictors.fetch_max(live, Ordering::Relaxed);
    }

    /// A predictor instance was dropped
    pub fn record_predictor_destroyed(&self) {
        let _ = self
            .live_predictors
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Patterns evicted to honour a per-key cap
    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// An inbound tree or document was rejected
    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter out
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (avg_reconcile_us, p95_reconcile_us) = {
            let window = self.reconcile_latency.lock();
            (window.average(), window.percentile(0.95))
        };
        let (avg_predict_us, p95_predict_us) = {
            let window = self.predict_latency.lock();
            (window.average(), window.percentile(0.95))
        };
        let avg_learn_us = self.learn_latency.lock().average();

        let predictions = self.predictions.load(Ordering::Relaxed);
        let prediction_hits = self.prediction_hits.load(Ordering::Relaxed);
        let prediction_hit_rate = if predictions > 0 {
            prediction_hits as f64 / predictions as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            reconcile_calls: self.reconcile_calls.load(Ordering::Relaxed),
            reconcile_errors: self.reconcile_errors.load(Ordering::Relaxed),
            patches_emitted: self.patches_emitted.load(Ordering::Relaxed),
            avg_reconcile_us,
            p95_reconcile_us,
            learns: self.learns.load(Ordering::Relaxed),
            learns_skipped: self.learns_skipped.load(Ordering::Relaxed),
            avg_learn_us,
            predictions,
            prediction_hits,
            prediction_misses: self.prediction_misses.load(Ordering::Relaxed),
            prediction_hit_rate,
            avg_predict_us,
            p95_predict_us,
            live_predictors: self.live_predictors.load(Ordering::Relaxed),
            peak_predictors: self.peak_predictors.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter and window
    ///
    /// The live predictor count describes instances that still exist, so it
    /// survives; the peak restarts from it.
    pub fn reset(&self) {
        for counter in [
            &self.reconcile_calls,
            &self.reconcile_errors,
            &self.patches_emitted,
            &self.learns,
            &self.learns_skipped,
            &self.predictions,
            &self.prediction_hits,
            &self.prediction_misses,
            &self.evictions,
            &self.validation_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.peak_predictors
            .store(self.live_predictors.load(Ordering::Relaxed), Ordering::Relaxed);
        self.reconcile_latency.lock().clear();
        self.predict_latency.lock().clear();
        self.learn_latency.lock().clear();
    }

    /// Snapshot as JSON
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
