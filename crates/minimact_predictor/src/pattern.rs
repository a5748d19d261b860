//! Learned patterns and the bounded table holding them
//!
//! Recency and age are a logical clock rather than wall time, so eviction
//! order is deterministic and survives a save/load cycle unchanged.
//!
//! Three bounds apply on every insert, each resolved by evicting under the
//! configured [`EvictionPolicy`]:
//!
//! - patterns touching any one state key (a pattern counts against every
//!   key it touches)
//! - distinct state keys; a victim key loses all of its patterns
//! - the estimated size of all resident patterns

use crate::config::{EvictionPolicy, PredictorConfig};
use crate::state::StateShape;
use minimact_vdom::Patch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything learned about one state-change shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPattern {
    /// Shape this pattern answers for
    pub shape: StateShape,
    /// Most recently observed patch list
    pub patches: Vec<Patch>,
    /// Number of learn calls folded into this pattern
    pub observations: u64,
    /// Confidence in `patches`, within [0, 1]
    pub confidence: f64,
    /// Logical time the pattern was first learned
    #[serde(default)]
    pub created: u64,
    /// Logical time of the last learn or predict touching this pattern
    pub last_used: u64,
    /// Predictions served from this pattern
    #[serde(default)]
    pub predictions: u64,
    /// Verified predictions that matched the authoritative patches
    #[serde(default)]
    pub correct: u64,
    /// Verified predictions that did not
    #[serde(default)]
    pub incorrect: u64,
}

impl PredictionPattern {
    /// A freshly learned pattern
    pub fn new(shape: StateShape, patches: Vec<Patch>, confidence: f64, now: u64) -> Self {
        Self {
            shape,
            patches,
            observations: 1,
            confidence,
            created: now,
            last_used: now,
            predictions: 0,
            correct: 0,
            incorrect: 0,
        }
    }

    /// Share of verified predictions that were correct
    pub fn accuracy(&self) -> Option<f64> {
        let verified = self.correct + self.incorrect;
        (verified > 0).then(|| self.correct as f64 / verified as f64)
    }

    /// Rough heap footprint in bytes
    pub fn estimate_size(&self) -> usize {
        let keys: usize = self.shape.keys().map(str::len).sum();
        let patches: usize = self.patches.iter().map(Patch::estimate_size).sum();
        std::mem::size_of::<Self>() + keys + patches
    }
}

/// Bounds a [`PatternTable`] enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLimits {
    pub max_per_key: usize,
    pub max_state_keys: usize,
    pub max_memory_bytes: usize,
    pub policy: EvictionPolicy,
}

impl TableLimits {
    /// The limits a predictor configuration asks for
    pub fn of(config: &PredictorConfig) -> Self {
        Self {
            max_per_key: config.max_patterns_per_key,
            max_state_keys: config.max_state_keys,
            max_memory_bytes: config.max_memory_bytes,
            policy: config.eviction_policy,
        }
    }
}

impl Default for TableLimits {
    fn default() -> Self {
        Self::of(&PredictorConfig::default())
    }
}

/// Patterns indexed by shape and by state key
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: BTreeMap<StateShape, PredictionPattern>,
    by_key: BTreeMap<String, BTreeSet<StateShape>>,
    clock: u64,
    limits: TableLimits,
    memory_bytes: usize,
}

impl PatternTable {
    /// Create an empty table
    pub fn new(limits: TableLimits) -> Self {
        Self {
            patterns: BTreeMap::new(),
            by_key: BTreeMap::new(),
            clock: 0,
            limits: TableLimits {
                max_per_key: limits.max_per_key.max(1),
                max_state_keys: limits.max_state_keys.max(1),
                max_memory_bytes: limits.max_memory_bytes.max(1),
                policy: limits.policy,
            },
            memory_bytes: 0,
        }
    }

    /// Advance the logical clock and return the new time
    pub fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Current logical time
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub(crate) fn set_clock(&mut self, clock: u64) {
        self.clock = clock;
    }

    /// Look up a pattern
    pub fn get(&self, shape: &StateShape) -> Option<&PredictionPattern> {
        self.patterns.get(shape)
    }

    /// Look up a pattern to update its counters
    ///
    /// Use [`PatternTable::replace_patches`] to change the patch list, so
    /// the memory estimate stays current.
    pub fn get_mut(&mut self, shape: &StateShape) -> Option<&mut PredictionPattern> {
        self.patterns.get_mut(shape)
    }

    /// Insert a new pattern and enforce every bound; returns how many
    /// patterns were evicted
    ///
    /// Other patterns go first. The new one is only dropped when it alone
    /// touches more keys than allowed or outgrows the memory budget.
    pub fn insert(&mut self, pattern: PredictionPattern) -> usize {
        let shape = pattern.shape.clone();
        self.remove(&shape);
        self.memory_bytes += pattern.estimate_size();
        for key in shape.keys() {
            self.by_key
                .entry(key.to_string())
                .or_default()
                .insert(shape.clone());
        }
        self.patterns.insert(shape.clone(), pattern);

        self.enforce_per_key(&shape) + self.enforce_state_keys(&shape) + self.enforce_memory(&shape)
    }

    /// Swap the patch list of a resident pattern; returns how many patterns
    /// the memory budget evicted as a result
    pub fn replace_patches(&mut self, shape: &StateShape, patches: Vec<Patch>) -> usize {
        let Some(pattern) = self.patterns.get_mut(shape) else {
            return 0;
        };
        let before = pattern.estimate_size();
        pattern.patches = patches;
        let after = pattern.estimate_size();
        self.memory_bytes = self.memory_bytes.saturating_sub(before) + after;
        self.enforce_memory(shape)
    }

    fn enforce_per_key(&mut self, keep: &StateShape) -> usize {
        let mut evicted = 0;
        for key in keep.keys() {
            while self.count_for_key(key) > self.limits.max_per_key {
                let victim = self
                    .by_key
                    .get(key)
                    .and_then(|shapes| self.victim(shapes.iter(), keep));
                match victim {
                    Some(victim) => {
                        self.evict(&victim, key);
                        evicted += 1;
                    }
                    None => break,
                }
            }
        }
        evicted
    }

    fn enforce_state_keys(&mut self, keep: &StateShape) -> usize {
        let mut evicted = 0;
        while self.by_key.len() > self.limits.max_state_keys {
            let Some(key) = self.victim_key(keep) else {
                break;
            };
            let shapes: Vec<StateShape> = self
                .by_key
                .get(&key)
                .map(|shapes| shapes.iter().cloned().collect())
                .unwrap_or_default();
            for shape in shapes {
                self.evict(&shape, "state key limit");
                evicted += 1;
            }
        }
        if self.by_key.len() > self.limits.max_state_keys && self.patterns.contains_key(keep) {
            log::warn!(
                "pattern {} touches more than {} state keys, not kept",
                keep,
                self.limits.max_state_keys
            );
            self.remove(keep);
            evicted += 1;
        }
        evicted
    }

    fn enforce_memory(&mut self, keep: &StateShape) -> usize {
        let mut evicted = 0;
        while self.memory_bytes > self.limits.max_memory_bytes {
            match self.victim(self.patterns.keys(), keep) {
                Some(victim) => {
                    self.evict(&victim, "memory budget");
                    evicted += 1;
                }
                None => break,
            }
        }
        if self.memory_bytes > self.limits.max_memory_bytes && self.patterns.contains_key(keep) {
            log::warn!(
                "pattern {} alone exceeds the {} byte budget, not kept",
                keep,
                self.limits.max_memory_bytes
            );
            self.remove(keep);
            evicted += 1;
        }
        evicted
    }

    fn evict(&mut self, shape: &StateShape, reason: &str) {
        log::debug!("evicting pattern {} ({:?}, {})", shape, self.limits.policy, reason);
        self.remove(shape);
    }

    /// Ordering key under the policy; the smallest goes first
    fn rank(&self, pattern: &PredictionPattern) -> (u64, u64) {
        match self.limits.policy {
            EvictionPolicy::LeastRecentlyUsed => (pattern.last_used, pattern.created),
            EvictionPolicy::LeastFrequentlyUsed => (pattern.observations, pattern.last_used),
            EvictionPolicy::OldestFirst => (pattern.created, pattern.last_used),
        }
    }

    fn victim<'a>(
        &self,
        candidates: impl Iterator<Item = &'a StateShape>,
        keep: &StateShape,
    ) -> Option<StateShape> {
        candidates
            .filter(|shape| *shape != keep)
            .filter_map(|shape| self.patterns.get(shape))
            .min_by(|a, b| {
                self.rank(a)
                    .cmp(&self.rank(b))
                    .then_with(|| a.shape.cmp(&b.shape))
            })
            .map(|p| p.shape.clone())
    }

    /// The state key to drop when there are too many, never one `keep` touches
    fn victim_key(&self, keep: &StateShape) -> Option<String> {
        self.by_key
            .iter()
            .filter(|(key, _)| !keep.touches(key))
            .map(|(key, shapes)| {
                let patterns = shapes.iter().filter_map(|shape| self.patterns.get(shape));
                let score = match self.limits.policy {
                    EvictionPolicy::LeastRecentlyUsed => patterns.map(|p| p.last_used).max().unwrap_or(0),
                    EvictionPolicy::LeastFrequentlyUsed => patterns.map(|p| p.observations).sum(),
                    EvictionPolicy::OldestFirst => patterns.map(|p| p.created).min().unwrap_or(0),
                };
                (score, key)
            })
            .min()
            .map(|(_, key)| key.clone())
    }

    /// Remove a pattern and its index entries
    pub fn remove(&mut self, shape: &StateShape) -> Option<PredictionPattern> {
        let pattern = self.patterns.remove(shape)?;
        self.memory_bytes = self.memory_bytes.saturating_sub(pattern.estimate_size());
        for key in shape.keys() {
            if let Some(set) = self.by_key.get_mut(key) {
                set.remove(shape);
                if set.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        Some(pattern)
    }

    /// Resident patterns touching `key`
    pub fn count_for_key(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, BTreeSet::len)
    }

    /// Number of distinct state keys with at least one pattern
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    /// Estimated size of every resident pattern
    pub fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }

    /// Bounds in force
    pub fn limits(&self) -> &TableLimits {
        &self.limits
    }

    /// Total resident patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns in shape order
    pub fn iter(&self) -> impl Iterator<Item = &PredictionPattern> {
        self.patterns.values()
    }
}
