//! Safe counterparts of the exported entry points
//!
//! Each function here takes and returns Rust types and does all of the
//! parsing, validation and dispatch; the `extern "C"` layer only converts
//! pointers and statuses. The handle is resolved first, so a destroyed
//! handle is reported as such whatever the payloads hold. Every tree payload
//! is then parsed with the default [`ValidationConfig`] limits, so a
//! rejected input never reaches a predictor.

use crate::error::{FfiError, Result};
use crate::registry;
use minimact_predictor::{LearnOutcome, Predictor, PredictorConfig, StateChange};
use minimact_telemetry::{logging, metrics};
use minimact_vdom::{from_json_checked, patches_from_json, Patch, VNode, ValidationConfig};

fn parse_tree(json: &str) -> Result<VNode> {
    from_json_checked(json, &ValidationConfig::default()).map_err(|e| {
        metrics().record_validation_failure();
        FfiError::from(e)
    })
}

fn parse_change(json: &str) -> Result<StateChange> {
    Ok(StateChange::from_json(json)?)
}

fn parse_patches(json: &str) -> Result<Vec<Patch>> {
    let limit = ValidationConfig::default().max_json;
    if json.len() > limit {
        return Err(minimact_vdom::VdomError::limit("patch list JSON bytes", json.len(), limit).into());
    }
    Ok(patches_from_json(json)?)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| FfiError::Serialization(e.to_string()))
}

/// Create a predictor and register it
///
/// A threshold outside (0, 1] (including NaN) and a zero pattern cap select
/// the defaults.
pub fn predictor_new(confidence_threshold: f32, max_patterns_per_key: u32) -> Result<u64> {
    let mut config = PredictorConfig::default();
    let threshold = f64::from(confidence_threshold);
    if threshold > 0.0 && threshold <= 1.0 {
        config.min_confidence = threshold;
    }
    if max_patterns_per_key > 0 {
        config.max_patterns_per_key = max_patterns_per_key as usize;
    }
    let predictor = Predictor::with_config(config)?;
    registry::register(predictor)
}

/// Destroy a predictor
pub fn predictor_destroy(handle: u64) -> Result<()> {
    registry::unregister(handle)
}

/// Observe a transition
pub fn predictor_learn(handle: u64, change_json: &str, old_json: &str, new_json: &str) -> Result<LearnOutcome> {
    let predictor = registry::lookup(handle)?;
    let change = parse_change(change_json)?;
    let old = parse_tree(old_json)?;
    let new = parse_tree(new_json)?;
    Ok(predictor.learn(&change, &old, &new))
}

/// Predicted patches as JSON, or `None` when there is no prediction
pub fn predictor_predict(handle: u64, change_json: &str, current_json: &str) -> Result<Option<String>> {
    let predictor = registry::lookup(handle)?;
    let change = parse_change(change_json)?;
    let current = parse_tree(current_json)?;
    predictor
        .predict(&change, &current)
        .map(|prediction| to_json(&prediction))
        .transpose()
}

/// Compare the stored prediction with authoritative patches
///
/// `None` when no pattern exists for the change's shape.
pub fn predictor_verify(handle: u64, change_json: &str, patches_json: &str) -> Result<Option<bool>> {
    let predictor = registry::lookup(handle)?;
    let change = parse_change(change_json)?;
    let actual = parse_patches(patches_json)?;
    Ok(predictor.verify(&change, &actual))
}

/// Per-instance statistics as JSON
pub fn predictor_stats(handle: u64) -> Result<String> {
    let predictor = registry::lookup(handle)?;
    to_json(&predictor.stats())
}

/// Serialize a predictor's patterns and configuration
pub fn predictor_save(handle: u64) -> Result<String> {
    let predictor = registry::lookup(handle)?;
    Ok(predictor.save_to_json()?)
}

/// Rebuild a predictor from [`predictor_save`] output and register it
pub fn predictor_load(json: &str) -> Result<u64> {
    let predictor = Predictor::load_from_json(json)?;
    registry::register(predictor)
}

/// Diff two trees; the patch list as JSON
pub fn reconcile(old_json: &str, new_json: &str) -> Result<String> {
    let old = parse_tree(old_json)?;
    let new = parse_tree(new_json)?;
    let patches = minimact_reconciler::reconcile(&old, &new)?;
    to_json(&patches)
}

/// Start capturing log records
pub fn logging_enable() {
    logging::enable();
}

/// Stop capturing log records
pub fn logging_disable() {
    logging::disable();
}

/// Set the minimum captured level from a boundary code
///
/// Unknown codes select info.
pub fn logging_set_level(code: i32) {
    let filter = logging::level_from_code(code).unwrap_or_else(|| {
        log::warn!("unknown log level code {}, using info", code);
        log::LevelFilter::Info
    });
    logging::set_level(filter);
}

/// Captured log entries as JSON
pub fn logging_get_logs() -> String {
    logging::entries_json()
}

/// Drop captured log entries
pub fn logging_clear() {
    logging::clear();
}

/// Process-wide metrics as JSON
pub fn metrics_get() -> Result<String> {
    metrics()
        .snapshot_json()
        .map_err(|e| FfiError::Serialization(e.to_string()))
}

/// Zero the process-wide metrics
pub fn metrics_reset() {
    metrics().reset();
}
