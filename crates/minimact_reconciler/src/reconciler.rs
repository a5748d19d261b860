//! Validated, instrumented reconciliation

use crate::diff::diff;
use crate::error::{ReconcileError, Result};
use minimact_telemetry::metrics;
use minimact_vdom::{patched, Patch, VNode, ValidationConfig};
use std::time::Instant;

/// Reconciler configuration
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
    /// Limits both input trees must satisfy
    pub validation: ValidationConfig,
    /// Re-apply the result to a copy of the old tree and compare with the new one
    pub self_check: bool,
}

impl ReconcileConfig {
    /// Default limits with the self-check turned on
    pub fn checked() -> Self {
        Self {
            self_check: true,
            ..Default::default()
        }
    }
}

/// Computes patch lists between trees
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a reconciler with the given configuration
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Validate both trees, then diff them
    pub fn reconcile(&self, old: &VNode, new: &VNode) -> Result<Vec<Patch>> {
        let start = Instant::now();
        let result = self.reconcile_inner(old, new);
        let elapsed = start.elapsed();

        match &result {
            Ok(patches) => {
                log::debug!("reconciled in {:?}: {} patches", elapsed, patches.len());
                metrics().record_reconcile(elapsed, Some(patches.len()));
            }
            Err(e) => {
                log::warn!("reconcile failed: {}", e);
                metrics().record_reconcile(elapsed, None);
            }
        }
        result
    }

    fn reconcile_inner(&self, old: &VNode, new: &VNode) -> Result<Vec<Patch>> {
        for tree in [old, new] {
            if let Err(e) = tree.validate(&self.config.validation) {
                metrics().record_validation_failure();
                return Err(e.into());
            }
        }

        let patches = diff(old, new);

        if self.config.self_check {
            self.verify(old, new, &patches)?;
        }
        Ok(patches)
    }

    fn verify(&self, old: &VNode, new: &VNode, patches: &[Patch]) -> Result<()> {
        match patched(old, patches) {
            Ok(ref result) if result == new => Ok(()),
            Ok(_) => {
                log::error!(
                    "self-check: {} patches applied cleanly but did not reproduce the new tree",
                    patches.len()
                );
                Err(ReconcileError::invariant(
                    "patch list does not reproduce the new tree",
                ))
            }
            Err(e) => {
                log::error!("self-check: emitted patch list failed to apply: {}", e);
                Err(ReconcileError::invariant(format!(
                    "emitted patch list failed to apply: {}",
                    e
                )))
            }
        }
    }
}

/// Reconcile with the default configuration
pub fn reconcile(old: &VNode, new: &VNode) -> Result<Vec<Patch>> {
    Reconciler::default().reconcile(old, new)
}
