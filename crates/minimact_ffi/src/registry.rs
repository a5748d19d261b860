//! Process-wide predictor registry
//!
//! Maps the opaque `u64` handles the host holds to predictor instances.
//! Lookups hand out an `Arc`, so a predictor destroyed while another thread
//! is using it lives until that call returns; new calls with the destroyed
//! handle fail with `UnknownHandle`.

use crate::error::{FfiError, Result};
use minimact_core::{Handle, HandleError, HandleMap};
use minimact_predictor::Predictor;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Handle value that never refers to a predictor
pub const MINIMACT_INVALID_HANDLE: u64 = u64::MAX;

/// Handle type used for predictors
pub type PredictorHandle = Handle<Arc<Predictor>>;

static PREDICTORS: OnceLock<RwLock<HandleMap<Arc<Predictor>>>> = OnceLock::new();

fn predictors() -> &'static RwLock<HandleMap<Arc<Predictor>>> {
    PREDICTORS.get_or_init(|| RwLock::new(HandleMap::new()))
}

/// Take ownership of a predictor and return its handle bits
pub fn register(predictor: Predictor) -> Result<u64> {
    let handle = predictors()
        .write()
        .insert(Arc::new(predictor))
        .ok_or_else(|| FfiError::InternalInvariantViolation("predictor handle space exhausted".into()))?;
    log::debug!("registered predictor {:?}", handle);
    Ok(handle.to_bits())
}

/// Resolve handle bits to a predictor
pub fn lookup(bits: u64) -> Result<Arc<Predictor>> {
    let handle = PredictorHandle::from_bits(bits);
    if handle.is_null() {
        return Err(FfiError::unknown_handle(bits, HandleError::Null));
    }
    predictors()
        .read()
        .try_get(handle)
        .map(Arc::clone)
        .map_err(|reason| FfiError::unknown_handle(bits, reason))
}

/// Remove a predictor; later lookups of `bits` fail
pub fn unregister(bits: u64) -> Result<()> {
    let handle = PredictorHandle::from_bits(bits);
    let removed = predictors()
        .write()
        .try_remove(handle)
        .map_err(|reason| FfiError::unknown_handle(bits, reason))?;
    log::debug!("unregistered predictor {:?}", handle);
    // Dropped outside the lock.
    drop(removed);
    Ok(())
}

/// Number of registered predictors
pub fn count() -> usize {
    predictors().read().len()
}
