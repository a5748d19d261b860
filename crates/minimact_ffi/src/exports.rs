//! `extern "C"` entry points
//!
//! Conventions shared by every function:
//!
//! - Fallible calls return an [`FfiResult`]. Its `message` is null on
//!   success and otherwise a library-owned string.
//! - Output values go through out-pointers, which are checked for null
//!   before any work is done, so a bad out-pointer never leaves a side
//!   effect behind.
//! - Every string the library returns must be released exactly once with
//!   [`minimact_free_string`]. [`minimact_live_strings`] reports how many
//!   are outstanding.
//! - Panics are caught and reported as `InternalInvariantViolation`.

use crate::api;
use crate::error::{FfiError, FfiResult, Result};
use crate::registry::MINIMACT_INVALID_HANDLE;
use crate::strings;
use std::any::Any;
use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn guard<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => {
            if let Err(e) = &result {
                log::debug!("{} failed: {}", name, e);
            }
            result
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("{} panicked: {}", name, message);
            Err(FfiError::InternalInvariantViolation(format!("{} panicked: {}", name, message)))
        }
    }
}

fn status(name: &str, f: impl FnOnce() -> Result<()>) -> FfiResult {
    match guard(name, f) {
        Ok(()) => FfiResult::success(),
        Err(e) => FfiResult::from_error(&e),
    }
}

fn check_out<T>(out: *mut T, name: &'static str) -> Result<()> {
    if out.is_null() {
        Err(FfiError::NullPointer(name))
    } else {
        Ok(())
    }
}

/// Write a string to an out-pointer already checked for null
///
/// # Safety
///
/// `out` must be valid for writes.
unsafe fn write_string(out: *mut *mut c_char, value: String) -> Result<()> {
    *out = strings::into_raw(value)?;
    Ok(())
}

/// Create a predictor
///
/// A threshold outside (0, 1] or NaN, and a zero pattern cap, select the
/// defaults. Returns `MINIMACT_INVALID_HANDLE` on failure.
#[no_mangle]
pub extern "C" fn minimact_predictor_new(confidence_threshold: f32, max_patterns_per_key: u32) -> u64 {
    guard("minimact_predictor_new", || {
        api::predictor_new(confidence_threshold, max_patterns_per_key)
    })
    .unwrap_or(MINIMACT_INVALID_HANDLE)
}

/// Destroy a predictor; the handle is invalid afterwards
#[no_mangle]
pub extern "C" fn minimact_predictor_destroy(handle: u64) -> FfiResult {
    status("minimact_predictor_destroy", || api::predictor_destroy(handle))
}

/// Observe a transition
///
/// # Safety
///
/// Every string argument must be null or a NUL-terminated buffer valid for
/// the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn minimact_predictor_learn(
    handle: u64,
    state_change_json: *const c_char,
    old_tree_json: *const c_char,
    new_tree_json: *const c_char,
) -> FfiResult {
    status("minimact_predictor_learn", || {
        let change = strings::read(state_change_json, "state_change_json")?;
        let old = strings::read(old_tree_json, "old_tree_json")?;
        let new = strings::read(new_tree_json, "new_tree_json")?;
        api::predictor_learn(handle, change, old, new).map(|_| ())
    })
}

/// Predict patches for a state change
///
/// Writes the prediction JSON to `out_json`, or null when there is no
/// prediction. The string must be freed with `minimact_free_string`.
///
/// # Safety
///
/// String arguments as for `minimact_predictor_learn`; `out_json` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn minimact_predictor_predict(
    handle: u64,
    state_change_json: *const c_char,
    current_tree_json: *const c_char,
    out_json: *mut *mut c_char,
) -> FfiResult {
    status("minimact_predictor_predict", || {
        check_out(out_json, "out_json")?;
        *out_json = std::ptr::null_mut();
        let change = strings::read(state_change_json, "state_change_json")?;
        let current = strings::read(current_tree_json, "current_tree_json")?;
        if let Some(json) = api::predictor_predict(handle, change, current)? {
            write_string(out_json, json)?;
        }
        Ok(())
    })
}

/// Compare the stored prediction with the authoritative patch list
///
/// Writes 1 when they match, 0 when they differ and -1 when no pattern
/// exists for the change's shape.
///
/// # Safety
///
/// String arguments as for `minimact_predictor_learn`; `out_result` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn minimact_predictor_verify(
    handle: u64,
    state_change_json: *const c_char,
    patches_json: *const c_char,
    out_result: *mut i32,
) -> FfiResult {
    status("minimact_predictor_verify", || {
        check_out(out_result, "out_result")?;
        let change = strings::read(state_change_json, "state_change_json")?;
        let patches = strings::read(patches_json, "patches_json")?;
        *out_result = match api::predictor_verify(handle, change, patches)? {
            Some(true) => 1,
            Some(false) => 0,
            None => -1,
        };
        Ok(())
    })
}

/// Per-instance statistics as JSON
///
/// # Safety
///
/// `out_json` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn minimact_predictor_stats(handle: u64, out_json: *mut *mut c_char) -> FfiResult {
    status("minimact_predictor_stats", || {
        check_out(out_json, "out_json")?;
        write_string(out_json, api::predictor_stats(handle)?)
    })
}

/// Serialize a predictor
///
/// # Safety
///
/// `out_json` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn minimact_predictor_save(handle: u64, out_json: *mut *mut c_char) -> FfiResult {
    status("minimact_predictor_save", || {
        check_out(out_json, "out_json")?;
        write_string(out_json, api::predictor_save(handle)?)
    })
}

/// Create a predictor from `minimact_predictor_save` output
///
/// Nothing is registered when the snapshot is rejected.
///
/// # Safety
///
/// `json` must be null or NUL-terminated; `out_handle` must be valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn minimact_predictor_load(json: *const c_char, out_handle: *mut u64) -> FfiResult {
    status("minimact_predictor_load", || {
        check_out(out_handle, "out_handle")?;
        *out_handle = MINIMACT_INVALID_HANDLE;
        let json = strings::read(json, "json")?;
        *out_handle = api::predictor_load(json)?;
        Ok(())
    })
}

/// Diff two trees, writing the patch list JSON to `out_json`
///
/// # Safety
///
/// String arguments must be null or NUL-terminated; `out_json` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn minimact_reconcile(
    old_tree_json: *const c_char,
    new_tree_json: *const c_char,
    out_json: *mut *mut c_char,
) -> FfiResult {
    status("minimact_reconcile", || {
        check_out(out_json, "out_json")?;
        *out_json = std::ptr::null_mut();
        let old = strings::read(old_tree_json, "old_tree_json")?;
        let new = strings::read(new_tree_json, "new_tree_json")?;
        write_string(out_json, api::reconcile(old, new)?)
    })
}

/// Start capturing log records
#[no_mangle]
pub extern "C" fn minimact_logging_enable() {
    let _ = guard("minimact_logging_enable", || {
        api::logging_enable();
        Ok(())
    });
}

/// Stop capturing log records
#[no_mangle]
pub extern "C" fn minimact_logging_disable() {
    let _ = guard("minimact_logging_disable", || {
        api::logging_disable();
        Ok(())
    });
}

/// Set the minimum captured level: 0 trace, 1 debug, 2 info, 3 warn, 4 error
#[no_mangle]
pub extern "C" fn minimact_logging_set_level(level: i32) {
    let _ = guard("minimact_logging_set_level", || {
        api::logging_set_level(level);
        Ok(())
    });
}

/// Captured log entries as JSON; null on failure
#[no_mangle]
pub extern "C" fn minimact_logging_get_logs() -> *mut c_char {
    guard("minimact_logging_get_logs", || strings::into_raw(api::logging_get_logs()))
        .unwrap_or(std::ptr::null_mut())
}

/// Drop captured log entries
#[no_mangle]
pub extern "C" fn minimact_logging_clear() {
    let _ = guard("minimact_logging_clear", || {
        api::logging_clear();
        Ok(())
    });
}

/// Process-wide metrics as JSON; null on failure
#[no_mangle]
pub extern "C" fn minimact_metrics_get() -> *mut c_char {
    guard("minimact_metrics_get", || strings::into_raw(api::metrics_get()?))
        .unwrap_or(std::ptr::null_mut())
}

/// Zero the process-wide metrics
#[no_mangle]
pub extern "C" fn minimact_metrics_reset() {
    let _ = guard("minimact_metrics_reset", || {
        api::metrics_reset();
        Ok(())
    });
}

/// Free a string returned by this library
///
/// Null is a no-op. A pointer that was already freed or never came from
/// this library yields `InvalidString` and is left alone.
///
/// # Safety
///
/// `ptr` must not be used after a successful call.
#[no_mangle]
pub unsafe extern "C" fn minimact_free_string(ptr: *mut c_char) -> FfiResult {
    status("minimact_free_string", || strings::free(ptr))
}

/// Number of returned strings not yet freed
#[no_mangle]
pub extern "C" fn minimact_live_strings() -> u64 {
    strings::live_count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::ffi::{CStr, CString};

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_guard_catches_panics() {
        let result: Result<()> = guard("test", || panic!("boom"));
        match result {
            Err(FfiError::InternalInvariantViolation(message)) => assert!(message.contains("boom")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_null_out_pointer_has_no_side_effects() {
        let json = c(r#"{"version":1,"config":{},"clock":0,"patterns":[]}"#);
        let before = crate::registry::count();
        let result = unsafe { minimact_predictor_load(json.as_ptr(), std::ptr::null_mut()) };
        assert_eq!(result.code, ErrorCode::NullPointer as i32);
        assert!(crate::registry::count() <= before);
        unsafe { minimact_free_string(result.message) };
    }

    #[test]
    fn test_reconcile_through_c_abi() {
        let old = c(r#"{"type":"Element","tag":"div","path":"1","attributes":{"class":"x"}}"#);
        let new = c(r#"{"type":"Element","tag":"div","path":"1","attributes":{"class":"y"}}"#);
        let mut out = std::ptr::null_mut();
        let result = unsafe { minimact_reconcile(old.as_ptr(), new.as_ptr(), &mut out) };
        assert!(result.is_success());
        let json = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        assert!(json.contains("SetAttribute"));
        assert!(unsafe { minimact_free_string(out) }.is_success());
    }

    #[test]
    fn test_null_argument_reported() {
        let new = c(r#"{"type":"Null","path":"1"}"#);
        let mut out = std::ptr::null_mut();
        let result = unsafe { minimact_reconcile(std::ptr::null(), new.as_ptr(), &mut out) };
        assert_eq!(result.code, ErrorCode::NullPointer as i32);
        assert!(out.is_null());
        let message = unsafe { CStr::from_ptr(result.message) }.to_str().unwrap().to_string();
        assert!(message.contains("old_tree_json"));
        unsafe { minimact_free_string(result.message) };
    }
}
