//! Ownership of strings handed to the host
//!
//! Every string the library returns is allocated with `CString::into_raw`
//! and its address recorded in a live set. Freeing checks the set first, so
//! a double free or a pointer the library never issued is reported as
//! [`FfiError::InvalidString`] rather than corrupting the heap.

use crate::error::{FfiError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::{c_char, CStr, CString};
use std::sync::OnceLock;

static LIVE: OnceLock<Mutex<HashSet<usize>>> = OnceLock::new();

fn live() -> &'static Mutex<HashSet<usize>> {
    LIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Hand a string to the host
///
/// Fails when `s` contains an interior NUL.
pub fn into_raw(s: String) -> Result<*mut c_char> {
    let c = CString::new(s)
        .map_err(|e| FfiError::Serialization(format!("interior NUL at byte {}", e.nul_position())))?;
    let ptr = c.into_raw();
    live().lock().insert(ptr as usize);
    Ok(ptr)
}

/// Like [`into_raw`], dropping interior NULs instead of failing
pub fn into_raw_lossy(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', "") } else { s };
    match into_raw(s) {
        Ok(ptr) => ptr,
        Err(_) => std::ptr::null_mut(),
    }
}

/// Release a string previously returned by [`into_raw`]
///
/// Null is accepted and ignored.
///
/// # Safety
///
/// `ptr` is only dereferenced when it is in the live set, in which case it
/// came from `CString::into_raw` and has not been freed since.
pub unsafe fn free(ptr: *mut c_char) -> Result<()> {
    if ptr.is_null() {
        return Ok(());
    }
    if !live().lock().remove(&(ptr as usize)) {
        log::error!("free of unknown or already freed string {:p}", ptr);
        return Err(FfiError::InvalidString(ptr as usize));
    }
    drop(CString::from_raw(ptr));
    Ok(())
}

/// Number of strings handed out and not yet freed
pub fn live_count() -> usize {
    live().lock().len()
}

/// Borrow a host string argument
///
/// # Safety
///
/// A non-null `ptr` must point to a NUL-terminated buffer that stays valid
/// and unmodified for `'a`.
pub unsafe fn read<'a>(ptr: *const c_char, name: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer(name));
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| FfiError::InvalidUtf8(name))
}
