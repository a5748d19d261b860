//! Integration tests driving the C ABI

use minimact_ffi::*;
use std::ffi::{c_char, CStr, CString};

const OLD: &str = r#"{"type":"Element","tag":"ul","path":"1","children":[
    {"type":"Element","tag":"li","path":"1.1","attributes":{"key":"1"},
     "children":[{"type":"Text","content":"A","path":"1.1.1"}]},
    {"type":"Element","tag":"li","path":"1.2","attributes":{"key":"2"},
     "children":[{"type":"Text","content":"B","path":"1.2.1"}]}]}"#;
const NEW: &str = r#"{"type":"Element","tag":"ul","path":"1","children":[
    {"type":"Element","tag":"li","path":"1.2","attributes":{"key":"2"},
     "children":[{"type":"Text","content":"B","path":"1.2.1"}]},
    {"type":"Element","tag":"li","path":"1.1","attributes":{"key":"1"},
     "children":[{"type":"Text","content":"A","path":"1.1.1"}]}]}"#;
const CHANGE: &str = r#"{"order":{"old":"asc","new":"desc"}}"#;

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Copy a returned string and free it
fn take(ptr: *mut c_char) -> String {
    assert!(!ptr.is_null());
    let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
    assert!(unsafe { minimact_free_string(ptr) }.is_success());
    s
}

/// Status code, freeing any message
fn code(result: FfiResult) -> i32 {
    if !result.message.is_null() {
        take(result.message);
    }
    result.code
}

fn learn(handle: u64, change: &str, old: &str, new: &str) -> i32 {
    let (change, old, new) = (c(change), c(old), c(new));
    code(unsafe { minimact_predictor_learn(handle, change.as_ptr(), old.as_ptr(), new.as_ptr()) })
}

fn predict(handle: u64, change: &str, current: &str) -> (i32, Option<String>) {
    let (change, current) = (c(change), c(current));
    let mut out = std::ptr::null_mut();
    let status = code(unsafe { minimact_predictor_predict(handle, change.as_ptr(), current.as_ptr(), &mut out) });
    let json = if out.is_null() { None } else { Some(take(out)) };
    (status, json)
}

fn stats(handle: u64) -> serde_json::Value {
    let mut out = std::ptr::null_mut();
    assert_eq!(code(unsafe { minimact_predictor_stats(handle, &mut out) }), 0);
    serde_json::from_str(&take(out)).unwrap()
}

#[test]
fn test_keyed_swap_reconciles_to_one_reorder() {
    let (old, new) = (c(OLD), c(NEW));
    let mut out = std::ptr::null_mut();
    assert_eq!(code(unsafe { minimact_reconcile(old.as_ptr(), new.as_ptr(), &mut out) }), 0);
    let patches: serde_json::Value = serde_json::from_str(&take(out)).unwrap();
    let patches = patches.as_array().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0]["type"], "ReorderChildren");
    assert_eq!(patches[0]["order"], serde_json::json!([1, 0]));
}

#[test]
fn test_learn_predict_verify_round_trip() {
    let handle = minimact_predictor_new(0.5, 10);
    assert_ne!(handle, MINIMACT_INVALID_HANDLE);

    assert_eq!(learn(handle, CHANGE, OLD, NEW), ErrorCode::Success as i32);
    let (status, json) = predict(handle, CHANGE, OLD);
    assert_eq!(status, 0);
    let prediction: serde_json::Value = serde_json::from_str(&json.unwrap()).unwrap();
    assert_eq!(prediction["patches"][0]["type"], "ReorderChildren");
    assert!(prediction["confidence"].as_f64().unwrap() > 0.5);

    // No pattern for this shape: success with a null payload.
    let (status, json) = predict(handle, r#"{"other":{"old":1,"new":2}}"#, OLD);
    assert_eq!(status, 0);
    assert!(json.is_none());

    let (change, patches) = (c(CHANGE), c(r#"[{"type":"ReorderChildren","parent_path":"1","order":[1,0]}]"#));
    let mut verdict = 7;
    assert_eq!(
        code(unsafe { minimact_predictor_verify(handle, change.as_ptr(), patches.as_ptr(), &mut verdict) }),
        0
    );
    assert_eq!(verdict, 1);

    let empty = c("[]");
    assert_eq!(
        code(unsafe { minimact_predictor_verify(handle, change.as_ptr(), empty.as_ptr(), &mut verdict) }),
        0
    );
    assert_eq!(verdict, 0);

    let stats = stats(handle);
    assert_eq!(stats["learns"], 1);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["patterns"], 1);

    assert_eq!(code(minimact_predictor_destroy(handle)), 0);
}

#[test]
fn test_destroyed_handle_is_unknown() {
    let handle = minimact_predictor_new(0.0, 0);
    assert_eq!(code(minimact_predictor_destroy(handle)), 0);

    let unknown = ErrorCode::UnknownHandle as i32;
    assert_eq!(code(minimact_predictor_destroy(handle)), unknown);
    assert_eq!(learn(handle, CHANGE, OLD, NEW), unknown);
    assert_eq!(predict(handle, CHANGE, OLD).0, unknown);

    let mut out = std::ptr::null_mut();
    assert_eq!(code(unsafe { minimact_predictor_stats(handle, &mut out) }), unknown);
    assert_eq!(code(unsafe { minimact_predictor_save(handle, &mut out) }), unknown);
    assert!(out.is_null());

    assert_eq!(code(minimact_predictor_destroy(MINIMACT_INVALID_HANDLE)), unknown);
    assert_eq!(code(minimact_predictor_destroy(0xdead_beef)), unknown);
}

#[test]
fn test_malformed_json_has_no_side_effects() {
    let handle = minimact_predictor_new(0.0, 0);
    let deser = ErrorCode::Deserialization as i32;

    assert_eq!(learn(handle, "{not json", OLD, NEW), deser);
    assert_eq!(learn(handle, CHANGE, OLD, r#"{"type":"Widget","path":"1"}"#), deser);
    assert_eq!(predict(handle, CHANGE, "").0, deser);

    let stats = stats(handle);
    assert_eq!(stats["learns"], 0);
    assert_eq!(stats["predictions"], 0);
    assert_eq!(stats["patterns"], 0);

    let (old, bad) = (c(OLD), c("[]"));
    let mut out = std::ptr::null_mut();
    assert_eq!(code(unsafe { minimact_reconcile(old.as_ptr(), bad.as_ptr(), &mut out) }), deser);
    assert!(out.is_null());

    assert_eq!(code(minimact_predictor_destroy(handle)), 0);
}

#[test]
fn test_invalid_utf8_reported() {
    let handle = minimact_predictor_new(0.0, 0);
    let bytes = [b'{', 0xff, b'}', 0];
    let (old, new) = (c(OLD), c(NEW));
    let status = code(unsafe {
        minimact_predictor_learn(handle, bytes.as_ptr() as *const c_char, old.as_ptr(), new.as_ptr())
    });
    assert_eq!(status, ErrorCode::InvalidUtf8 as i32);
    assert_eq!(code(minimact_predictor_destroy(handle)), 0);
}

#[test]
fn test_save_load_through_c_abi() {
    let handle = minimact_predictor_new(0.0, 0);
    assert_eq!(learn(handle, CHANGE, OLD, NEW), 0);

    let mut saved = std::ptr::null_mut();
    assert_eq!(code(unsafe { minimact_predictor_save(handle, &mut saved) }), 0);
    let saved = c(&take(saved));

    let mut loaded = 0u64;
    assert_eq!(code(unsafe { minimact_predictor_load(saved.as_ptr(), &mut loaded) }), 0);
    assert_ne!(loaded, MINIMACT_INVALID_HANDLE);
    assert_eq!(predict(loaded, CHANGE, OLD), predict(handle, CHANGE, OLD));

    let garbage = c(r#"{"version":1,"config":{},"clock":0,"patterns":[{"oops":true}]}"#);
    let mut rejected = 0u64;
    assert_eq!(
        code(unsafe { minimact_predictor_load(garbage.as_ptr(), &mut rejected) }),
        ErrorCode::Deserialization as i32
    );
    assert_eq!(rejected, MINIMACT_INVALID_HANDLE);

    assert_eq!(code(minimact_predictor_destroy(handle)), 0);
    assert_eq!(code(minimact_predictor_destroy(loaded)), 0);
}

#[test]
fn test_error_message_is_a_freeable_string() {
    let result = minimact_predictor_destroy(MINIMACT_INVALID_HANDLE);
    assert_eq!(result.code, ErrorCode::UnknownHandle as i32);
    let message = take(result.message);
    assert!(message.contains("Unknown predictor handle"));
}
