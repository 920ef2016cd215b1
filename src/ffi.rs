//! FFI bindings for the decision engine
//!
//! C-compatible functions for calling the engine from browser-extension hosts
//! and other languages. Inputs and outputs are null-terminated JSON strings;
//! returned strings are allocated here and must be released with
//! `adaptifocus_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::{analyze_json, classify_json, coordinate_json, Coordinator};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("Output contained an interior NUL byte");
            ptr::null_mut()
        }
    }
}

/// Read a JSON argument, run `op`, and hand back the JSON result or NULL
unsafe fn json_call(
    input: *const c_char,
    op: impl FnOnce(&str) -> Result<String, EngineError>,
) -> *mut c_char {
    clear_last_error();

    let Some(json) = cstr_to_string(input) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match op(&json) {
        Ok(out) => string_to_cstr(&out),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API (built-in configuration)
// ============================================================================

/// Run one coordinated decision.
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `adaptifocus_free_string`.
/// - Returns NULL on error; call `adaptifocus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_coordinate(request_json: *const c_char) -> *mut c_char {
    json_call(request_json, coordinate_json)
}

/// Classify the current page.
///
/// # Safety
/// - `page_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `adaptifocus_free_string`.
/// - Returns NULL on error; call `adaptifocus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_classify(page_json: *const c_char) -> *mut c_char {
    json_call(page_json, classify_json)
}

/// Mine patterns from a JSON array of browsing events.
///
/// # Safety
/// - `events_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `adaptifocus_free_string`.
/// - Returns NULL on error; call `adaptifocus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_analyze(events_json: *const c_char) -> *mut c_char {
    json_call(events_json, analyze_json)
}

// ============================================================================
// Configured Coordinator API
// ============================================================================

/// Opaque handle to a configured [`Coordinator`]
pub struct CoordinatorHandle {
    coordinator: Coordinator,
}

/// Create a coordinator from a JSON `EngineConfig`.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for the
///   built-in configuration.
/// - Must be freed with `adaptifocus_coordinator_free`.
/// - Returns NULL on error; call `adaptifocus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_coordinator_new(
    config_json: *const c_char,
) -> *mut CoordinatorHandle {
    clear_last_error();

    let built = if config_json.is_null() {
        Ok(Coordinator::default())
    } else {
        match cstr_to_string(config_json) {
            Some(raw) => {
                EngineConfig::from_json_str(&raw).and_then(|config| Coordinator::from_config(&config))
            }
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match built {
        Ok(coordinator) => Box::into_raw(Box::new(CoordinatorHandle { coordinator })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a coordinator.
///
/// # Safety
/// - `handle` must be a pointer returned by `adaptifocus_coordinator_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_coordinator_free(handle: *mut CoordinatorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Run one coordinated decision with a configured coordinator.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `adaptifocus_coordinator_new`.
/// - `request_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `adaptifocus_free_string`.
/// - Returns NULL on error; call `adaptifocus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_coordinator_coordinate(
    handle: *const CoordinatorHandle,
    request_json: *const c_char,
) -> *mut c_char {
    if handle.is_null() {
        clear_last_error();
        set_last_error("Null coordinator pointer");
        return ptr::null_mut();
    }
    let handle = &*handle;
    json_call(request_json, |raw| handle.coordinator.coordinate_json(raw))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by an engine function.
///
/// # Safety
/// - `ptr` must be a pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string, valid until the next
///   engine call on this thread. Do NOT free it.
/// - Returns NULL if the last call succeeded.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the engine library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn adaptifocus_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        adaptifocus_free_string(ptr);
        s
    }

    unsafe fn last_error() -> Option<String> {
        let ptr = adaptifocus_last_error();
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_str().unwrap().to_string())
        }
    }

    #[test]
    fn test_ffi_coordinate() {
        let request = CString::new(
            r#"{"current_domain": "instagram.com", "current_title": "Feed", "time_on_current_seconds": 500}"#,
        )
        .unwrap();

        unsafe {
            let out = take_string(adaptifocus_coordinate(request.as_ptr()));
            let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
            assert_eq!(parsed["context"]["classification"], "distraction");
            assert_eq!(parsed["decision"]["should_intervene"], true);
            assert!(last_error().is_none());
        }
    }

    #[test]
    fn test_ffi_classify_and_analyze() {
        let page = CString::new(r#"{"url": "https://arxiv.org/abs/1", "title": "Paper"}"#).unwrap();
        let events = CString::new("[]").unwrap();

        unsafe {
            let classified = take_string(adaptifocus_classify(page.as_ptr()));
            assert!(classified.contains("\"classification\":\"study\""));

            let report = take_string(adaptifocus_analyze(events.as_ptr()));
            let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
            assert_eq!(parsed["distraction_chains"], serde_json::json!([]));
        }
    }

    #[test]
    fn test_ffi_invalid_json_sets_error() {
        let bad = CString::new("{broken").unwrap();
        unsafe {
            let out = adaptifocus_coordinate(bad.as_ptr());
            assert!(out.is_null());
            assert!(last_error().unwrap().contains("JSON"));
        }
    }

    #[test]
    fn test_ffi_null_input() {
        unsafe {
            assert!(adaptifocus_classify(ptr::null()).is_null());
            assert_eq!(last_error().as_deref(), Some("Invalid JSON string pointer"));
        }
    }

    #[test]
    fn test_ffi_configured_coordinator() {
        let config = CString::new(r#"{"extend": {"distraction_domains": ["example-games.io"]}}"#)
            .unwrap();
        let request =
            CString::new(r#"{"current_domain": "example-games.io", "current_title": "Level 3"}"#)
                .unwrap();

        unsafe {
            let handle = adaptifocus_coordinator_new(config.as_ptr());
            assert!(!handle.is_null());

            let out = take_string(adaptifocus_coordinator_coordinate(handle, request.as_ptr()));
            let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
            assert_eq!(parsed["context"]["classification"], "distraction");

            adaptifocus_coordinator_free(handle);
        }
    }

    #[test]
    fn test_ffi_rejects_invalid_config() {
        let config = CString::new(r#"{"thresholds": {"nudge": 999}}"#).unwrap();
        unsafe {
            assert!(adaptifocus_coordinator_new(config.as_ptr()).is_null());
            assert!(last_error().unwrap().contains("threshold"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = CStr::from_ptr(adaptifocus_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}
