//! FFI bindings for Synheart Exhaustion
//!
//! C-compatible JSON-in/JSON-out functions. All inputs are null-terminated C
//! strings; returned strings are allocated here and must be released with
//! `exhaust_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{
    exhaustion_from_json, pattern_from_json, trajectory_from_json, ExhaustionProcessor,
    DEFAULT_HISTORY_WINDOW,
};
use crate::types::{BehavioralMetrics, FaceObservation};

// Thread-local storage for the last error message
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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a JSON result to C, recording the error on failure
fn respond(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Resolve a processor handle, recording an error for NULL
unsafe fn handle_mut<'a>(
    processor: *mut ExhaustProcessorHandle,
) -> Option<&'a mut ExhaustProcessorHandle> {
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return None;
    }
    Some(&mut *processor)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Fuse behavioral and physiological metrics.
///
/// # Safety
/// - `json` must be a valid null-terminated C string holding
///   `{"behavioral": {...}, "physiological": {...}}`.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_index(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    respond(exhaustion_from_json(json_str))
}

/// Predict the score trajectory from a JSON array of fused scores.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_trajectory(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    respond(trajectory_from_json(json_str))
}

/// Attribute the exhaustion pattern from a JSON array of factor contributions.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_pattern(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    respond(pattern_from_json(json_str))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to an ExhaustionProcessor
pub struct ExhaustProcessorHandle {
    processor: ExhaustionProcessor,
}

/// Create a new processor keeping `history_window` fused scores.
///
/// # Safety
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `exhaust_processor_free`.
/// - A non-positive window selects the default.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_new(history_window: i32) -> *mut ExhaustProcessorHandle {
    clear_last_error();

    let window = if history_window <= 0 {
        DEFAULT_HISTORY_WINDOW
    } else {
        history_window as usize
    };

    let processor = ExhaustionProcessor::with_history_window(window);
    Box::into_raw(Box::new(ExhaustProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_free(processor: *mut ExhaustProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process one frame and return its `FrameMetrics` as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - `face_json` is a `{"keypoints": [...]}` C string, or NULL when no face was detected.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_process_frame(
    processor: *mut ExhaustProcessorHandle,
    face_json: *const c_char,
    timestamp_ms: i64,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_mut(processor) else {
        return ptr::null_mut();
    };

    let face = if face_json.is_null() {
        None
    } else {
        let Some(json_str) = cstr_to_string(face_json) else {
            set_last_error("Invalid face JSON string");
            return ptr::null_mut();
        };
        match serde_json::from_str::<FaceObservation>(&json_str) {
            Ok(face) => Some(face),
            Err(e) => {
                set_last_error(&ComputeError::from(e).to_string());
                return ptr::null_mut();
            }
        }
    };

    respond(
        handle
            .processor
            .process_frame(face.as_ref(), timestamp_ms)
            .and_then(|metrics| serde_json::to_string(&metrics).map_err(ComputeError::from)),
    )
}

/// Fuse behavioral metrics with the latest frame and record the score.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - `behavioral_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_fuse(
    processor: *mut ExhaustProcessorHandle,
    behavioral_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_mut(processor) else {
        return ptr::null_mut();
    };
    let Some(json_str) = cstr_to_string(behavioral_json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    respond((|| -> Result<String, ComputeError> {
        let behavioral: BehavioralMetrics = serde_json::from_str(&json_str)?;
        let result = handle.processor.fuse(&behavioral);
        Ok(serde_json::to_string(&result)?)
    })())
}

/// Fuse, attribute and predict in one call.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - `behavioral_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_analyze(
    processor: *mut ExhaustProcessorHandle,
    behavioral_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_mut(processor) else {
        return ptr::null_mut();
    };
    let Some(json_str) = cstr_to_string(behavioral_json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    respond((|| -> Result<String, ComputeError> {
        let behavioral: BehavioralMetrics = serde_json::from_str(&json_str)?;
        let report = handle.processor.analyze(&behavioral);
        Ok(serde_json::to_string(&report)?)
    })())
}

/// Predict the trajectory from the processor's score history.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_predict(
    processor: *mut ExhaustProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_mut(processor) else {
        return ptr::null_mut();
    };

    let prediction = handle.processor.predict();
    respond(serde_json::to_string(&prediction).map_err(ComputeError::from))
}

/// Save the processor's score history to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - Returns a newly allocated string that must be freed with `exhaust_free_string`.
/// - Returns NULL on error; call `exhaust_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_save_history(
    processor: *mut ExhaustProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_mut(processor) else {
        return ptr::null_mut();
    };

    respond(handle.processor.save_history())
}

/// Load the processor's score history from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error (see `exhaust_last_error`).
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_load_history(
    processor: *mut ExhaustProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(handle) = handle_mut(processor) else {
        return -1;
    };
    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match handle.processor.load_history(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Reset the processor to a fresh session.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `exhaust_processor_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn exhaust_processor_reset(processor: *mut ExhaustProcessorHandle) {
    clear_last_error();

    if let Some(handle) = handle_mut(processor) {
        handle.processor.reset();
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `exhaust_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn exhaust_free_string(ptr: *mut c_char) {
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
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `exhaust_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn exhaust_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn exhaust_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
