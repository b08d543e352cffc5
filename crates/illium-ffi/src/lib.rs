//! Illium FFI - the C ABI consumed by the Android and macOS wallet bridges
//!
//! Every exported function takes plain pointers and caller-owned buffers
//! (see `include/illium.h`). Outputs are written only on success, panics are
//! caught at the boundary, and failures surface as the status codes below.
//!
//! The key and signature exports sit on [`illium_core::CryptoProvider`]; the
//! proof exports sit on [`illium_zk::ProofProvider`] over the process-wide
//! [`illium_zk::ParameterStore`].

use std::ffi::{c_char, c_int, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use illium_lurk::EvalError;
use illium_zk::ZkError;
use tracing::error;

pub mod crypto;
pub mod zk;

/// Success
pub const ILLIUM_OK: c_int = 0;
/// Program or parameter text failed to parse
pub const ILLIUM_ERR_PARSE: c_int = 1;
/// Runtime error inside the program
pub const ILLIUM_ERR_EVAL: c_int = 2;
/// Evaluation reached `max_steps`
pub const ILLIUM_ERR_EXHAUSTED: c_int = 3;
/// Proof construction failed after evaluation succeeded
pub const ILLIUM_ERR_PROOF: c_int = 4;
/// `load_public_params` has not completed
pub const ILLIUM_ERR_NOT_INITIALIZED: c_int = 5;
/// Output buffer capacity too small; the required size is reported back
pub const ILLIUM_ERR_BUFFER_TOO_SMALL: c_int = 6;
/// Null pointer, invalid UTF-8 or out-of-range argument
pub const ILLIUM_ERR_INVALID_INPUT: c_int = 7;

pub(crate) fn eval_status(err: &EvalError) -> c_int {
    match err {
        EvalError::Parse { .. } => ILLIUM_ERR_PARSE,
        EvalError::Exhausted { .. } => ILLIUM_ERR_EXHAUSTED,
        _ => ILLIUM_ERR_EVAL,
    }
}

pub(crate) fn zk_status(err: &ZkError) -> c_int {
    match err {
        ZkError::Eval(e) => eval_status(e),
        ZkError::NotInitialized => ILLIUM_ERR_NOT_INITIALIZED,
        ZkError::InvalidInput(_) => ILLIUM_ERR_INVALID_INPUT,
        ZkError::ProofConstruction(_)
        | ZkError::ProofTooLarge { .. }
        | ZkError::InvalidParams(_)
        | ZkError::Io(_)
        | ZkError::Serialization(_) => ILLIUM_ERR_PROOF,
    }
}

/// Run `f`, turning a panic into `fallback`
pub(crate) fn guard<T>(name: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!(function = name, "panic caught at FFI boundary");
        fallback
    })
}

/// Borrow a NUL-terminated UTF-8 string
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Copy `N` bytes out of a caller buffer
///
/// # Safety
/// `ptr` must be null or valid for `N` bytes of reads.
pub(crate) unsafe fn read_array<const N: usize>(ptr: *const u8) -> Option<[u8; N]> {
    if ptr.is_null() {
        return None;
    }
    let mut out = [0u8; N];
    ptr::copy_nonoverlapping(ptr, out.as_mut_ptr(), N);
    Some(out)
}

/// Copy `bytes` into a caller buffer
///
/// # Safety
/// `out` must be valid for `bytes.len()` bytes of writes.
pub(crate) unsafe fn write_bytes(out: *mut u8, bytes: &[u8]) {
    ptr::copy_nonoverlapping(bytes.as_ptr(), out, bytes.len());
}

/// Zero a caller buffer
///
/// # Safety
/// `out` must be null or valid for `len` bytes of writes.
pub(crate) unsafe fn zero_bytes(out: *mut u8, len: usize) {
    if !out.is_null() {
        ptr::write_bytes(out, 0, len);
    }
}
