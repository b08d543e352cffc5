//! Commitment, evaluation and proof exports

use std::ffi::{c_char, c_int};

use illium_lurk::{TaggedValue, TAG_SIZE, VALUE_SIZE};
use illium_zk::{
    LurkEvaluator, ParameterStore, ProgramEvaluator, ProofEngine, ProofProvider, ProveRequest,
    MAX_PROOF_SIZE,
};
use tracing::{debug, error};

use crate::{
    eval_status, guard, read_array, read_str, write_bytes, zk_status, ILLIUM_ERR_BUFFER_TOO_SMALL,
    ILLIUM_ERR_EVAL, ILLIUM_ERR_INVALID_INPUT, ILLIUM_ERR_PARSE, ILLIUM_ERR_PROOF, ILLIUM_OK,
};

const EVALUATOR: LurkEvaluator = LurkEvaluator;

fn engine() -> Result<ProofEngine, c_int> {
    ProofEngine::from_store(ParameterStore::global()).map_err(|e| zk_status(&e))
}

unsafe fn write_tagged(output_tag: *mut u8, output_val: *mut u8, tagged: &TaggedValue) {
    write_bytes(output_tag, &tagged.tag);
    write_bytes(output_val, &tagged.value);
}

/// Commit to an expression, writing the 32-byte commitment to `out`
///
/// # Safety
/// `expr` must be null or a NUL-terminated string; `out` must be null or
/// valid for 32 bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn lurk_commit(expr: *const c_char, out: *mut u8) -> c_int {
    guard("lurk_commit", ILLIUM_ERR_PARSE, || {
        let Some(expr) = read_str(expr) else {
            return ILLIUM_ERR_INVALID_INPUT;
        };
        if out.is_null() {
            return ILLIUM_ERR_INVALID_INPUT;
        }
        match illium_lurk::commit(expr) {
            Ok(digest) => {
                write_bytes(out, &digest);
                ILLIUM_OK
            }
            Err(e) => {
                debug!(error = %e, "commit failed");
                eval_status(&e)
            }
        }
    })
}

/// Load the process-wide public parameters; later calls return immediately
#[no_mangle]
pub extern "C" fn load_public_params() {
    guard("load_public_params", (), || {
        if let Err(e) = ParameterStore::global().load() {
            error!(error = %e, "failed to load public parameters");
        }
    })
}

/// Evaluate and prove `(program private public)`
///
/// On entry `*proof_len` is the capacity of `proof`; on success it is the
/// number of bytes written. When the capacity is too small the required size
/// is stored in `*proof_len` and nothing else is written.
///
/// # Safety
/// String arguments must be null or NUL-terminated. `proof` must be valid for
/// `*proof_len` bytes of writes; `output_tag` and `output_val` must be valid
/// for 32 bytes of writes each.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn create_proof_ffi(
    lurk_program: *const c_char,
    private_params: *const c_char,
    public_params: *const c_char,
    max_steps: usize,
    proof: *mut u8,
    proof_len: *mut usize,
    output_tag: *mut u8,
    output_val: *mut u8,
) -> c_int {
    guard("create_proof_ffi", ILLIUM_ERR_PROOF, || {
        let (Some(program), Some(private), Some(public)) = (
            read_str(lurk_program),
            read_str(private_params),
            read_str(public_params),
        ) else {
            return ILLIUM_ERR_INVALID_INPUT;
        };
        if proof.is_null() || proof_len.is_null() || output_tag.is_null() || output_val.is_null() {
            return ILLIUM_ERR_INVALID_INPUT;
        }

        let engine = match engine() {
            Ok(engine) => engine,
            Err(status) => return status,
        };
        let request = ProveRequest::new(program, private, public, max_steps);
        let out = match engine.create_proof(&request) {
            Ok(out) => out,
            Err(e) => {
                debug!(error = %e, "create_proof_ffi failed");
                return zk_status(&e);
            }
        };

        let capacity = *proof_len;
        *proof_len = out.proof.len();
        if out.proof.len() > capacity {
            return ILLIUM_ERR_BUFFER_TOO_SMALL;
        }
        write_bytes(proof, out.proof.as_bytes());
        write_tagged(output_tag, output_val, &out.output);
        ILLIUM_OK
    })
}

/// Verify a proof against program, public params and expected output
///
/// Returns 1 for a valid proof and 0 for an invalid or malformed one,
/// including any proof longer than `ILLIUM_MAX_PROOF_SIZE`.
/// Returns `-ILLIUM_ERR_NOT_INITIALIZED` before parameters are loaded and
/// `-ILLIUM_ERR_INVALID_INPUT` for null or non-UTF-8 arguments.
///
/// # Safety
/// String arguments must be null or NUL-terminated. `packed_proof` must be
/// valid for `proof_size` bytes of reads; `expected_tag` and
/// `expected_output` must be null or valid for 32 bytes of reads each.
#[no_mangle]
pub unsafe extern "C" fn verify_proof_ffi(
    lurk_program: *const c_char,
    public_params: *const c_char,
    packed_proof: *const u8,
    proof_size: usize,
    expected_tag: *const u8,
    expected_output: *const u8,
) -> c_int {
    guard("verify_proof_ffi", 0, || {
        let (Some(program), Some(public)) = (read_str(lurk_program), read_str(public_params)) else {
            return -ILLIUM_ERR_INVALID_INPUT;
        };
        let (Some(tag), Some(value)) = (
            read_array::<TAG_SIZE>(expected_tag),
            read_array::<VALUE_SIZE>(expected_output),
        ) else {
            return -ILLIUM_ERR_INVALID_INPUT;
        };
        if packed_proof.is_null() {
            return -ILLIUM_ERR_INVALID_INPUT;
        }

        let engine = match engine() {
            Ok(engine) => engine,
            Err(status) => return -status,
        };
        if proof_size > MAX_PROOF_SIZE {
            debug!(proof_size, "proof rejected: larger than MAX_PROOF_SIZE");
            return 0;
        }
        let bytes = std::slice::from_raw_parts(packed_proof, proof_size);
        let expected = TaggedValue::new(tag, value);
        c_int::from(engine.verify_proof_bytes(program, public, bytes, &expected))
    })
}

/// Evaluate `(program private public)` without proving
///
/// Does not need the public parameters. With `debug` set, every step is
/// reported through `tracing` on target `illium_lurk::trace`.
///
/// # Safety
/// String arguments must be null or NUL-terminated. `output_tag` and
/// `output_val` must be valid for 32 bytes of writes each; `iterations` must
/// be valid for one `usize` write.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn eval_ffi(
    lurk_program: *const c_char,
    private_params: *const c_char,
    public_params: *const c_char,
    max_steps: usize,
    output_tag: *mut u8,
    output_val: *mut u8,
    iterations: *mut usize,
    debug: bool,
) -> c_int {
    guard("eval_ffi", ILLIUM_ERR_EVAL, || {
        let (Some(program), Some(private), Some(public)) = (
            read_str(lurk_program),
            read_str(private_params),
            read_str(public_params),
        ) else {
            return ILLIUM_ERR_INVALID_INPUT;
        };
        if output_tag.is_null() || output_val.is_null() || iterations.is_null() {
            return ILLIUM_ERR_INVALID_INPUT;
        }

        let request = ProveRequest::new(program, private, public, max_steps);
        match EVALUATOR.evaluate(&request, debug) {
            Ok(out) => {
                write_tagged(output_tag, output_val, &out.tagged);
                *iterations = out.iterations;
                ILLIUM_OK
            }
            Err(e) => {
                debug!(error = %e, "eval_ffi failed");
                zk_status(&e)
            }
        }
    })
}
