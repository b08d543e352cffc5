//! Proof round-trip, soundness and parameter lifecycle tests

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use illium_lurk::{Tag, TaggedValue, Value};
use illium_zk::{
    ParameterStore, ProgramEvaluator, Proof, ProofEngine, ProofProvider, ProveRequest,
    PublicParams, SetupConfig, ZkError,
};
use proptest::prelude::*;

const PROGRAM: &str = "(lambda (secret target) (if (= (* secret secret) target) :valid :invalid))";

fn config() -> SetupConfig {
    SetupConfig {
        rounds: 128,
        openings: 8,
    }
}

fn engine() -> ProofEngine {
    ProofEngine::new(Arc::new(PublicParams::generate(config())))
}

fn prove(engine: &ProofEngine) -> (Proof, TaggedValue) {
    let request = ProveRequest::new(PROGRAM, "7", "49", 10_000);
    let out = engine.create_proof(&request).unwrap();
    (out.proof, out.output)
}

// ============================================
// Round trip
// ============================================

#[test]
fn test_proof_roundtrip() {
    let engine = engine();
    let (proof, output) = prove(&engine);

    assert_eq!(output, Value::Key("valid".into()).tagged());
    assert_eq!(output.tag_kind(), Some(Tag::Key));
    assert!(engine.verify_proof(PROGRAM, "49", &proof, &output));
}

#[test]
fn test_verification_survives_reformatting() {
    let engine = engine();
    let (proof, output) = prove(&engine);
    let reformatted = "(lambda (secret target)\n  ; square check\n  (if (= (* secret secret) target)\n      :valid\n      :invalid))";
    assert!(engine.verify_proof(reformatted, " 49 ", &proof, &output));
}

#[test]
fn test_private_params_not_in_proof() {
    let engine = engine();
    let request = ProveRequest::new(
        "(lambda (secret pub) (eq (car secret) pub))",
        "(\"hunter2-hunter2\" 1 2)",
        "\"hunter2-hunter2\"",
        10_000,
    );
    let out = engine.create_proof(&request).unwrap();
    let bytes = out.proof.as_bytes();
    assert!(!bytes.windows(7).any(|w| w == b"hunter2"));
}

// ============================================
// Soundness
// ============================================

#[test]
fn test_every_byte_flip_is_rejected() {
    let engine = engine();
    let (proof, output) = prove(&engine);
    let bytes = proof.into_bytes();

    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;
        assert!(
            !engine.verify_proof(PROGRAM, "49", &Proof::from_bytes(tampered), &output),
            "flip at byte {} accepted",
            i
        );
    }
}

#[test]
fn test_wrong_statement_is_rejected() {
    let engine = engine();
    let (proof, output) = prove(&engine);

    let other_program = "(lambda (secret target) (if (= (* secret secret) target) :valid :nope))";
    assert!(!engine.verify_proof(other_program, "49", &proof, &output));
    assert!(!engine.verify_proof(PROGRAM, "50", &proof, &output));
    assert!(!engine.verify_proof(PROGRAM, "", &proof, &output));

    let wrong_output = Value::Key("invalid".into()).tagged();
    assert!(!engine.verify_proof(PROGRAM, "49", &proof, &wrong_output));
}

#[test]
fn test_other_parameter_set_rejects() {
    let (proof, output) = prove(&engine());
    let other = ProofEngine::new(Arc::new(PublicParams::generate(SetupConfig {
        rounds: 129,
        ..config()
    })));
    assert!(!other.verify_proof(PROGRAM, "49", &proof, &output));
}

#[test]
fn test_garbage_never_panics() {
    let engine = engine();
    let output = Value::num(1).tagged();
    for bytes in [vec![], b"ILXP".to_vec(), vec![0xff; 300]] {
        assert!(!engine.verify_proof(PROGRAM, "49", &Proof::from_bytes(bytes), &output));
    }
    let (proof, output) = prove(&engine);
    assert!(!engine.verify_proof("(unclosed", "49", &proof, &output));
}

// ============================================
// Failure modes
// ============================================

#[test]
fn test_zero_steps_is_exhaustion() {
    let request = ProveRequest::new(PROGRAM, "7", "49", 0);
    let err = engine().create_proof(&request).unwrap_err();
    assert!(err.is_exhausted(), "unexpected error: {}", err);
}

#[test]
fn test_eval_failures_are_distinct() {
    let engine = engine();

    let parse = engine
        .create_proof(&ProveRequest::new("(lambda (a b", "", "", 100))
        .unwrap_err();
    assert!(parse.is_parse());

    let runtime = engine
        .create_proof(&ProveRequest::new("(lambda (a b) (+ a b))", "\"x\"", "1", 100))
        .unwrap_err();
    assert!(matches!(runtime, ZkError::Eval(_)));
    assert!(!runtime.is_parse() && !runtime.is_exhausted());
}

#[test]
fn test_engine_requires_loaded_store() {
    let store = ParameterStore::new(config());
    assert!(matches!(
        ProofEngine::from_store(&store),
        Err(ZkError::NotInitialized)
    ));

    store.load().unwrap();
    let engine = ProofEngine::from_store(&store).unwrap();
    let (proof, output) = prove(&engine);
    assert!(engine.verify_proof(PROGRAM, "49", &proof, &output));
}

#[test]
fn test_dry_run_matches_proof_output() {
    let engine = engine();
    let request = ProveRequest::new(PROGRAM, "7", "49", 10_000);
    let dry = engine.evaluate(&request, true).unwrap();
    let proved = engine.create_proof(&request).unwrap();
    assert_eq!(dry.tagged, proved.output);
    assert_eq!(dry.iterations, proved.iterations);
}

#[test]
fn test_proving_cost_follows_steps_for_shared_closures() {
    let mut bindings = String::from("(f0 (lambda (x) x))");
    for i in 1..64 {
        bindings.push_str(&format!(" (f{} (lambda (x) (f{} x)))", i, i - 1));
    }
    let program = format!("(lambda (p q) (let ({}) (f63 q)))", bindings);

    let engine = engine();
    let start = Instant::now();
    let out = engine
        .create_proof(&ProveRequest::new(program.as_str(), "", "5", 10_000))
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
    assert_eq!(out.output, Value::num(5).tagged());
    assert!(engine.verify_proof(&program, "5", &out.proof, &out.output));
}

// ============================================
// Parameter store
// ============================================

#[test]
fn test_concurrent_first_load_runs_setup_once() {
    const THREADS: usize = 16;
    let store = Arc::new(ParameterStore::new(SetupConfig {
        rounds: 50_000,
        openings: 8,
    }));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.load().unwrap()
            })
        })
        .collect();

    let loaded: Vec<Arc<PublicParams>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(store.setup_runs(), 1);
    assert!(loaded.iter().all(|p| Arc::ptr_eq(p, &loaded[0])));
}

#[test]
fn test_global_store_is_shared() {
    let a = ParameterStore::global();
    let b = ParameterStore::global();
    assert!(std::ptr::eq(a, b));
    assert!(ParameterStore::install_global(ParameterStore::new(config())).is_err());
}

// ============================================
// Properties
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn proofs_roundtrip_for_arithmetic(a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let engine = engine();
        let request = ProveRequest::new("(lambda (a b) (+ (* a a) b))", a.to_string(), b.to_string(), 1_000);
        let out = engine.create_proof(&request).unwrap();
        prop_assert!(out.iterations <= 1_000);
        prop_assert_eq!(out.output, Value::num(a * a + b).tagged());
        prop_assert!(engine.verify_proof(&request.program, &request.public_params, &out.proof, &out.output));
    }
}
