//! Evaluator integration tests

use illium_lurk::{commit, eval, EvalConfig, EvalError, Evaluator, Tag, TaggedValue, Value};
use proptest::prelude::*;
use std::time::{Duration, Instant};

const STEPS: usize = 1_000_000;

fn run(src: &str) -> Value {
    Evaluator::new(EvalConfig::new(STEPS))
        .eval_source(src)
        .unwrap()
        .value
}

// ============================================
// Programs
// ============================================

#[test]
fn test_fibonacci() {
    let src = "(letrec ((fib (lambda (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))))
                 (fib 15))";
    assert_eq!(run(src), Value::num(610));
}

#[test]
fn test_list_processing() {
    let src = "(letrec ((map (lambda (f xs) (if xs (cons (f (car xs)) (map f (cdr xs))) nil))))
                 (map (lambda (x) (* x x)) '(1 2 3 4)))";
    assert_eq!(run(src).to_string(), "(1 4 9 16)");
}

#[test]
fn test_string_walk() {
    let src = r#"(letrec ((len (lambda (s) (if (eq s "") 0 (+ 1 (len (cdr s)))))))
                   (len "hello"))"#;
    assert_eq!(run(src), Value::num(5));
}

#[test]
fn test_deep_recursion_stays_on_heap() {
    let src = "(letrec ((count (lambda (n) (if (= n 0) 0 (+ 1 (count (- n 1)))))))
                 (count 5000))";
    let out = Evaluator::new(EvalConfig::new(1_000_000))
        .eval_source(src)
        .unwrap();
    assert_eq!(out.value, Value::num(5000));
}

// ============================================
// Program inputs
// ============================================

#[test]
fn test_private_and_public_inputs() {
    let program = "(lambda (secret expected) (if (= (* secret secret) expected) :ok :bad))";
    let out = eval(program, "12", "144", STEPS, false).unwrap();
    assert_eq!(out.tagged.tag_kind(), Some(Tag::Key));
    assert_eq!(out.value.to_string(), ":ok");

    let wrong = eval(program, "11", "144", STEPS, false).unwrap();
    assert_ne!(wrong.tagged, out.tagged);
}

#[test]
fn test_debug_does_not_change_result() {
    let program = "(lambda (a b) (cons a b))";
    let quiet = eval(program, "(1 2)", "\"x\"", STEPS, false).unwrap();
    let loud = eval(program, "(1 2)", "\"x\"", STEPS, true).unwrap();
    assert_eq!(quiet.tagged, loud.tagged);
    assert_eq!(quiet.iterations, loud.iterations);
}

#[test]
fn test_error_kinds_are_distinct() {
    assert!(eval("(lambda (a b", "", "", STEPS, false).unwrap_err().is_parse());
    assert_eq!(
        eval("(lambda (a b) c)", "", "", STEPS, false).unwrap_err(),
        EvalError::UnboundVariable("c".into())
    );
    assert!(eval("(lambda (a b) a)", "", "", 0, false)
        .unwrap_err()
        .is_exhausted());
    assert!(eval("(lambda (a b) a)", "(", "", STEPS, false)
        .unwrap_err()
        .is_parse());
}

// ============================================
// Commitments
// ============================================

#[test]
fn test_in_language_commit_matches_host_commit() {
    let host = commit("(1 2 3)").unwrap();
    let out = Evaluator::new(EvalConfig::new(STEPS))
        .eval_source("(commit '(1 2 3))")
        .unwrap();
    assert_eq!(out.value, Value::Comm(host));
    assert_eq!(out.tagged.tag_kind(), Some(Tag::Comm));
    assert_eq!(out.tagged.value, host);
}

#[test]
fn test_openings_persist_across_runs() {
    let mut ev = Evaluator::new(EvalConfig::new(STEPS));
    let comm = ev.eval_source("(hide 42 \"sealed\")").unwrap().value;
    let Value::Comm(digest) = comm else {
        panic!("expected commitment");
    };
    let src = format!("(open (comm 0x{}))", hex::encode(digest));
    assert_eq!(ev.eval_source(&src).unwrap().value, Value::str("sealed"));

    let fresh = Evaluator::new(EvalConfig::new(STEPS)).eval_source(&src);
    assert!(matches!(fresh, Err(EvalError::UnknownCommitment(_))));
}

#[test]
fn test_tagged_value_json() {
    let out = Evaluator::new(EvalConfig::new(STEPS))
        .eval_source("7u64")
        .unwrap();
    let json = serde_json::to_string(&out.tagged).unwrap();
    let back: TaggedValue = serde_json::from_str(&json).unwrap();
    assert_eq!(back, out.tagged);
    assert_eq!(back.tag_kind(), Some(Tag::U64));
}

// ============================================
// Large values from few steps
// ============================================

/// `(let ((f0 (lambda (x) x)) (f1 (lambda (x) (f0 x))) ...) fN)`
fn closure_chain_program(n: usize) -> String {
    let mut bindings = String::from("(f0 (lambda (x) x))");
    for i in 1..n {
        bindings.push_str(&format!(" (f{} (lambda (x) (f{} x)))", i, i - 1));
    }
    format!("(lambda (p q) (let ({}) f{}))", bindings, n - 1)
}

/// `(let ((a0 nil) (a1 (cons a0 a0)) ...) aN)`
fn shared_cons_program(n: usize) -> String {
    let mut bindings = String::from("(a0 nil)");
    for i in 1..=n {
        bindings.push_str(&format!(" (a{} (cons a{} a{}))", i, i - 1, i - 1));
    }
    format!("(lambda (p q) (let ({}) a{}))", bindings, n)
}

fn assert_fast(what: &str, start: Instant) {
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "{} took {:?}",
        what,
        start.elapsed()
    );
}

#[test]
fn test_closure_chain_cost_follows_steps() {
    let start = Instant::now();
    let out = eval(&closure_chain_program(64), "", "", 10_000, false).unwrap();
    assert_fast("64-closure let", start);
    assert_eq!(out.tagged.tag_kind(), Some(Tag::Fun));
    assert!(out.iterations < 10_000);
}

#[test]
fn test_shared_cons_cost_follows_steps() {
    let start = Instant::now();
    let out = eval(&shared_cons_program(64), "", "", 10_000, false).unwrap();
    let again = eval(&shared_cons_program(64), "", "", 10_000, false).unwrap();
    assert_fast("64-level shared cons", start);
    assert_eq!(out.tagged.tag_kind(), Some(Tag::Cons));
    assert_eq!(out.tagged, again.tagged);
    assert_eq!(out.value, again.value);
}

#[test]
fn test_deep_car_nesting_does_not_overflow() {
    let program = "(lambda (p q)
                     (letrec ((f (lambda (n acc) (if (= n 0) acc (f (- n 1) (cons acc nil))))))
                       (f 100000 nil)))";
    let out = eval(program, "", "", 10_000_000, false).unwrap();
    assert_eq!(out.tagged.tag_kind(), Some(Tag::Cons));

    let printed = out.value.to_string();
    assert_eq!(printed.matches('(').count(), 100_000);

    // Equality digests both sides
    let again = eval(program, "", "", 10_000_000, false).unwrap();
    assert_eq!(out.value, again.value);
}

#[test]
fn test_deep_nesting_through_eq_builtin() {
    let program = "(lambda (p q)
                     (letrec ((f (lambda (n acc) (if (= n 0) acc (f (- n 1) (cons acc nil))))))
                       (eq (f 50000 nil) (f 50000 nil))))";
    let out = eval(program, "", "", 10_000_000, false).unwrap();
    assert_eq!(out.value, Value::t());
}

// ============================================
// Step bound
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn iterations_never_exceed_bound(n in 0u64..40, max_steps in 0usize..400) {
        let program = "(lambda (n unused)
                         (letrec ((sum (lambda (k) (if (= k 0) 0 (+ k (sum (- k 1)))))))
                           (sum n)))";
        match eval(program, &n.to_string(), "", max_steps, false) {
            Ok(out) => {
                prop_assert!(out.iterations <= max_steps);
                prop_assert_eq!(out.value, Value::num(n * (n + 1) / 2));
            }
            Err(err) => prop_assert!(err.is_exhausted()),
        }
    }

    #[test]
    fn u64_addition_wraps(a in any::<u64>(), b in any::<u64>()) {
        let src = format!("(+ {}u64 {}u64)", a, b);
        prop_assert_eq!(run(&src), Value::U64(a.wrapping_add(b)));
    }
}
