#![no_main]

use illium_lurk::{EvalConfig, Evaluator};
use libfuzzer_sys::fuzz_target;

const MAX_STEPS: usize = 10_000;

fuzz_target!(|data: &[u8]| {
    if let Ok(src) = std::str::from_utf8(data) {
        // Any program terminates within the bound, with a value or an error
        let mut evaluator = Evaluator::new(EvalConfig::new(MAX_STEPS));
        if let Ok(out) = evaluator.eval_source(src) {
            assert!(out.iterations <= MAX_STEPS);
        }
    }
});
