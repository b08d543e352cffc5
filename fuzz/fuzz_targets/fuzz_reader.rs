#![no_main]

use illium_lurk::{commit, read};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(src) = std::str::from_utf8(data) {
        // Try to parse - should not panic
        if let Ok(value) = read(src) {
            // Commitments hash the parsed data, so they agree with the tagged form
            let digest = commit(src).expect("parsed source commits");
            assert_eq!(digest, commit(src).expect("parsed source commits"));
            let _ = value.tagged();
        }
    }
});
