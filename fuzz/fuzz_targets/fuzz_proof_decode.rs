#![no_main]

use illium_zk::{TranscriptProof, MAX_PROOF_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try to decode - should not panic
    if let Ok(proof) = TranscriptProof::decode(data) {
        assert!(data.len() <= MAX_PROOF_SIZE);

        // Decoding is strict, so re-encoding gives back the input
        let reencoded = proof.encode().expect("decoded proof re-encodes");
        assert_eq!(reencoded.as_bytes(), data);
    }
});
