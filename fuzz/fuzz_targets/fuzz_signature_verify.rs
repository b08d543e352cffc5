#![no_main]

use illium_core::{CryptoProvider, MessageHash, PublicKey, Secp256k1Provider, Signature};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 33-byte key, 32-byte digest, 64-byte signature
    if data.len() >= 129 {
        let provider = Secp256k1Provider;
        let Ok(public) = PublicKey::from_slice(&data[..33]) else {
            return;
        };
        let Ok(digest) = MessageHash::from_slice(&data[33..65]) else {
            return;
        };
        let Ok(signature) = Signature::from_slice(&data[65..129]) else {
            return;
        };

        // Should not panic
        let _ = provider.verify(&public, &digest, &signature);
        let _ = provider.compressed_to_full(&public);
    }
});
