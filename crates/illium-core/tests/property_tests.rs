//! Property-based tests for illium-core using proptest
//!
//! These tests verify invariants that should hold for all valid inputs.

use illium_core::{
    keys::{compressed_to_full, is_on_curve, private_to_public, secret_key_from_seed},
    signing::{sign, verify},
    MessageHash, Signature,
};
use proptest::prelude::*;

// ============================================
// Strategies
// ============================================

fn arb_seed() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

fn arb_digest() -> impl Strategy<Value = MessageHash> {
    any::<[u8; 32]>().prop_map(MessageHash::new)
}

// ============================================
// Key engine
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn seed_derivation_is_deterministic(seed in arb_seed()) {
        let a = secret_key_from_seed(&seed).unwrap();
        let b = secret_key_from_seed(&seed).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn decompressed_point_is_on_curve(seed in arb_seed()) {
        let sk = secret_key_from_seed(&seed).unwrap();
        let pk = private_to_public(&sk).unwrap();
        let full = compressed_to_full(&pk).unwrap();
        prop_assert!(is_on_curve(&full));
        prop_assert_eq!(&pk.as_bytes()[1..], &full.x[..]);
    }

    #[test]
    fn seeds_of_wrong_length_are_rejected(len in 0usize..64) {
        prop_assume!(len != 32);
        let seed = vec![1u8; len];
        prop_assert!(secret_key_from_seed(&seed).is_err());
    }
}

// ============================================
// Signature engine
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn signatures_verify_under_signer_key(seed in arb_seed(), digest in arb_digest()) {
        let sk = secret_key_from_seed(&seed).unwrap();
        let pk = private_to_public(&sk).unwrap();
        let sig = sign(&sk, &digest).unwrap();
        prop_assert!(verify(&pk, &digest, &sig));
    }

    #[test]
    fn signatures_fail_under_other_key(
        seed1 in arb_seed(),
        seed2 in arb_seed(),
        digest in arb_digest(),
    ) {
        prop_assume!(seed1 != seed2);
        let k1 = secret_key_from_seed(&seed1).unwrap();
        let k2 = secret_key_from_seed(&seed2).unwrap();
        let sig = sign(&k2, &digest).unwrap();
        prop_assert!(!verify(&private_to_public(&k1).unwrap(), &digest, &sig));
    }

    #[test]
    fn verify_never_panics_on_garbage(
        seed in arb_seed(),
        digest in arb_digest(),
        r in any::<[u8; 32]>(),
        s in any::<[u8; 32]>(),
    ) {
        let pk = private_to_public(&secret_key_from_seed(&seed).unwrap()).unwrap();
        // Random scalars verify only with negligible probability
        prop_assert!(!verify(&pk, &digest, &Signature::new(r, s)));
    }
}
