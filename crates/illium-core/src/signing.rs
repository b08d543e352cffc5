//! Signature engine: ECDSA over caller-supplied digests
//!
//! The digest is signed as-is (prehash API); callers hash their messages
//! beforehand. Nonces follow RFC 6979, so signing is deterministic, and
//! signatures are normalised to low-S.

use k256::{
    ecdsa::{
        signature::hazmat::{PrehashSigner, PrehashVerifier},
        Signature as K256Signature, SigningKey, VerifyingKey,
    },
    FieldBytes,
};
use tracing::debug;

use crate::error::{CryptoError, Result};
use crate::keys::{decode_public_key, validate_secret_key};
use crate::types::{MessageHash, PublicKey, SecretKey, Signature, SCALAR_SIZE};

/// Sign a 32-byte digest with a secret key
pub fn sign(secret_key: &SecretKey, digest: &MessageHash) -> Result<Signature> {
    let signing_key = SigningKey::from(validate_secret_key(secret_key)?);

    let sig: K256Signature = signing_key
        .sign_prehash(digest.as_bytes())
        .map_err(|e| CryptoError::Crypto(e.to_string()))?;
    let sig = sig.normalize_s().unwrap_or(sig);

    let bytes = sig.to_bytes();
    let mut r = [0u8; SCALAR_SIZE];
    let mut s = [0u8; SCALAR_SIZE];
    r.copy_from_slice(&bytes[..SCALAR_SIZE]);
    s.copy_from_slice(&bytes[SCALAR_SIZE..]);

    Ok(Signature::new(r, s))
}

/// Verify a signature over a digest
///
/// Returns `false` for any failure: malformed key, out-of-range or zero
/// scalars, or a signature that does not match. The cause is not reported.
pub fn verify(public_key: &PublicKey, digest: &MessageHash, signature: &Signature) -> bool {
    match verify_inner(public_key, digest, signature) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "signature rejected");
            false
        }
    }
}

fn verify_inner(public_key: &PublicKey, digest: &MessageHash, signature: &Signature) -> Result<()> {
    let verifying_key = VerifyingKey::from(decode_public_key(public_key)?);

    let sig = K256Signature::from_scalars(
        FieldBytes::from(signature.r),
        FieldBytes::from(signature.s),
    )
    .map_err(|_| CryptoError::InvalidSignature)?;

    verifying_key
        .verify_prehash(digest.as_bytes(), &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{private_to_public, secret_key_from_seed};

    fn keypair(seed: u8) -> (SecretKey, PublicKey) {
        let sk = secret_key_from_seed(&[seed; 32]).unwrap();
        let pk = private_to_public(&sk).unwrap();
        (sk, pk)
    }

    #[test]
    fn test_sign_verify() {
        let (sk, pk) = keypair(1);
        let digest = MessageHash::new([0x42; 32]);
        let sig = sign(&sk, &digest).unwrap();
        assert!(verify(&pk, &digest, &sig));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let (sk, _) = keypair(2);
        let digest = MessageHash::new([0x10; 32]);
        assert_eq!(sign(&sk, &digest).unwrap(), sign(&sk, &digest).unwrap());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (sk, _) = keypair(3);
        let (_, other_pk) = keypair(4);
        let digest = MessageHash::new([0x99; 32]);
        let sig = sign(&sk, &digest).unwrap();
        assert!(!verify(&other_pk, &digest, &sig));
    }

    #[test]
    fn test_wrong_digest_rejected() {
        let (sk, pk) = keypair(5);
        let sig = sign(&sk, &MessageHash::new([1; 32])).unwrap();
        assert!(!verify(&pk, &MessageHash::new([2; 32]), &sig));
    }

    #[test]
    fn test_malformed_signatures_rejected() {
        let (sk, pk) = keypair(6);
        let digest = MessageHash::new([7; 32]);
        let sig = sign(&sk, &digest).unwrap();

        let zero_r = Signature::new([0u8; 32], sig.s);
        assert!(!verify(&pk, &digest, &zero_r));

        let zero_s = Signature::new(sig.r, [0u8; 32]);
        assert!(!verify(&pk, &digest, &zero_s));

        let out_of_range = Signature::new([0xFF; 32], sig.s);
        assert!(!verify(&pk, &digest, &out_of_range));
    }

    #[test]
    fn test_malformed_public_key_rejected() {
        let (sk, _) = keypair(8);
        let digest = MessageHash::new([3; 32]);
        let sig = sign(&sk, &digest).unwrap();
        assert!(!verify(&PublicKey::new([0u8; 33]), &digest, &sig));
    }

    #[test]
    fn test_signature_is_low_s() {
        let (sk, _) = keypair(9);
        for i in 0..16u8 {
            let sig = sign(&sk, &MessageHash::new([i; 32])).unwrap();
            // low-S means s <= n/2, whose top byte is at most 0x7F
            assert!(sig.s[0] <= 0x7F);
        }
    }
}
