//! Key and signature exports
//!
//! The `void` functions write all-zero output when the input is invalid or
//! entropy is unavailable.

use illium_core::{
    CryptoProvider, MessageHash, PublicKey, Secp256k1Provider, SecretKey, Signature,
    COMPRESSED_PUBLIC_KEY_SIZE, COORDINATE_SIZE, DIGEST_SIZE, SCALAR_SIZE, SECRET_KEY_SIZE,
    SEED_SIZE,
};
use tracing::debug;
use zeroize::Zeroize;

use crate::{guard, read_array, write_bytes, zero_bytes};

const PROVIDER: Secp256k1Provider = Secp256k1Provider;

/// Write a secret key, or zeros on failure
unsafe fn emit_secret(out: *mut u8, key: illium_core::Result<SecretKey>) {
    if out.is_null() {
        return;
    }
    match key {
        Ok(key) => write_bytes(out, key.as_bytes()),
        Err(e) => {
            debug!(error = %e, "secret key operation failed");
            zero_bytes(out, SECRET_KEY_SIZE);
        }
    }
}

/// Generate a random secret key into `out` (32 bytes)
///
/// # Safety
/// `out` must be null or valid for 32 bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn generate_secret_key(out: *mut u8) {
    guard("generate_secret_key", (), || {
        emit_secret(out, PROVIDER.generate_secret_key())
    })
}

/// Derive the secret key for a 32-byte wallet seed into `out` (32 bytes)
///
/// # Safety
/// `seed` must be null or valid for 32 bytes of reads; `out` must be null or
/// valid for 32 bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn secret_key_from_seed(seed: *const u8, out: *mut u8) {
    guard("secret_key_from_seed", (), || emit_secret(out, seed_key(seed)))
}

unsafe fn seed_key(seed: *const u8) -> illium_core::Result<SecretKey> {
    let mut seed = read_array::<SEED_SIZE>(seed).ok_or(illium_core::CryptoError::InvalidLength {
        what: "seed",
        expected: SEED_SIZE,
        actual: 0,
    })?;
    let key = PROVIDER.secret_key_from_seed(&seed);
    seed.zeroize();
    key
}

/// Compressed public key (33 bytes) for the secret key at `bytes` (32 bytes)
///
/// # Safety
/// `bytes` must be null or valid for 32 bytes of reads; `out` must be null or
/// valid for 33 bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn priv_to_pub(bytes: *const u8, out: *mut u8) {
    guard("priv_to_pub", (), || {
        if out.is_null() {
            return;
        }
        let public = read_array::<SECRET_KEY_SIZE>(bytes).and_then(|raw| {
            let secret = SecretKey::from_bytes(raw);
            PROVIDER.private_to_public(&secret).ok()
        });
        match public {
            Some(pk) => write_bytes(out, pk.as_bytes()),
            None => zero_bytes(out, COMPRESSED_PUBLIC_KEY_SIZE),
        }
    })
}

/// Decompress the 33-byte public key at `bytes` into `out_x` and `out_y`
///
/// # Safety
/// `bytes` must be null or valid for 33 bytes of reads; `out_x` and `out_y`
/// must be null or valid for 32 bytes of writes each.
#[no_mangle]
pub unsafe extern "C" fn compressed_to_full(bytes: *const u8, out_x: *mut u8, out_y: *mut u8) {
    guard("compressed_to_full", (), || {
        if out_x.is_null() || out_y.is_null() {
            return;
        }
        let full = read_array::<COMPRESSED_PUBLIC_KEY_SIZE>(bytes)
            .and_then(|raw| PROVIDER.compressed_to_full(&PublicKey::new(raw)).ok());
        match full {
            Some(full) => {
                write_bytes(out_x, &full.x);
                write_bytes(out_y, &full.y);
            }
            None => {
                zero_bytes(out_x, COORDINATE_SIZE);
                zero_bytes(out_y, COORDINATE_SIZE);
            }
        }
    })
}

/// Sign the 32-byte digest with the 32-byte secret key, writing `r || s` (64 bytes)
///
/// # Safety
/// `privkey` and `message_digest` must be null or valid for 32 bytes of
/// reads; `out` must be null or valid for 64 bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn sign(privkey: *const u8, message_digest: *const u8, out: *mut u8) {
    guard("sign", (), || {
        if out.is_null() {
            return;
        }
        let signature = match (
            read_array::<SECRET_KEY_SIZE>(privkey),
            read_array::<DIGEST_SIZE>(message_digest),
        ) {
            (Some(raw), Some(digest)) => {
                let secret = SecretKey::from_bytes(raw);
                PROVIDER.sign(&secret, &MessageHash::new(digest)).ok()
            }
            _ => None,
        };
        match signature {
            Some(sig) => write_bytes(out, &sig.to_bytes()),
            None => zero_bytes(out, 2 * SCALAR_SIZE),
        }
    })
}

/// Verify signature `(sig_r, sig_s)` over the digest against the compressed public key
///
/// Returns false for malformed keys, out-of-range scalars and null pointers.
///
/// # Safety
/// `pub_bytes` must be null or valid for 33 bytes of reads; `digest_bytes`,
/// `sig_r` and `sig_s` must be null or valid for 32 bytes of reads each.
#[no_mangle]
pub unsafe extern "C" fn verify(
    pub_bytes: *const u8,
    digest_bytes: *const u8,
    sig_r: *const u8,
    sig_s: *const u8,
) -> bool {
    guard("verify", false, || {
        match (
            read_array::<COMPRESSED_PUBLIC_KEY_SIZE>(pub_bytes),
            read_array::<DIGEST_SIZE>(digest_bytes),
            read_array::<SCALAR_SIZE>(sig_r),
            read_array::<SCALAR_SIZE>(sig_s),
        ) {
            (Some(pk), Some(digest), Some(r), Some(s)) => PROVIDER.verify(
                &PublicKey::new(pk),
                &MessageHash::new(digest),
                &Signature::new(r, s),
            ),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_seed_to_signature() {
        let seed = [7u8; 32];
        let mut sk = [0u8; 32];
        let mut pk = [0u8; 33];
        let mut sig = [0u8; 64];
        let digest = [9u8; 32];

        unsafe {
            secret_key_from_seed(seed.as_ptr(), sk.as_mut_ptr());
            priv_to_pub(sk.as_ptr(), pk.as_mut_ptr());
            sign(sk.as_ptr(), digest.as_ptr(), sig.as_mut_ptr());
            assert!(verify(pk.as_ptr(), digest.as_ptr(), sig.as_ptr(), sig[32..].as_ptr()));
        }
        assert_ne!(sk, [0u8; 32]);
        assert!(pk[0] == 0x02 || pk[0] == 0x03);
    }

    #[test]
    fn test_invalid_key_writes_zeros() {
        let zero = [0u8; 32];
        let mut pk = [0xAAu8; 33];
        let mut sig = [0xAAu8; 64];
        unsafe {
            priv_to_pub(zero.as_ptr(), pk.as_mut_ptr());
            sign(zero.as_ptr(), zero.as_ptr(), sig.as_mut_ptr());
        }
        assert_eq!(pk, [0u8; 33]);
        assert_eq!(sig, [0u8; 64]);
    }

    #[test]
    fn test_null_pointers() {
        let mut out = [0xAAu8; 32];
        unsafe {
            secret_key_from_seed(ptr::null(), out.as_mut_ptr());
            generate_secret_key(ptr::null_mut());
            assert!(!verify(ptr::null(), ptr::null(), ptr::null(), ptr::null()));
        }
        assert_eq!(out, [0u8; 32]);
    }

    #[test]
    fn test_null_seed_reports_length() {
        let err = unsafe { seed_key(ptr::null()) }.unwrap_err();
        assert_eq!(
            err,
            illium_core::CryptoError::InvalidLength {
                what: "seed",
                expected: SEED_SIZE,
                actual: 0,
            }
        );

        let seed = [7u8; SEED_SIZE];
        let key = unsafe { seed_key(seed.as_ptr()) }.unwrap();
        assert_eq!(key.as_bytes(), PROVIDER.secret_key_from_seed(&seed).unwrap().as_bytes());
    }
}
