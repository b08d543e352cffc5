//! Key engine: secret key generation, seed derivation and public key conversion
//!
//! All keys live on secp256k1. Secret keys are big-endian scalars, public keys
//! are SEC1 points, either compressed (33 bytes) or as `(x, y)` coordinates.

use k256::{
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    EncodedPoint, FieldBytes,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};
use crate::types::{
    to_array, FullPublicKey, PublicKey, SecretKey, COMPRESSED_PUBLIC_KEY_SIZE, COORDINATE_SIZE,
    SEED_SIZE,
};

/// Domain separator for seed-based key derivation
const SEED_DOMAIN: &[u8] = b"illium/secret-key";

/// Attempts before giving up on finding a valid scalar. Each attempt fails
/// with probability below 2^-127, so this is never reached in practice.
const MAX_DERIVATION_ATTEMPTS: u32 = 256;

/// Generate a fresh random secret key from the operating system RNG
///
/// Entropy failure is reported as an error and is not retried.
pub fn generate_secret_key() -> Result<SecretKey> {
    let mut bytes = [0u8; 32];
    for _ in 0..MAX_DERIVATION_ATTEMPTS {
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Entropy(e.to_string()))?;

        if k256::SecretKey::from_bytes(&FieldBytes::from(bytes)).is_ok() {
            let key = SecretKey::from_bytes(bytes);
            bytes.zeroize();
            return Ok(key);
        }
    }
    bytes.zeroize();
    Err(CryptoError::Crypto("failed to sample a valid scalar".into()))
}

/// Deterministically derive a secret key from a 32-byte wallet seed
///
/// The same seed always yields the same key, which is what wallet recovery
/// relies on.
pub fn secret_key_from_seed(seed: &[u8]) -> Result<SecretKey> {
    let seed: [u8; SEED_SIZE] = to_array("seed", seed)?;

    for counter in 0..MAX_DERIVATION_ATTEMPTS {
        let mut hasher = Sha256::new();
        hasher.update(SEED_DOMAIN);
        hasher.update(counter.to_be_bytes());
        hasher.update(seed);
        let mut candidate: [u8; 32] = hasher.finalize().into();

        if k256::SecretKey::from_bytes(&FieldBytes::from(candidate)).is_ok() {
            debug!(counter, "derived secret key from seed");
            let key = SecretKey::from_bytes(candidate);
            candidate.zeroize();
            return Ok(key);
        }
        candidate.zeroize();
    }

    Err(CryptoError::Crypto("seed did not yield a valid scalar".into()))
}

/// Check that a secret key is a non-zero scalar below the curve order
pub fn validate_secret_key(secret_key: &SecretKey) -> Result<k256::SecretKey> {
    k256::SecretKey::from_bytes(&FieldBytes::from(*secret_key.as_bytes()))
        .map_err(|_| CryptoError::InvalidSecretKey)
}

/// Compute the compressed public key `[sk]G`
pub fn private_to_public(secret_key: &SecretKey) -> Result<PublicKey> {
    let sk = validate_secret_key(secret_key)?;
    let encoded = sk.public_key().to_encoded_point(true);
    let bytes: [u8; COMPRESSED_PUBLIC_KEY_SIZE] = encoded
        .as_bytes()
        .try_into()
        .map_err(|_| CryptoError::Crypto("Failed to encode public key".into()))?;
    Ok(PublicKey::new(bytes))
}

/// Decompress a public key into its affine coordinates
///
/// Fails if the bytes are not a valid compressed point on the curve.
pub fn compressed_to_full(public_key: &PublicKey) -> Result<FullPublicKey> {
    let point = decode_public_key(public_key)?;
    let encoded = point.to_encoded_point(false);

    let x = encoded
        .x()
        .ok_or_else(|| CryptoError::InvalidPublicKey("point at infinity".into()))?;
    let y = encoded
        .y()
        .ok_or_else(|| CryptoError::InvalidPublicKey("missing y coordinate".into()))?;

    Ok(FullPublicKey {
        x: to_array::<COORDINATE_SIZE>("x coordinate", x.as_slice())?,
        y: to_array::<COORDINATE_SIZE>("y coordinate", y.as_slice())?,
    })
}

/// Re-compress affine coordinates into a SEC1 compressed key
pub fn full_to_compressed(full: &FullPublicKey) -> Result<PublicKey> {
    let point = decode_full(full)?;
    let encoded = point.to_encoded_point(true);
    Ok(PublicKey::new(to_array(
        "compressed public key",
        encoded.as_bytes(),
    )?))
}

/// Whether the coordinates satisfy `y^2 = x^3 + 7`
pub fn is_on_curve(full: &FullPublicKey) -> bool {
    decode_full(full).is_ok()
}

/// Decode a compressed key into a curve point
pub fn decode_public_key(public_key: &PublicKey) -> Result<k256::PublicKey> {
    if public_key.as_bytes()[0] != 0x02 && public_key.as_bytes()[0] != 0x03 {
        return Err(CryptoError::InvalidPublicKey(
            "not a compressed SEC1 encoding".into(),
        ));
    }
    k256::PublicKey::from_sec1_bytes(public_key.as_bytes())
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

fn decode_full(full: &FullPublicKey) -> Result<k256::PublicKey> {
    let encoded = EncodedPoint::from_affine_coordinates(
        &FieldBytes::from(full.x),
        &FieldBytes::from(full.y),
        false,
    );
    Option::from(k256::PublicKey::from_encoded_point(&encoded))
        .ok_or_else(|| CryptoError::InvalidPublicKey("coordinates are not on the curve".into()))
}
