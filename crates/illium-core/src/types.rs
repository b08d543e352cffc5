//! Fixed-size key, digest and signature types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// Size of a secret key scalar in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Size of a wallet recovery seed in bytes
pub const SEED_SIZE: usize = 32;

/// Size of a SEC1 compressed public key in bytes
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;

/// Size of one affine coordinate in bytes
pub const COORDINATE_SIZE: usize = 32;

/// Size of a message digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// Size of one signature scalar (r or s) in bytes
pub const SCALAR_SIZE: usize = 32;

/// Serde helper for fixed-size byte arrays: hex in human-readable formats,
/// raw bytes otherwise
pub mod hex_array {
    use super::*;

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> std::result::Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let mut bytes = [0u8; N];
            hex::decode_to_slice(&s, &mut bytes).map_err(D::Error::custom)?;
            Ok(bytes)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            bytes
                .try_into()
                .map_err(|_| D::Error::custom(format!("expected {} bytes", N)))
        }
    }
}

/// Copy a slice into a fixed-size array, reporting a length mismatch
pub fn to_array<const N: usize>(what: &'static str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        what,
        expected: N,
        actual: bytes.len(),
    })
}

fn decode_hex_array<const N: usize>(what: &'static str, s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    to_array(what, &bytes)
}

/// Secret key scalar (32 bytes, big-endian)
///
/// Always non-zero and reduced modulo the curve order once constructed
/// through the key engine.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SECRET_KEY_SIZE]);

impl SecretKey {
    /// Wrap raw bytes without validation. Use [`crate::keys::validate_secret_key`]
    /// before handing untrusted bytes to the engines.
    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build from a slice of exactly [`SECRET_KEY_SIZE`] bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(to_array("secret key", bytes)?))
    }

    /// Parse from hex
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(decode_hex_array("secret key", s)?))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}

/// Compressed public key (33 bytes, SEC1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex_array")] pub [u8; COMPRESSED_PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn new(bytes: [u8; COMPRESSED_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(to_array("compressed public key", bytes)?))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(decode_hex_array("compressed public key", s)?))
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Decompressed public key as a pair of affine coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullPublicKey {
    #[serde(with = "hex_array")]
    pub x: [u8; COORDINATE_SIZE],
    #[serde(with = "hex_array")]
    pub y: [u8; COORDINATE_SIZE],
}

/// Pre-computed message digest (32 bytes). The engines never hash it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct MessageHash(#[serde(with = "hex_array")] pub [u8; DIGEST_SIZE]);

impl MessageHash {
    pub fn new(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(to_array("digest", bytes)?))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(decode_hex_array("digest", s)?))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for MessageHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// ECDSA signature as its two scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "hex_array")]
    pub r: [u8; SCALAR_SIZE],
    #[serde(with = "hex_array")]
    pub s: [u8; SCALAR_SIZE],
}

impl Signature {
    pub fn new(r: [u8; SCALAR_SIZE], s: [u8; SCALAR_SIZE]) -> Self {
        Self { r, s }
    }

    /// Concatenated `r || s` encoding
    pub fn to_bytes(&self) -> [u8; 2 * SCALAR_SIZE] {
        let mut out = [0u8; 2 * SCALAR_SIZE];
        out[..SCALAR_SIZE].copy_from_slice(&self.r);
        out[SCALAR_SIZE..].copy_from_slice(&self.s);
        out
    }

    /// Parse the `r || s` encoding
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let all: [u8; 2 * SCALAR_SIZE] = to_array("signature", bytes)?;
        let mut r = [0u8; SCALAR_SIZE];
        let mut s = [0u8; SCALAR_SIZE];
        r.copy_from_slice(&all[..SCALAR_SIZE]);
        s.copy_from_slice(&all[SCALAR_SIZE..]);
        Ok(Self { r, s })
    }
}
