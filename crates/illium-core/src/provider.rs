//! Pluggable crypto backend
//!
//! Platform adapters program against [`CryptoProvider`] instead of calling the
//! secp256k1 functions directly, so another curve can be slotted in without
//! touching the adapters.

use crate::error::Result;
use crate::types::{FullPublicKey, MessageHash, PublicKey, SecretKey, Signature};
use crate::{keys, signing};

/// Key management and signature operations exposed to platform adapters
pub trait CryptoProvider: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &'static str;

    /// Generate a random secret key
    fn generate_secret_key(&self) -> Result<SecretKey>;

    /// Deterministically derive a secret key from a wallet seed
    fn secret_key_from_seed(&self, seed: &[u8]) -> Result<SecretKey>;

    /// Compressed public key for a secret key
    fn private_to_public(&self, secret_key: &SecretKey) -> Result<PublicKey>;

    /// Affine coordinates of a compressed public key
    fn compressed_to_full(&self, public_key: &PublicKey) -> Result<FullPublicKey>;

    /// Sign a pre-computed digest
    fn sign(&self, secret_key: &SecretKey, digest: &MessageHash) -> Result<Signature>;

    /// Verify a signature over a digest
    fn verify(&self, public_key: &PublicKey, digest: &MessageHash, signature: &Signature) -> bool;
}

/// secp256k1 ECDSA backend
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Provider;

impl CryptoProvider for Secp256k1Provider {
    fn name(&self) -> &'static str {
        "secp256k1-ecdsa"
    }

    fn generate_secret_key(&self) -> Result<SecretKey> {
        keys::generate_secret_key()
    }

    fn secret_key_from_seed(&self, seed: &[u8]) -> Result<SecretKey> {
        keys::secret_key_from_seed(seed)
    }

    fn private_to_public(&self, secret_key: &SecretKey) -> Result<PublicKey> {
        keys::private_to_public(secret_key)
    }

    fn compressed_to_full(&self, public_key: &PublicKey) -> Result<FullPublicKey> {
        keys::compressed_to_full(public_key)
    }

    fn sign(&self, secret_key: &SecretKey, digest: &MessageHash) -> Result<Signature> {
        signing::sign(secret_key, digest)
    }

    fn verify(&self, public_key: &PublicKey, digest: &MessageHash, signature: &Signature) -> bool {
        signing::verify(public_key, digest, signature)
    }
}
