//! Illium Core - key management and signatures for the Illium wallet engine
//!
//! - **Key engine** ([`keys`]): random and seed-derived secret keys, public key
//!   derivation, point decompression
//! - **Signature engine** ([`signing`]): ECDSA over caller-computed digests
//! - **Provider** ([`provider`]): the [`CryptoProvider`] seam platform adapters use

pub mod error;
pub mod keys;
pub mod provider;
pub mod signing;
pub mod types;

pub use error::{CryptoError, Result};
pub use provider::{CryptoProvider, Secp256k1Provider};
pub use types::{
    FullPublicKey, MessageHash, PublicKey, SecretKey, Signature, COMPRESSED_PUBLIC_KEY_SIZE,
    COORDINATE_SIZE, DIGEST_SIZE, SCALAR_SIZE, SECRET_KEY_SIZE, SEED_SIZE,
};
