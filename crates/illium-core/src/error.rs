//! Error types for illium-core

use thiserror::Error;

/// Result type for key and signature operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur in the key and signature engines
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CryptoError {
    /// A buffer had the wrong length
    #[error("Invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Secret key bytes are zero or not reduced modulo the curve order
    #[error("Invalid secret key")]
    InvalidSecretKey,

    /// Public key bytes do not encode a point on the curve
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature scalars are zero or out of range
    #[error("Invalid signature encoding")]
    InvalidSignature,

    /// The operating system entropy source failed
    #[error("Entropy source failure: {0}")]
    Entropy(String),

    /// Any other failure reported by the curve backend
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Hex decoding failed
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}
