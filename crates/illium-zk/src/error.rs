//! Error types for illium-zk

use illium_lurk::EvalError;
use thiserror::Error;

/// Result type for parameter and proof operations
pub type Result<T> = std::result::Result<T, ZkError>;

/// Errors that can occur while loading parameters or building proofs
#[derive(Debug, Error)]
pub enum ZkError {
    /// Proof operation invoked before the parameter set was loaded
    #[error("Public parameters are not loaded")]
    NotInitialized,

    /// The program failed to parse or evaluate
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Proof construction failed after a successful evaluation
    #[error("Proof construction failed: {0}")]
    ProofConstruction(String),

    /// Encoded proof exceeds the wire size limit
    #[error("Proof is {size} bytes, limit is {max}")]
    ProofTooLarge { size: usize, max: usize },

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cached parameter set does not match the configured setup
    #[error("Invalid parameter set: {0}")]
    InvalidParams(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ZkError {
    /// Whether the failure is the evaluation step bound being reached
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ZkError::Eval(e) if e.is_exhausted())
    }

    /// Whether the failure happened while reading source text
    pub fn is_parse(&self) -> bool {
        matches!(self, ZkError::Eval(e) if e.is_parse())
    }
}

impl From<bincode::Error> for ZkError {
    fn from(e: bincode::Error) -> Self {
        ZkError::Serialization(e.to_string())
    }
}
