//! Error types for illium-lurk

use thiserror::Error;

/// Result type for reading and evaluation
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while reading or evaluating a program
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The source text is not a single well-formed expression
    #[error("Parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// A symbol has no binding in scope
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    /// An operator received a value of the wrong type
    #[error("Type mismatch in {op}: expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: String,
    },

    /// A builtin or closure received the wrong number of arguments
    #[error("Arity mismatch in {op}: expected {expected}, got {actual}")]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    /// A special form or application is syntactically malformed
    #[error("Malformed expression: {0}")]
    Malformed(String),

    /// Division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// `open` or `secret` on a commitment with no known opening
    #[error("Unknown commitment: {0}")]
    UnknownCommitment(String),

    /// Numeric value does not name a Unicode scalar
    #[error("Invalid character code: {0}")]
    InvalidChar(u64),

    /// Evaluation did not terminate within the step bound
    #[error("Evaluation exceeded {max_steps} steps")]
    Exhausted { max_steps: usize },
}

impl EvalError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        EvalError::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Whether the failure happened while reading the source text
    pub fn is_parse(&self) -> bool {
        matches!(self, EvalError::Parse { .. })
    }

    /// Whether the failure is the step bound being reached
    pub fn is_exhausted(&self) -> bool {
        matches!(self, EvalError::Exhausted { .. })
    }
}
