//! Illium Lurk - a small Lisp for provable computation
//!
//! Programs are single expressions over a prime field (the secp256k1 scalar
//! field). Evaluation is bounded: every machine transition counts against
//! `max_steps`, and a run either terminates within the bound or fails with
//! [`EvalError::Exhausted`].
//!
//! ```text
//! source --reader--> Value --Evaluator--> EvalOutput { value, tagged, iterations }
//! ```

pub mod builtins;
pub mod commit;
pub mod error;
pub mod eval;
pub mod num;
pub mod reader;
pub mod tag;
pub mod value;

pub use commit::{commit, CommitmentStore};
pub use error::{EvalError, Result};
pub use eval::{
    eval, program_expr, ControlView, EvalConfig, EvalOutput, Evaluator, StepObserver, StepView,
};
pub use reader::{read, read_or_nil};
pub use tag::{Tag, TaggedValue, TAG_SIZE, VALUE_SIZE};
pub use value::{Env, Value};
