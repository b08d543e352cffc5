//! Illium ZK - public parameters, proof construction and verification
//!
//! - **Parameter store** ([`params`]): one-time, idempotent setup of the
//!   process-wide parameter set, with an optional on-disk cache
//! - **Proof engine** ([`engine`]): evaluate a program with its inputs and
//!   prove the result; verify proofs against program, public params and output
//! - **Providers** ([`provider`]): the [`ProgramEvaluator`] and [`ProofProvider`]
//!   seams platform adapters use
//!
//! ```text
//! ParameterStore::load() --Arc<PublicParams>--> ProofEngine
//!     create_proof(ProveRequest) -> ProofOutput { proof, output, iterations }
//!     verify_proof(program, public, proof, output) -> bool
//! ```

pub mod engine;
pub mod error;
pub mod merkle;
pub mod params;
pub mod proof;
pub mod provider;

pub use engine::{EvaluatedStatement, ProofEngine, ProofOutput, ProveRequest, Statement};
pub use error::{Result, ZkError};
pub use params::{ParameterStore, PublicParams, SetupConfig, DEFAULT_OPENINGS, DEFAULT_SETUP_ROUNDS};
pub use proof::{Proof, TranscriptProof, MAX_PROOF_SIZE};
pub use provider::{LurkEvaluator, ProgramEvaluator, ProofProvider};
