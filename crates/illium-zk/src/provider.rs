//! Evaluation and proof provider interfaces
//!
//! Platform adapters program against [`ProgramEvaluator`] and
//! [`ProofProvider`] rather than a concrete backend. [`LurkEvaluator`] runs
//! programs without any parameter set; [`crate::ProofEngine`] is the
//! transcript-proof implementation.

use illium_lurk::{EvalConfig, EvalOutput, Evaluator, TaggedValue};

use crate::engine::{ProofOutput, ProveRequest};
use crate::error::Result;
use crate::proof::Proof;

/// Run a program on its inputs without proving (dry run)
pub trait ProgramEvaluator: Send + Sync {
    fn evaluate(&self, request: &ProveRequest, debug: bool) -> Result<EvalOutput>;
}

/// Evaluate, prove and verify programs under one parameter set
pub trait ProofProvider: ProgramEvaluator {
    /// Backend name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Evaluate and prove
    fn create_proof(&self, request: &ProveRequest) -> Result<ProofOutput>;

    /// Whether the encoded proof attests that `program` on `public_params` produced `expected`
    ///
    /// Malformed proofs are rejected, never reported as errors.
    fn verify_proof_bytes(
        &self,
        program: &str,
        public_params: &str,
        proof: &[u8],
        expected: &TaggedValue,
    ) -> bool;

    fn verify_proof(
        &self,
        program: &str,
        public_params: &str,
        proof: &Proof,
        expected: &TaggedValue,
    ) -> bool {
        self.verify_proof_bytes(program, public_params, proof.as_bytes(), expected)
    }
}

/// Evaluator that needs no public parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct LurkEvaluator;

impl ProgramEvaluator for LurkEvaluator {
    fn evaluate(&self, request: &ProveRequest, debug: bool) -> Result<EvalOutput> {
        let config = EvalConfig::new(request.max_steps).with_debug(debug);
        Ok(Evaluator::new(config).eval_program(
            &request.program,
            &request.private_params,
            &request.public_params,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use illium_lurk::Value;

    #[test]
    fn test_evaluator_as_trait_object() {
        let evaluator: Box<dyn ProgramEvaluator> = Box::new(LurkEvaluator);
        let request = ProveRequest::new("(lambda (a b) (* a b))", "6", "7", 100);
        let out = evaluator.evaluate(&request, false).unwrap();
        assert_eq!(out.value, Value::num(42));
    }

    #[test]
    fn test_evaluator_accepts_large_step_bounds() {
        let request = ProveRequest::new("(lambda (a b) a)", "1", "", usize::MAX);
        assert!(LurkEvaluator.evaluate(&request, false).is_ok());
    }

    #[test]
    fn test_evaluator_reports_exhaustion() {
        let request = ProveRequest::new("(lambda (a b) a)", "1", "", 0);
        assert!(LurkEvaluator.evaluate(&request, false).unwrap_err().is_exhausted());
    }
}
