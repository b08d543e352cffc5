//! Transcript proof engine
//!
//! Proving runs the evaluator with a trace recorder attached. Each machine
//! step becomes a leaf `H(salt_i || fingerprint_i)`, where the salts derive
//! from a fresh random seed that never leaves the prover. The proof carries
//! the Merkle root of the leaves, Fiat-Shamir sampled openings, and a seal
//! over the whole encoding keyed by the parameter set. The statement digest
//! binds the parameter set, program, public params, output and step bound.
//! The seal key is part of the public parameters, so a verifier is only
//! assured of that binding: anyone holding the parameters can seal a
//! transcript that no honest evaluation produced.
//!
//! Lifecycle per proof: `ProveRequest` -> [`EvaluatedStatement`] -> [`ProofOutput`].

use std::sync::Arc;

use illium_lurk::{
    eval::program_expr, read, read_or_nil, ControlView, EvalConfig, EvalOutput, Evaluator,
    StepObserver, StepView, TaggedValue,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Result, ZkError};
use crate::merkle::{self, MerkleTree};
use crate::params::{ParameterStore, PublicParams};
use crate::proof::{Opening, Proof, TranscriptProof};
use crate::provider::{LurkEvaluator, ProgramEvaluator, ProofProvider};

const STATEMENT_DOMAIN: &[u8] = b"illium.zk.statement.v1";
const STEP_DOMAIN: &[u8] = b"illium.zk.step.v1";
const SALT_DOMAIN: &[u8] = b"illium.zk.salt.v1";
const LEAF_DOMAIN: &[u8] = b"illium.zk.leaf.v1";
const CHALLENGE_DOMAIN: &[u8] = b"illium.zk.challenge.v1";
const SEAL_DOMAIN: &[u8] = b"illium.zk.seal.v1";

/// Inputs to evaluation and proving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveRequest {
    pub program: String,
    pub private_params: String,
    pub public_params: String,
    pub max_steps: usize,
}

impl ProveRequest {
    pub fn new(
        program: impl Into<String>,
        private_params: impl Into<String>,
        public_params: impl Into<String>,
        max_steps: usize,
    ) -> Self {
        Self {
            program: program.into(),
            private_params: private_params.into(),
            public_params: public_params.into(),
            max_steps,
        }
    }

    fn bounded_steps(&self) -> Result<u32> {
        u32::try_from(self.max_steps).map_err(|_| {
            ZkError::InvalidInput(format!("max_steps {} exceeds u32::MAX", self.max_steps))
        })
    }
}

/// A proof and the output it attests to
#[derive(Debug, Clone)]
pub struct ProofOutput {
    pub proof: Proof,
    pub output: TaggedValue,
    pub iterations: usize,
}

/// What a proof attests to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    pub params_id: [u8; 32],
    pub program: TaggedValue,
    pub public_params: TaggedValue,
    pub output: TaggedValue,
    pub max_steps: u32,
}

impl Statement {
    /// Build the statement for `program` on `public_params`
    ///
    /// Program and params are read as data, so layout and comments do not
    /// change the statement.
    pub fn new(
        params: &PublicParams,
        program: &str,
        public_params: &str,
        output: TaggedValue,
        max_steps: u32,
    ) -> Result<Self> {
        Ok(Self {
            params_id: *params.id(),
            program: read(program)?.tagged(),
            public_params: read_or_nil(public_params)?.tagged(),
            output,
            max_steps,
        })
    }

    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(STATEMENT_DOMAIN);
        hasher.update(self.params_id);
        for tagged in [&self.program, &self.public_params, &self.output] {
            hasher.update(tagged.tag);
            hasher.update(tagged.value);
        }
        hasher.update(self.max_steps.to_be_bytes());
        hasher.finalize().into()
    }
}

/// A successful evaluation, ready to be proved
#[derive(Debug, Clone)]
pub struct EvaluatedStatement {
    statement: Statement,
    leaves: Vec<[u8; 32]>,
    iterations: usize,
}

impl EvaluatedStatement {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn output(&self) -> TaggedValue {
        self.statement.output
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Turns each machine step into a salted trace leaf
struct TraceRecorder {
    seed: [u8; 32],
    leaves: Vec<[u8; 32]>,
}

impl StepObserver for TraceRecorder {
    fn observe(&mut self, step: &StepView<'_>) {
        let (kind, value) = match step.control {
            ControlView::Eval(expr) => (0u8, expr.tagged()),
            ControlView::Return(value) => (1u8, value.tagged()),
        };

        let fingerprint: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update(STEP_DOMAIN);
            hasher.update((step.index as u64).to_be_bytes());
            hasher.update([kind]);
            hasher.update(value.tag);
            hasher.update(value.value);
            hasher.update((step.depth as u64).to_be_bytes());
            hasher.finalize().into()
        };

        let salt: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update(SALT_DOMAIN);
            hasher.update(self.seed);
            hasher.update((step.index as u64).to_be_bytes());
            hasher.finalize().into()
        };

        let mut hasher = Sha256::new();
        hasher.update(LEAF_DOMAIN);
        hasher.update(salt);
        hasher.update(fingerprint);
        self.leaves.push(hasher.finalize().into());
    }
}

/// Leaf indices the verifier will check, derived from the transcript
fn challenge_indices(statement: &[u8; 32], root: &[u8; 32], trace_len: u32, count: u8) -> Vec<u32> {
    (0..count)
        .map(|j| {
            let mut hasher = Sha256::new();
            hasher.update(CHALLENGE_DOMAIN);
            hasher.update(statement);
            hasher.update(root);
            hasher.update(trace_len.to_be_bytes());
            hasher.update([j]);
            let digest: [u8; 32] = hasher.finalize().into();
            let mut word = [0u8; 8];
            word.copy_from_slice(&digest[..8]);
            (u64::from_be_bytes(word) % u64::from(trace_len)) as u32
        })
        .collect()
}

fn compute_seal(binding_key: &[u8; 32], body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SEAL_DOMAIN);
    hasher.update(binding_key);
    hasher.update(body);
    hasher.finalize().into()
}

/// Proof engine bound to one parameter set
#[derive(Debug, Clone)]
pub struct ProofEngine {
    params: Arc<PublicParams>,
}

impl ProofEngine {
    pub fn new(params: Arc<PublicParams>) -> Self {
        Self { params }
    }

    /// Engine over a store's loaded parameters; fails if the store is not loaded
    pub fn from_store(store: &ParameterStore) -> Result<Self> {
        store.get().map(Self::new).ok_or(ZkError::NotInitialized)
    }

    pub fn params(&self) -> &Arc<PublicParams> {
        &self.params
    }

    /// Evaluate the request, recording the trace
    pub fn evaluate_statement(&self, request: &ProveRequest) -> Result<EvaluatedStatement> {
        let max_steps = request.bounded_steps()?;

        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| ZkError::ProofConstruction(format!("entropy source failed: {}", e)))?;

        let expr = program_expr(
            &request.program,
            &request.private_params,
            &request.public_params,
        )?;
        let mut recorder = TraceRecorder {
            seed,
            leaves: Vec::new(),
        };
        let out = Evaluator::new(EvalConfig::new(request.max_steps)).run(&expr, &mut recorder)?;

        let statement = Statement::new(
            &self.params,
            &request.program,
            &request.public_params,
            out.tagged,
            max_steps,
        )?;
        debug!(iterations = out.iterations, "statement evaluated");

        Ok(EvaluatedStatement {
            statement,
            leaves: recorder.leaves,
            iterations: out.iterations,
        })
    }

    /// Prove an evaluated statement
    pub fn prove(&self, evaluated: EvaluatedStatement) -> Result<ProofOutput> {
        let trace_len = u32::try_from(evaluated.leaves.len())
            .map_err(|_| ZkError::ProofConstruction("trace longer than u32::MAX".into()))?;
        let tree = MerkleTree::from_leaves(&evaluated.leaves)?;
        let root = tree.root();
        let statement = evaluated.statement.digest();

        let openings = challenge_indices(&statement, &root, trace_len, self.params.config().openings)
            .into_iter()
            .map(|index| {
                let i = index as usize;
                Ok(Opening {
                    index,
                    leaf: evaluated.leaves[i],
                    path: tree.proof(i)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut transcript = TranscriptProof {
            params_id: *self.params.id(),
            statement,
            max_steps: evaluated.statement.max_steps,
            trace_len,
            trace_root: root,
            openings,
            seal: [0u8; 32],
        };
        transcript.seal = compute_seal(self.params.binding_key(), &transcript.body());
        let proof = transcript.encode()?;

        info!(
            iterations = evaluated.iterations,
            size = proof.len(),
            "proof created"
        );
        Ok(ProofOutput {
            proof,
            output: evaluated.statement.output,
            iterations: evaluated.iterations,
        })
    }

    /// Check a proof, naming the first failed check
    fn check(
        &self,
        program: &str,
        public_params: &str,
        proof: &[u8],
        expected: &TaggedValue,
    ) -> std::result::Result<(), &'static str> {
        let transcript = TranscriptProof::decode(proof).map_err(|_| "malformed encoding")?;

        if transcript.params_id != *self.params.id() {
            return Err("parameter set mismatch");
        }
        if transcript.trace_len == 0 || transcript.trace_len > transcript.max_steps {
            return Err("trace length out of bounds");
        }

        let statement = Statement::new(
            &self.params,
            program,
            public_params,
            *expected,
            transcript.max_steps,
        )
        .map_err(|_| "unreadable program or public params")?;
        if statement.digest() != transcript.statement {
            return Err("statement mismatch");
        }

        let indices = challenge_indices(
            &transcript.statement,
            &transcript.trace_root,
            transcript.trace_len,
            self.params.config().openings,
        );
        if indices.len() != transcript.openings.len() {
            return Err("wrong number of openings");
        }

        let depth = merkle::depth_for(transcript.trace_len as usize);
        for (opening, index) in transcript.openings.iter().zip(indices) {
            if opening.index != index || opening.path.len() != depth {
                return Err("opening does not match challenge");
            }
            if !MerkleTree::verify_proof(
                &transcript.trace_root,
                &opening.leaf,
                index as usize,
                &opening.path,
            ) {
                return Err("opening not in trace");
            }
        }

        if compute_seal(self.params.binding_key(), &transcript.body()) != transcript.seal {
            return Err("seal mismatch");
        }
        Ok(())
    }
}

impl ProgramEvaluator for ProofEngine {
    /// Same bounds as [`ProofProvider::create_proof`], without the proof
    fn evaluate(&self, request: &ProveRequest, debug: bool) -> Result<EvalOutput> {
        request.bounded_steps()?;
        LurkEvaluator.evaluate(request, debug)
    }
}

impl ProofProvider for ProofEngine {
    fn name(&self) -> &'static str {
        "transcript"
    }

    fn create_proof(&self, request: &ProveRequest) -> Result<ProofOutput> {
        let evaluated = self.evaluate_statement(request)?;
        self.prove(evaluated)
    }

    fn verify_proof_bytes(
        &self,
        program: &str,
        public_params: &str,
        proof: &[u8],
        expected: &TaggedValue,
    ) -> bool {
        match self.check(program, public_params, proof, expected) {
            Ok(()) => true,
            Err(reason) => {
                debug!(reason, "proof rejected");
                false
            }
        }
    }
}
