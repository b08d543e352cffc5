//! Hiding commitments
//!
//! A commitment is `SHA256(domain || secret || tag || value)` over the tagged
//! payload. `commit` is `hide` with a zero secret.

use std::collections::HashMap;

use k256::Scalar;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::num;
use crate::reader;
use crate::value::Value;

/// Domain separator for commitment digests
const COMMIT_DOMAIN: &[u8] = b"illium.lurk.v1/comm";

/// Digest of hiding `payload` under `secret`
pub fn hide_digest(secret: &Scalar, payload: &Value) -> [u8; 32] {
    let tagged = payload.tagged();
    let mut hasher = Sha256::new();
    hasher.update(COMMIT_DOMAIN);
    hasher.update(num::to_bytes(secret));
    hasher.update(tagged.tag);
    hasher.update(tagged.value);
    hasher.finalize().into()
}

/// Commit to the data of an expression without evaluating it
///
/// Whitespace and comments do not affect the result.
pub fn commit(expr: &str) -> Result<[u8; 32]> {
    let data = reader::read(expr)?;
    Ok(hide_digest(&Scalar::ZERO, &data))
}

/// Known openings, keyed by commitment digest
#[derive(Debug, Default)]
pub struct CommitmentStore {
    openings: HashMap<[u8; 32], (Scalar, Value)>,
}

impl CommitmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an opening and return the commitment digest
    pub fn hide(&mut self, secret: Scalar, payload: Value) -> [u8; 32] {
        let digest = hide_digest(&secret, &payload);
        self.openings.insert(digest, (secret, payload));
        digest
    }

    pub fn open(&self, digest: &[u8; 32]) -> Option<&(Scalar, Value)> {
        self.openings.get(digest)
    }

    pub fn len(&self) -> usize {
        self.openings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }
}
