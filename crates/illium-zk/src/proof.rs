//! Proof wire format
//!
//! All integers are big-endian.
//!
//! ```text
//! magic "ILXP" | version u8 | params id [32] | statement [32]
//! | max_steps u32 | trace_len u32 | trace root [32]
//! | opening count u8 | openings | seal [32]
//!
//! opening = index u32 | leaf [32] | path len u8 | path [32 * len]
//! ```
//!
//! The seal covers every byte before it.

use crate::error::{Result, ZkError};

/// Leading bytes of every encoded proof
pub const PROOF_MAGIC: &[u8; 4] = b"ILXP";

/// Current wire format version
pub const PROOF_VERSION: u8 = 1;

/// Upper bound on an encoded proof
pub const MAX_PROOF_SIZE: usize = 16 * 1024;

/// Longest authentication path a `u32` trace length can need
pub const MAX_PATH_LEN: usize = 32;

const HEADER_SIZE: usize = 4 + 1 + 32 + 32 + 4 + 4 + 32 + 1;
const SEAL_SIZE: usize = 32;

/// Owned, length-explicit proof bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        hex::decode(s.trim())
            .map(Self)
            .map_err(|e| ZkError::InvalidInput(format!("proof hex: {}", e)))
    }
}

impl From<Vec<u8>> for Proof {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Proof {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A revealed trace leaf with its authentication path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    pub index: u32,
    pub leaf: [u8; 32],
    pub path: Vec<[u8; 32]>,
}

/// Decoded transcript proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptProof {
    pub params_id: [u8; 32],
    pub statement: [u8; 32],
    pub max_steps: u32,
    pub trace_len: u32,
    pub trace_root: [u8; 32],
    pub openings: Vec<Opening>,
    pub seal: [u8; 32],
}

impl TranscriptProof {
    /// Every encoded byte the seal covers
    pub fn body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(PROOF_MAGIC);
        out.push(PROOF_VERSION);
        out.extend_from_slice(&self.params_id);
        out.extend_from_slice(&self.statement);
        out.extend_from_slice(&self.max_steps.to_be_bytes());
        out.extend_from_slice(&self.trace_len.to_be_bytes());
        out.extend_from_slice(&self.trace_root);
        // Opening and path counts are bounded by the encoder
        out.push(self.openings.len() as u8);
        for opening in &self.openings {
            out.extend_from_slice(&opening.index.to_be_bytes());
            out.extend_from_slice(&opening.leaf);
            out.push(opening.path.len() as u8);
            for node in &opening.path {
                out.extend_from_slice(node);
            }
        }
        out
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE
            + self
                .openings
                .iter()
                .map(|o| 4 + 32 + 1 + 32 * o.path.len())
                .sum::<usize>()
            + SEAL_SIZE
    }

    /// Encode, enforcing the count and size limits
    pub fn encode(&self) -> Result<Proof> {
        if self.openings.len() > usize::from(u8::MAX) {
            return Err(ZkError::ProofConstruction("too many openings".into()));
        }
        if self.openings.iter().any(|o| o.path.len() > MAX_PATH_LEN) {
            return Err(ZkError::ProofConstruction("authentication path too long".into()));
        }
        let size = self.encoded_len();
        if size > MAX_PROOF_SIZE {
            return Err(ZkError::ProofTooLarge {
                size,
                max: MAX_PROOF_SIZE,
            });
        }

        let mut out = self.body();
        out.extend_from_slice(&self.seal);
        Ok(Proof(out))
    }

    /// Strict decode: known magic and version, exact length, bounded counts
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_PROOF_SIZE {
            return Err(ZkError::ProofTooLarge {
                size: bytes.len(),
                max: MAX_PROOF_SIZE,
            });
        }
        let mut r = Cursor::new(bytes);

        if r.array::<4>()? != *PROOF_MAGIC {
            return Err(malformed("bad magic"));
        }
        let version = r.u8()?;
        if version != PROOF_VERSION {
            return Err(malformed("unsupported version"));
        }

        let params_id = r.array()?;
        let statement = r.array()?;
        let max_steps = r.u32()?;
        let trace_len = r.u32()?;
        let trace_root = r.array()?;

        let count = r.u8()?;
        let mut openings = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let index = r.u32()?;
            let leaf = r.array()?;
            let path_len = usize::from(r.u8()?);
            if path_len > MAX_PATH_LEN {
                return Err(malformed("authentication path too long"));
            }
            let path = (0..path_len)
                .map(|_| r.array())
                .collect::<Result<Vec<_>>>()?;
            openings.push(Opening { index, leaf, path });
        }

        let seal = r.array()?;
        if !r.is_empty() {
            return Err(malformed("trailing bytes"));
        }

        Ok(Self {
            params_id,
            statement,
            max_steps,
            trace_len,
            trace_root,
            openings,
            seal,
        })
    }
}

fn malformed(what: &str) -> ZkError {
    ZkError::InvalidInput(format!("malformed proof: {}", what))
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(malformed("truncated"));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.take(N)?
            .try_into()
            .map_err(|_| malformed("truncated"))
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        self.array::<4>().map(u32::from_be_bytes)
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
