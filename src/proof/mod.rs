//! Merkle proofs: membership and non-membership, full and compacted.

mod proof;
mod verifier;

pub use proof::{compact_proof, decompact_proof, SparseCompactMerkleProof, SparseMerkleProof};
pub use verifier::{verify_compact_proof, verify_proof};

use thiserror::Error;

/// Error type for proof handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// The proof's structure does not fit the tree parameters.
    #[error("malformed proof: {0}")]
    Malformed(String),
}
