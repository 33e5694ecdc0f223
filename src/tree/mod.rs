//! The sparse Merkle tree core: traversal, mutation, and retraction.
//!
//! [`SparseMerkleTree`] walks encoded nodes down a key's hash path and
//! rebuilds the ancestor spine on every write. Old nodes are never
//! modified in place, so every previously returned root stays usable as
//! a read handle until it is explicitly retracted.

mod retract;
mod smt;

pub use smt::SparseMerkleTree;

use thiserror::Error;

use crate::proof::ProofError;
use crate::traits::StoreError;

/// Error type for tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A backing-store failure, surfaced verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A proof transform failed while serving a proving operation.
    #[error(transparent)]
    Proof(#[from] ProofError),
    /// A stored encoding had an unexpected length or tag byte. This is a
    /// fatal integrity error, not a normal runtime condition.
    #[error("malformed node encoding ({len} bytes, tag {tag:#04x})")]
    MalformedNode { len: usize, tag: u8 },
}
