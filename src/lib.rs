#![doc = include_str!("../README.md")]

mod bits;
mod format;
pub mod mem_store;
pub mod proof;
pub mod traits;
pub mod tree;
mod tree_hasher;

pub use mem_store::MemStore;
pub use proof::{
    compact_proof, decompact_proof, verify_compact_proof, verify_proof, ProofError,
    SparseCompactMerkleProof, SparseMerkleProof,
};
pub use traits::{MapStore, StoreError};
pub use tree::{SparseMerkleTree, TreeError};

#[cfg(test)]
mod fuzz;
