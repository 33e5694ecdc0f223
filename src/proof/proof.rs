//! Proof types and the compaction transform.

use digest::Digest;
use serde::{Deserialize, Serialize};

use crate::bits;
use crate::proof::ProofError;
use crate::tree_hasher::TreeHasher;

/// A Merkle proof for a key under some root.
///
/// `side_nodes` holds the sibling digests along the key's path, bottom
/// first; the list is only as long as the stored spine, not the
/// conceptual tree depth. For a non-membership proof whose slot is
/// occupied by a different key's leaf, `non_membership_leaf_data`
/// carries that leaf's encoding. Updatable proofs additionally carry
/// `sibling_data`, the encoding of the deepest sibling.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMerkleProof {
    /// Sibling digests along the path, deepest first.
    pub side_nodes: Vec<Vec<u8>>,
    /// Encoded leaf proving that a different key occupies the queried
    /// slot, for non-membership proofs.
    pub non_membership_leaf_data: Option<Vec<u8>>,
    /// Encoding of the deepest sibling, present on updatable proofs.
    pub sibling_data: Option<Vec<u8>>,
}

impl SparseMerkleProof {
    /// Structural validity against the tree parameters: sidenode count
    /// and sizes, leaf-data length, and sibling-data consistency with
    /// the deepest sidenode.
    pub(crate) fn sanity_check<H: Digest>(&self, th: &TreeHasher<H>) -> bool {
        if self.side_nodes.len() > th.depth() {
            return false;
        }
        if self.side_nodes.iter().any(|n| n.len() != th.path_size()) {
            return false;
        }
        if let Some(leaf_data) = &self.non_membership_leaf_data {
            if leaf_data.len() != 1 + 2 * th.path_size() {
                return false;
            }
        }
        if let Some(sibling_data) = &self.sibling_data {
            if let Some(deepest) = self.side_nodes.first() {
                if th.digest(sibling_data) != *deepest {
                    return false;
                }
            }
        }
        true
    }
}

/// A [`SparseMerkleProof`] with placeholder sidenodes elided.
///
/// `bitmask` records, MSB first, which of the original `num_side_nodes`
/// positions held a placeholder; only the remaining sidenodes are kept.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseCompactMerkleProof {
    /// Non-placeholder sibling digests along the path, deepest first.
    pub side_nodes: Vec<Vec<u8>>,
    /// Encoded leaf proving that a different key occupies the queried
    /// slot, for non-membership proofs.
    pub non_membership_leaf_data: Option<Vec<u8>>,
    /// Presence bitmask: a set bit marks an elided placeholder sidenode.
    pub bitmask: Vec<u8>,
    /// Sidenode count of the original proof.
    pub num_side_nodes: usize,
    /// Encoding of the deepest sibling, present on updatable proofs.
    pub sibling_data: Option<Vec<u8>>,
}

impl SparseCompactMerkleProof {
    pub(crate) fn sanity_check<H: Digest>(&self, th: &TreeHasher<H>) -> bool {
        if self.num_side_nodes > th.depth() {
            return false;
        }
        if self.bitmask.len() != self.num_side_nodes.div_ceil(8) {
            return false;
        }
        if self.side_nodes.len() + bits::count_set_bits(&self.bitmask) != self.num_side_nodes {
            return false;
        }
        self.side_nodes.iter().all(|n| n.len() == th.path_size())
    }
}

/// Compacts a proof by eliding placeholder sidenodes behind a bitmask.
pub fn compact_proof<H: Digest>(
    proof: &SparseMerkleProof,
) -> Result<SparseCompactMerkleProof, ProofError> {
    let th = TreeHasher::<H>::new();
    if !proof.sanity_check(&th) {
        return Err(ProofError::Malformed(
            "proof fails sanity check".to_string(),
        ));
    }

    let mut bitmask = vec![0u8; proof.side_nodes.len().div_ceil(8)];
    let mut side_nodes = Vec::with_capacity(proof.side_nodes.len());
    for (i, node) in proof.side_nodes.iter().enumerate() {
        if node == th.placeholder() {
            bits::set_bit_msb(&mut bitmask, i);
        } else {
            side_nodes.push(node.clone());
        }
    }

    Ok(SparseCompactMerkleProof {
        side_nodes,
        non_membership_leaf_data: proof.non_membership_leaf_data.clone(),
        bitmask,
        num_side_nodes: proof.side_nodes.len(),
        sibling_data: proof.sibling_data.clone(),
    })
}

/// Restores a compacted proof to its full form.
pub fn decompact_proof<H: Digest>(
    proof: &SparseCompactMerkleProof,
) -> Result<SparseMerkleProof, ProofError> {
    let th = TreeHasher::<H>::new();
    if !proof.sanity_check(&th) {
        return Err(ProofError::Malformed(
            "compact proof fails sanity check".to_string(),
        ));
    }

    let mut stored = proof.side_nodes.iter();
    let mut side_nodes = Vec::with_capacity(proof.num_side_nodes);
    for i in 0..proof.num_side_nodes {
        if bits::get_bit_msb(&proof.bitmask, i) == 1 {
            side_nodes.push(th.placeholder().to_vec());
        } else {
            let node = stored.next().ok_or_else(|| {
                ProofError::Malformed("bitmask disagrees with sidenode count".to_string())
            })?;
            side_nodes.push(node.clone());
        }
    }

    Ok(SparseMerkleProof {
        side_nodes,
        non_membership_leaf_data: proof.non_membership_leaf_data.clone(),
        sibling_data: proof.sibling_data.clone(),
    })
}
