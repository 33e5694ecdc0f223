//! Proof verification: recomputing a root from a key, a value, and a
//! proof.

use digest::Digest;

use crate::bits;
use crate::proof::{decompact_proof, SparseCompactMerkleProof, SparseMerkleProof};
use crate::tree_hasher::TreeHasher;

/// Verifies a proof of `key` mapping to `value` under `root`.
///
/// An empty `value` asks for non-membership: the proof must then show
/// either an empty terminus (the candidate starts from the placeholder)
/// or a different key's leaf occupying the slot. In every case the
/// candidate digest is folded upward over the sidenodes, taking the side
/// dictated by the key path bit at each level, and compared against
/// `root`.
pub fn verify_proof<H: Digest>(
    proof: &SparseMerkleProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
) -> bool {
    let th = TreeHasher::<H>::new();
    let path = th.path(key);

    if !proof.sanity_check(&th) {
        return false;
    }

    let mut current = if value.is_empty() {
        // Non-membership.
        match &proof.non_membership_leaf_data {
            None => th.placeholder().to_vec(),
            Some(leaf_data) => {
                let Ok((leaf_path, value_hash)) = th.parse_leaf(leaf_data) else {
                    return false;
                };
                if leaf_path == path.as_slice() {
                    // The presented leaf belongs to the queried key, so
                    // the key is in fact present.
                    return false;
                }
                th.digest_leaf(leaf_path, value_hash).0
            }
        }
    } else {
        // Membership.
        let value_hash = th.digest(value);
        th.digest_leaf(&path, &value_hash).0
    };

    for (i, side_node) in proof.side_nodes.iter().enumerate() {
        let bit_index = proof.side_nodes.len() - 1 - i;
        current = if bits::get_bit_msb(&path, bit_index) == bits::RIGHT {
            th.digest_node(side_node, &current).0
        } else {
            th.digest_node(&current, side_node).0
        };
    }

    current == root
}

/// Verifies a compacted proof of `key` mapping to `value` under `root`.
pub fn verify_compact_proof<H: Digest>(
    proof: &SparseCompactMerkleProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
) -> bool {
    match decompact_proof::<H>(proof) {
        Ok(proof) => verify_proof::<H>(&proof, root, key, value),
        Err(_) => false,
    }
}
