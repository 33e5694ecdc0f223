//! The tree itself: traversal down a hash path plus the update and
//! delete engines that rebuild the ancestor spine.

use digest::Digest;
use sha2::Sha256;

use crate::bits;
use crate::proof::{compact_proof, SparseCompactMerkleProof, SparseMerkleProof};
use crate::traits::{MapStore, StoreError};
use crate::tree::TreeError;
use crate::tree_hasher::TreeHasher;

/// Everything collected while walking a path from a root: sibling
/// digests and selected-child digests per level (bottom first), the
/// encoded leaf at the terminus if one exists, and optionally the
/// encoding of the deepest sibling.
#[derive(Debug, Clone)]
pub(crate) struct Traversal {
    pub(crate) side_nodes: Vec<Vec<u8>>,
    pub(crate) path_nodes: Vec<Vec<u8>>,
    pub(crate) leaf_data: Option<Vec<u8>>,
    pub(crate) sibling_data: Option<Vec<u8>>,
}

/// A persistent sparse Merkle tree over two [`MapStore`]s.
///
/// `nodes` holds encoded tree nodes under their digest (content
/// addressing); `values` holds raw values under
/// `digest(path ‖ value_hash)` and is expected to reference-count its
/// entries. The tree's conceptual depth is `8 * H::output_size()` bits,
/// but only non-default leaves and their ancestor spine are ever stored.
///
/// Writes never modify stored nodes: every [`update`]/[`delete`]
/// persists a fresh spine and returns a new root. Roots returned earlier
/// keep working as read handles (see [`get_from_root`]) until their
/// nodes are retracted with [`remove_path`] or [`remove_path_for_root`].
///
/// The default value is the empty byte string; writing it is identical
/// to deleting the key, and reading an absent key returns it.
///
/// [`update`]: SparseMerkleTree::update
/// [`delete`]: SparseMerkleTree::delete
/// [`get_from_root`]: SparseMerkleTree::get_from_root
/// [`remove_path`]: SparseMerkleTree::remove_path
/// [`remove_path_for_root`]: SparseMerkleTree::remove_path_for_root
#[derive(Debug)]
pub struct SparseMerkleTree<N, V, H = Sha256> {
    pub(crate) th: TreeHasher<H>,
    pub(crate) nodes: N,
    pub(crate) values: V,
    root: Vec<u8>,
}

impl<N, V, H> SparseMerkleTree<N, V, H>
where
    N: MapStore,
    V: MapStore,
    H: Digest,
{
    /// Creates a new tree on empty stores. The root starts out as the
    /// placeholder.
    pub fn new(nodes: N, values: V) -> Self {
        let th = TreeHasher::new();
        let root = th.placeholder().to_vec();
        Self {
            th,
            nodes,
            values,
            root,
        }
    }

    /// Resumes a tree from non-empty stores and a previously obtained
    /// root.
    pub fn import(nodes: N, values: V, root: Vec<u8>) -> Self {
        Self {
            th: TreeHasher::new(),
            nodes,
            values,
            root,
        }
    }

    /// The current root digest.
    pub fn root(&self) -> &[u8] {
        &self.root
    }

    /// Repoints the tree at another root.
    pub fn set_root(&mut self, root: Vec<u8>) {
        self.root = root;
    }

    /// The node store.
    pub fn nodes(&self) -> &N {
        &self.nodes
    }

    /// The value store.
    pub fn values(&self) -> &V {
        &self.values
    }

    fn depth(&self) -> usize {
        self.th.depth()
    }

    /// Gets the value of a key, or the default (empty) value if the key
    /// holds none.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, TreeError> {
        self.get_from_root(key, &self.root)
    }

    /// Gets the value of a key as of the given root.
    ///
    /// A descent that runs into an address missing from the node store
    /// reads as "absent" and yields the default value; any other store
    /// failure is surfaced.
    pub fn get_from_root(&self, key: &[u8], root: &[u8]) -> Result<Vec<u8>, TreeError> {
        if root == self.th.placeholder() {
            // The tree is empty.
            return Ok(Vec::new());
        }

        let path = self.th.path(key);
        let traversal = match self.side_nodes_for_root(&path, root, false) {
            Ok(traversal) => traversal,
            Err(TreeError::Store(StoreError::InvalidKey(_))) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let Some(leaf_data) = &traversal.leaf_data else {
            return Ok(Vec::new());
        };

        let (leaf_path, value_hash) = self.th.parse_leaf(leaf_data)?;
        if leaf_path != path.as_slice() {
            // The slot is occupied by a different key's leaf.
            return Ok(Vec::new());
        }
        Ok(self.values.get(&self.th.value_key(leaf_path, value_hash))?)
    }

    /// Returns whether the key holds a non-default value.
    pub fn has(&self, key: &[u8]) -> Result<bool, TreeError> {
        Ok(!self.get(key)?.is_empty())
    }

    /// Sets a new value for a key, installs the new root, and returns it.
    ///
    /// An empty `value` deletes the key.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<Vec<u8>, TreeError> {
        let root = self.root.clone();
        let new_root = self.update_for_root(key, value, &root)?;
        self.root.clone_from(&new_root);
        Ok(new_root)
    }

    /// Deletes a key, installs the new root, and returns it. Deleting an
    /// absent key is a no-op that returns the old root.
    pub fn delete(&mut self, key: &[u8]) -> Result<Vec<u8>, TreeError> {
        self.update(key, &[])
    }

    /// Sets a new value for a key against a specific root and returns
    /// the resulting root. The tree's own root field is left untouched.
    pub fn update_for_root(
        &self,
        key: &[u8],
        value: &[u8],
        root: &[u8],
    ) -> Result<Vec<u8>, TreeError> {
        let path = self.th.path(key);
        let traversal = self.side_nodes_for_root(&path, root, false)?;

        if value.is_empty() {
            // Delete operation.
            match self.delete_with_side_nodes(&path, &traversal)? {
                Some(new_root) => Ok(new_root),
                // The key was already empty; hand the old root back.
                None => Ok(root.to_vec()),
            }
        } else {
            self.update_with_side_nodes(&path, value, &traversal, root)
        }
    }

    /// Deletes a key against a specific root and returns the resulting
    /// root. The tree's own root field is left untouched.
    pub fn delete_for_root(&self, key: &[u8], root: &[u8]) -> Result<Vec<u8>, TreeError> {
        self.update_for_root(key, &[], root)
    }

    /// Generates a Merkle proof for a key against the current root.
    ///
    /// Suitable for read-only verification. For proofs that must stay
    /// verifiable while computing the root after a proposed write, see
    /// [`prove_updatable`](SparseMerkleTree::prove_updatable).
    pub fn prove(&self, key: &[u8]) -> Result<SparseMerkleProof, TreeError> {
        self.prove_for_root(key, &self.root)
    }

    /// Generates a Merkle proof for a key against a specific root.
    pub fn prove_for_root(&self, key: &[u8], root: &[u8]) -> Result<SparseMerkleProof, TreeError> {
        self.do_prove_for_root(key, root, false)
    }

    /// Generates an updatable Merkle proof for a key against the current
    /// root. The proof additionally carries the encoding of the deepest
    /// sibling, which lets a verifier compute the root that would result
    /// from writing the key.
    pub fn prove_updatable(&self, key: &[u8]) -> Result<SparseMerkleProof, TreeError> {
        self.prove_updatable_for_root(key, &self.root)
    }

    /// Generates an updatable Merkle proof for a key against a specific
    /// root.
    pub fn prove_updatable_for_root(
        &self,
        key: &[u8],
        root: &[u8],
    ) -> Result<SparseMerkleProof, TreeError> {
        self.do_prove_for_root(key, root, true)
    }

    /// Generates a compacted Merkle proof for a key against the current
    /// root.
    pub fn prove_compact(&self, key: &[u8]) -> Result<SparseCompactMerkleProof, TreeError> {
        self.prove_compact_for_root(key, &self.root)
    }

    /// Generates a compacted Merkle proof for a key against a specific
    /// root.
    pub fn prove_compact_for_root(
        &self,
        key: &[u8],
        root: &[u8],
    ) -> Result<SparseCompactMerkleProof, TreeError> {
        let proof = self.prove_for_root(key, root)?;
        Ok(compact_proof::<H>(&proof)?)
    }

    fn do_prove_for_root(
        &self,
        key: &[u8],
        root: &[u8],
        is_updatable: bool,
    ) -> Result<SparseMerkleProof, TreeError> {
        let path = self.th.path(key);
        let traversal = self.side_nodes_for_root(&path, root, is_updatable)?;

        // A non-membership query whose slot is occupied by a different
        // key's leaf must present that leaf.
        let mut non_membership_leaf_data = None;
        if traversal.path_nodes[0] != self.th.placeholder() {
            if let Some(leaf_data) = &traversal.leaf_data {
                let (leaf_path, _) = self.th.parse_leaf(leaf_data)?;
                if leaf_path != path.as_slice() {
                    non_membership_leaf_data = Some(leaf_data.clone());
                }
            }
        }

        Ok(SparseMerkleProof {
            side_nodes: traversal.side_nodes,
            non_membership_leaf_data,
            sibling_data: traversal.sibling_data,
        })
    }

    /// Walks the tree from `root` down `path`, collecting per level the
    /// sibling digest and the selected-child digest. The walk stops at a
    /// placeholder (empty slot) or at a leaf, so the returned lists are
    /// usually much shorter than the conceptual depth. Both lists are
    /// reversed before returning, putting index 0 at the bottom.
    pub(crate) fn side_nodes_for_root(
        &self,
        path: &[u8],
        root: &[u8],
        want_sibling_data: bool,
    ) -> Result<Traversal, TreeError> {
        let depth = self.depth();
        let mut side_nodes: Vec<Vec<u8>> = Vec::new();
        let mut path_nodes: Vec<Vec<u8>> = Vec::with_capacity(depth / 8);
        path_nodes.push(root.to_vec());

        if root == self.th.placeholder() {
            // An empty subtree has no sidenodes.
            return Ok(Traversal {
                side_nodes,
                path_nodes,
                leaf_data: None,
                sibling_data: None,
            });
        }

        let mut current_data = self.nodes.get(root)?;
        if self.th.is_leaf(&current_data) {
            // The root references a leaf directly.
            return Ok(Traversal {
                side_nodes,
                path_nodes,
                leaf_data: Some(current_data),
                sibling_data: None,
            });
        }

        let mut leaf_data = None;
        for i in 0..depth {
            let (side_node, node_hash) = {
                let (left, right) = self.th.parse_node(&current_data)?;
                if bits::get_bit_msb(path, i) == bits::RIGHT {
                    (left.to_vec(), right.to_vec())
                } else {
                    (right.to_vec(), left.to_vec())
                }
            };
            side_nodes.push(side_node);
            path_nodes.push(node_hash.clone());

            if node_hash == self.th.placeholder() {
                // Reached an empty slot.
                break;
            }
            current_data = self.nodes.get(&node_hash)?;
            if self.th.is_leaf(&current_data) {
                leaf_data = Some(current_data);
                break;
            }
        }

        // The placeholder has no stored encoding to fetch.
        let sibling_data = match side_nodes.last() {
            Some(deepest) if want_sibling_data && deepest != self.th.placeholder() => {
                Some(self.nodes.get(deepest)?)
            }
            _ => None,
        };

        side_nodes.reverse();
        path_nodes.reverse();
        Ok(Traversal {
            side_nodes,
            path_nodes,
            leaf_data,
            sibling_data,
        })
    }

    /// Inserts or updates a leaf using the collected sidenodes, writing
    /// the new spine bottom-up, and returns the new root.
    fn update_with_side_nodes(
        &self,
        path: &[u8],
        value: &[u8],
        traversal: &Traversal,
        root: &[u8],
    ) -> Result<Vec<u8>, TreeError> {
        let depth = self.depth();

        let value_hash = self.th.digest(value);
        let (leaf_hash, leaf_data) = self.th.digest_leaf(path, &value_hash);
        self.nodes.put(&leaf_hash, &leaf_data)?;
        self.values
            .put(&self.th.value_key(path, &value_hash), value)?;

        let mut current = leaf_hash;

        // If the sidenodes lead to a leaf with a different path, the new
        // leaf and that leaf must first be joined under an intermediate
        // node at the height where their paths diverge.
        let mut common_prefix = depth;
        let mut old_value_hash: Option<Vec<u8>> = None;
        if let Some(leaf_data) = &traversal.leaf_data {
            let (leaf_path, leaf_value_hash) = self.th.parse_leaf(leaf_data)?;
            common_prefix = bits::count_common_prefix(path, leaf_path);
            old_value_hash = Some(leaf_value_hash.to_vec());
        }

        if common_prefix != depth {
            let (node_hash, node_data) = if bits::get_bit_msb(path, common_prefix) == bits::RIGHT {
                self.th.digest_node(&traversal.path_nodes[0], &current)
            } else {
                self.th.digest_node(&current, &traversal.path_nodes[0])
            };
            self.nodes.put(&node_hash, &node_data)?;
            current = node_hash;
        } else if let Some(old_value_hash) = &old_value_hash {
            if *old_value_hash == value_hash {
                // The exact same mapping is already in place.
                return Ok(root.to_vec());
            }
        }

        // Index into side_nodes for level i is i - offset; levels below
        // the recorded sidenodes either get a placeholder sibling (when
        // they lie between the divergence point and the bottom) or no
        // node at all.
        let offset = depth - traversal.side_nodes.len();
        for i in 0..depth {
            let side_node: &[u8] = if i < offset {
                if common_prefix != depth && common_prefix > depth - 1 - i {
                    self.th.placeholder()
                } else {
                    continue;
                }
            } else {
                traversal.side_nodes[i - offset].as_slice()
            };

            let (node_hash, node_data) = if bits::get_bit_msb(path, depth - 1 - i) == bits::RIGHT {
                self.th.digest_node(side_node, &current)
            } else {
                self.th.digest_node(&current, side_node)
            };
            self.nodes.put(&node_hash, &node_data)?;
            current = node_hash;
        }

        Ok(current)
    }

    /// Removes a leaf using the collected sidenodes and returns the new
    /// root, or `None` when the key was already empty.
    ///
    /// The deepest sibling that is itself a leaf takes the removed
    /// leaf's place and bubbles up past any chain of placeholder
    /// siblings; combining resumes at the first non-placeholder sibling
    /// above it. This is what keeps the stored tree free of
    /// placeholder-placeholder internal nodes after deletions.
    fn delete_with_side_nodes(
        &self,
        path: &[u8],
        traversal: &Traversal,
    ) -> Result<Option<Vec<u8>>, TreeError> {
        if traversal.path_nodes[0] == self.th.placeholder() {
            // The terminus is an empty slot.
            return Ok(None);
        }
        let Some(leaf_data) = &traversal.leaf_data else {
            return Ok(None);
        };
        let (leaf_path, _) = self.th.parse_leaf(leaf_data)?;
        if leaf_path != path {
            // A different key's leaf occupies the terminus.
            return Ok(None);
        }

        let mut current_hash: Option<Vec<u8>> = None;
        let mut current_data: Vec<u8> = Vec::new();
        let mut started = false;
        let mut non_placeholder_reached = false;
        for (i, side_node) in traversal.side_nodes.iter().enumerate() {
            if !started {
                started = true;
                let side_node_data = self.nodes.get(side_node)?;
                if self.th.is_leaf(&side_node_data) {
                    // The leaf sibling bubbles up into the removed slot.
                    current_hash = Some(side_node.clone());
                    current_data.clone_from(side_node);
                    continue;
                }
                // A subtree sibling stays put and the removed slot
                // becomes a placeholder.
                current_data = self.th.placeholder().to_vec();
                non_placeholder_reached = true;
            }

            if !non_placeholder_reached && side_node == self.th.placeholder() {
                // Keep bubbling past empty siblings.
                continue;
            }
            non_placeholder_reached = true;

            let bit_index = traversal.side_nodes.len() - 1 - i;
            let (node_hash, node_data) = if bits::get_bit_msb(path, bit_index) == bits::RIGHT {
                self.th.digest_node(side_node, &current_data)
            } else {
                self.th.digest_node(&current_data, side_node)
            };
            self.nodes.put(&node_hash, &node_data)?;
            current_data.clone_from(&node_hash);
            current_hash = Some(node_hash);
        }

        // With nothing left to hang onto the spine, the tree is empty.
        Ok(Some(
            current_hash.unwrap_or_else(|| self.th.placeholder().to_vec()),
        ))
    }
}
