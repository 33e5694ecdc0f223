//! Retraction: reclaiming the storage of roots that are no longer
//! wanted.
//!
//! Mutations never delete anything, so retiring a historical version is
//! an explicit operation. [`remove_path`] walks the same key path under
//! the root being retired and under a root to keep, and only deletes
//! nodes the kept root does not reach along that path. Together with the
//! stores' reference counts this lets any number of versions share spine
//! nodes and leaves safely.
//!
//! [`remove_path`]: SparseMerkleTree::remove_path

use digest::Digest;
use rustc_hash::FxHashSet;

use crate::traits::MapStore;
use crate::tree::{SparseMerkleTree, TreeError};

impl<N, V, H> SparseMerkleTree<N, V, H>
where
    N: MapStore,
    V: MapStore,
    H: Digest,
{
    /// Removes every node on `key`'s path under `root` from the node
    /// store, and the leaf's value-store entry when the terminus holds
    /// this key's leaf.
    ///
    /// No sharing check is performed: the caller must know that no other
    /// live root reaches these nodes. To retire a version while another
    /// stays live, use [`remove_path`](SparseMerkleTree::remove_path).
    pub fn remove_path_for_root(&self, key: &[u8], root: &[u8]) -> Result<(), TreeError> {
        let path = self.th.path(key);
        let traversal = self.side_nodes_for_root(&path, root, false)?;

        for (i, node) in traversal.path_nodes.iter().enumerate() {
            if i == 0 {
                if let Some(leaf_data) = &traversal.leaf_data {
                    let (leaf_path, value_hash) = self.th.parse_leaf(leaf_data)?;
                    if leaf_path != path.as_slice() {
                        // The terminus belongs to a different key; its
                        // leaf stays.
                        continue;
                    }
                    self.values
                        .delete(&self.th.value_key(leaf_path, value_hash))?;
                }
            }
            if node == self.th.placeholder() {
                continue;
            }
            self.nodes.delete(node)?;
        }
        Ok(())
    }

    /// Removes `key`'s path under `remove_root` while preserving every
    /// node that `keep_root` reaches along the same path.
    ///
    /// Spine nodes and leaves shared between the two roots survive, so
    /// `keep_root` (and anything it shares with still older roots, via
    /// the stores' reference counts) keeps answering queries afterwards.
    ///
    /// The two roots are not checked for distinctness; passing the same
    /// root twice degenerates to a no-op, since every node on the path
    /// lands in the keep set.
    pub fn remove_path(
        &self,
        key: &[u8],
        remove_root: &[u8],
        keep_root: &[u8],
    ) -> Result<(), TreeError> {
        let path = self.th.path(key);
        let traversal = self.side_nodes_for_root(&path, remove_root, false)?;
        let kept = self.side_nodes_for_root(&path, keep_root, false)?;

        let keep_set: FxHashSet<&[u8]> = kept.path_nodes.iter().map(|n| n.as_slice()).collect();

        for (i, node) in traversal.path_nodes.iter().enumerate() {
            if i == 0 {
                if let Some(leaf_data) = &traversal.leaf_data {
                    let (leaf_path, value_hash) = self.th.parse_leaf(leaf_data)?;
                    if leaf_path != path.as_slice()
                        || keep_set.contains(traversal.path_nodes[0].as_slice())
                    {
                        // Another key's leaf, or a leaf the kept root
                        // still references.
                        continue;
                    }
                    self.values
                        .delete(&self.th.value_key(leaf_path, value_hash))?;
                }
            }
            if node == self.th.placeholder() {
                continue;
            }
            if !keep_set.contains(node.as_slice()) {
                self.nodes.delete(node)?;
            }
        }
        Ok(())
    }

    /// Bulk retraction of several keys' paths under one root.
    ///
    /// Spine nodes shared between the keys' paths are deduplicated and
    /// deleted once, in a second pass. Matching leaves and their values
    /// are removed unconditionally, so this is only safe when the caller
    /// knows no other live root references any of these paths.
    pub fn remove_paths_for_root<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        root: &[u8],
    ) -> Result<(), TreeError> {
        let mut seen: FxHashSet<Vec<u8>> = FxHashSet::default();
        let mut spine_nodes: Vec<Vec<u8>> = Vec::new();

        for key in keys {
            let path = self.th.path(key.as_ref());
            let traversal = self.side_nodes_for_root(&path, root, false)?;

            if let Some(leaf_data) = &traversal.leaf_data {
                let (leaf_path, value_hash) = self.th.parse_leaf(leaf_data)?;
                if leaf_path == path.as_slice() {
                    self.values
                        .delete(&self.th.value_key(leaf_path, value_hash))?;
                    self.nodes.delete(&traversal.path_nodes[0])?;
                }
            }

            // Index 0 is the terminus, handled above; the rest are
            // internal spine nodes, collected for a deduplicated sweep.
            for node in traversal.path_nodes.iter().skip(1) {
                if node == self.th.placeholder() {
                    continue;
                }
                if seen.insert(node.clone()) {
                    spine_nodes.push(node.clone());
                }
            }
        }

        for node in &spine_nodes {
            self.nodes.delete(node)?;
        }
        Ok(())
    }
}
