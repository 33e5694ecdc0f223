//! Level-order textual dump of a subtree, for debugging and tests.

use std::fmt::Write;

use digest::Digest;

use crate::traits::MapStore;
use crate::tree::{SparseMerkleTree, TreeError};

impl<N, V, H> SparseMerkleTree<N, V, H>
where
    N: MapStore,
    V: MapStore,
    H: Digest,
{
    /// Renders the subtree under `root` one level per line.
    ///
    /// Leaves show their raw value (lossy UTF-8), internal nodes an
    /// abbreviated digest, empty slots `nil`. Nodes whose encoding has
    /// been retracted from the store render as `missing` instead of
    /// failing, so a partially retracted version can still be inspected.
    pub fn dump(&self, root: &[u8]) -> Result<String, TreeError> {
        let mut out = String::new();
        let _ = writeln!(out, "root {}", hex::encode(root));
        if root == self.th.placeholder() {
            out.push_str("(empty)\n");
            return Ok(out);
        }

        let root_data = self.nodes.get(root)?;
        let mut level = 1usize;
        let _ = write!(out, "level {level}: ");
        let mut current: Vec<Vec<u8>> = Vec::new();
        if self.th.is_leaf(&root_data) {
            self.render_leaf(&mut out, &root_data);
            out.push('\n');
            return Ok(out);
        }
        let _ = write!(out, "node {}", self.abbrev(root));
        out.push('\n');
        current.push(root_data);

        while !current.is_empty() {
            level += 1;
            let _ = write!(out, "level {level}: ");
            let mut next: Vec<Vec<u8>> = Vec::new();
            for data in &current {
                let (left, right) = self.th.parse_node(data)?;
                out.push('(');
                self.render_child(&mut out, left, &mut next);
                out.push_str(", ");
                self.render_child(&mut out, right, &mut next);
                out.push_str(") ");
            }
            out.push('\n');
            current = next;
        }
        Ok(out)
    }

    fn render_child(&self, out: &mut String, child: &[u8], next: &mut Vec<Vec<u8>>) {
        if child == self.th.placeholder() {
            out.push_str("nil");
            return;
        }
        match self.nodes.get(child) {
            Err(_) => out.push_str("missing"),
            Ok(data) if self.th.is_leaf(&data) => self.render_leaf(out, &data),
            Ok(data) => {
                let _ = write!(out, "node {}", self.abbrev(child));
                next.push(data);
            }
        }
    }

    fn render_leaf(&self, out: &mut String, leaf_data: &[u8]) {
        match self
            .th
            .parse_leaf(leaf_data)
            .ok()
            .and_then(|(path, value_hash)| self.values.get(&self.th.value_key(path, value_hash)).ok())
        {
            Some(value) => {
                let _ = write!(out, "leaf \"{}\"", String::from_utf8_lossy(&value));
            }
            None => out.push_str("leaf <no value>"),
        }
    }

    fn abbrev(&self, digest: &[u8]) -> String {
        let mut s = hex::encode(digest);
        s.truncate(8);
        s
    }
}

#[cfg(test)]
mod tests {
    use crate::mem_store::MemStore;
    use crate::tree::SparseMerkleTree;

    #[test]
    fn dump_of_an_empty_tree() {
        let tree: SparseMerkleTree<MemStore, MemStore> =
            SparseMerkleTree::new(MemStore::new(), MemStore::new());
        let out = tree.dump(tree.root()).unwrap();
        assert!(out.contains("(empty)"));
    }

    #[test]
    fn dump_shows_leaves_and_levels() {
        let mut tree: SparseMerkleTree<MemStore, MemStore> =
            SparseMerkleTree::new(MemStore::new(), MemStore::new());
        tree.update(b"foo", b"bar").unwrap();
        tree.update(b"baz", b"qux").unwrap();

        let out = tree.dump(tree.root()).unwrap();
        assert!(out.contains("leaf \"bar\""));
        assert!(out.contains("leaf \"qux\""));
        assert!(out.contains("level 2"));
    }
}
