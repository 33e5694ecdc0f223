//! Domain-separated digest helpers shared by the tree and proof code.
//!
//! Node encodings are tagged byte blobs: a leaf is
//! `0x00 ‖ path ‖ value_hash`, an internal node is `0x01 ‖ left ‖ right`.
//! The tag byte keeps the two domains from colliding. The placeholder,
//! the all-zero digest, stands for an empty subtree at any depth.

use std::marker::PhantomData;

use digest::Digest;

use crate::tree::TreeError;

/// Tag byte of an encoded leaf node.
pub(crate) const LEAF_PREFIX: u8 = 0x00;
/// Tag byte of an encoded internal node.
pub(crate) const NODE_PREFIX: u8 = 0x01;

/// Hashing helpers parameterized by the tree's digest algorithm.
///
/// Every call constructs a fresh hasher, so a `TreeHasher` holds no
/// mutable state and tree instances can be driven from different threads
/// concurrently.
#[derive(Debug, Clone)]
pub(crate) struct TreeHasher<H> {
    zero: Vec<u8>,
    _hash: PhantomData<H>,
}

impl<H: Digest> Default for TreeHasher<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Digest> TreeHasher<H> {
    pub(crate) fn new() -> Self {
        Self {
            zero: vec![0u8; <H as Digest>::output_size()],
            _hash: PhantomData,
        }
    }

    /// Size in bytes of a path (and of every digest).
    pub(crate) fn path_size(&self) -> usize {
        <H as Digest>::output_size()
    }

    /// Conceptual depth of the tree in bits.
    pub(crate) fn depth(&self) -> usize {
        self.path_size() * 8
    }

    /// The all-zero digest representing an empty subtree.
    pub(crate) fn placeholder(&self) -> &[u8] {
        &self.zero
    }

    pub(crate) fn digest(&self, data: &[u8]) -> Vec<u8> {
        H::digest(data).to_vec()
    }

    /// Derives the fixed-size tree path for a key.
    pub(crate) fn path(&self, key: &[u8]) -> Vec<u8> {
        self.digest(key)
    }

    /// Address of a raw value in the value store: `digest(path ‖ value_hash)`.
    ///
    /// Scoping the address by `path` keeps two distinct keys holding the
    /// same raw value from sharing one slot, which would collapse their
    /// reference counts.
    pub(crate) fn value_key(&self, path: &[u8], value_hash: &[u8]) -> Vec<u8> {
        H::new()
            .chain_update(path)
            .chain_update(value_hash)
            .finalize()
            .to_vec()
    }

    /// Encodes a leaf node and returns `(digest, encoding)`.
    pub(crate) fn digest_leaf(&self, path: &[u8], value_hash: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut encoding = Vec::with_capacity(1 + path.len() + value_hash.len());
        encoding.push(LEAF_PREFIX);
        encoding.extend_from_slice(path);
        encoding.extend_from_slice(value_hash);
        let sum = self.digest(&encoding);
        (sum, encoding)
    }

    /// Encodes an internal node and returns `(digest, encoding)`.
    pub(crate) fn digest_node(&self, left: &[u8], right: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut encoding = Vec::with_capacity(1 + left.len() + right.len());
        encoding.push(NODE_PREFIX);
        encoding.extend_from_slice(left);
        encoding.extend_from_slice(right);
        let sum = self.digest(&encoding);
        (sum, encoding)
    }

    /// Splits a leaf encoding into `(path, value_hash)`.
    pub(crate) fn parse_leaf<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8]), TreeError> {
        if data.len() != 1 + 2 * self.path_size() || data[0] != LEAF_PREFIX {
            return Err(TreeError::MalformedNode {
                len: data.len(),
                tag: data.first().copied().unwrap_or_default(),
            });
        }
        Ok((
            &data[1..1 + self.path_size()],
            &data[1 + self.path_size()..],
        ))
    }

    /// Splits an internal-node encoding into `(left, right)` child digests.
    pub(crate) fn parse_node<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8]), TreeError> {
        if data.len() != 1 + 2 * self.path_size() || data[0] != NODE_PREFIX {
            return Err(TreeError::MalformedNode {
                len: data.len(),
                tag: data.first().copied().unwrap_or_default(),
            });
        }
        Ok((
            &data[1..1 + self.path_size()],
            &data[1 + self.path_size()..],
        ))
    }

    /// Whether an encoding carries the leaf tag.
    pub(crate) fn is_leaf(&self, data: &[u8]) -> bool {
        data.first() == Some(&LEAF_PREFIX)
    }
}
