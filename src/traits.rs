//! Storage traits backing the tree's node and value stores.

use std::fmt::Debug;

use thiserror::Error;

/// Error type for [`MapStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed key is not present in the store.
    #[error("invalid key: {}", hex::encode(.0))]
    InvalidKey(Vec<u8>),
    /// Any other backing-store failure (I/O, corruption).
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// A byte-keyed, byte-valued map.
///
/// The tree keeps encoded nodes and raw values in two `MapStore`
/// instances. [`get`] and [`delete`] of an absent key must fail with
/// [`StoreError::InvalidKey`]; the tree relies on that distinguished
/// error to recognize missing entries.
///
/// Methods take `&self`: implementations provide their own interior
/// mutability (and thread safety, if shared across threads).
///
/// A store used as the tree's **value store** must additionally maintain
/// per-key reference counts: `put` of an existing key increments its
/// counter and `delete` decrements it, removing the entry only at zero.
/// That is what lets a `(path, value)` pair written by several live
/// versions survive the retraction of any one of them.
///
/// [`get`]: MapStore::get
/// [`delete`]: MapStore::delete
pub trait MapStore: Debug {
    /// Gets the value for a key.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Updates the value for a key.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Returns whether the key is present.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Deletes a key.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Releases the store's resources.
    fn close(&self) -> Result<(), StoreError>;
}
