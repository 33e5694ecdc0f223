//! Reference-counting in-memory storage backend.
//!
//! [`MemStore`] is a simple [`MapStore`] over a [`HashMap`] guarded by a
//! [`RwLock`]. Every entry carries a reference count: [`put`] of an
//! existing key increments it, [`delete`] decrements it and removes the
//! entry only when the count reaches zero.
//!
//! The tree uses one `MemStore` for encoded nodes and one for raw
//! values. Counting matters for both: a value (or a node) recreated by a
//! later version must survive the retraction of the version that first
//! wrote it.
//!
//! `MemStore` is intended for tests, development, and as a reference
//! implementation of the storage trait; a persistent deployment would
//! put a database-backed [`MapStore`] in its place.
//!
//! [`put`]: MapStore::put
//! [`delete`]: MapStore::delete

use std::collections::HashMap;
use std::sync::RwLock;

use crate::traits::{MapStore, StoreError};

/// A stored value together with its reference count.
#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    refs: u32,
}

/// Reference-counting in-memory [`MapStore`].
///
/// All access goes through a [`RwLock`], so a single `MemStore` may back
/// several tree instances used from different threads.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: RwLock<HashMap<Vec<u8>, Entry>>,
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries.read().expect("store lock poisoned").clone()),
        }
    }
}

impl MemStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("store lock poisoned").len()
    }

    /// Returns whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MapStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .expect("store lock poisoned")
            .get(key)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| StoreError::InvalidKey(key.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().expect("store lock poisoned");
        entries
            .entry(key.to_vec())
            .and_modify(|entry| {
                entry.data = value.to_vec();
                entry.refs += 1;
            })
            .or_insert_with(|| Entry {
                data: value.to_vec(),
                refs: 1,
            });
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .read()
            .expect("store lock poisoned")
            .contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().expect("store lock poisoned");
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| StoreError::InvalidKey(key.to_vec()))?;
        entry.refs -= 1;
        if entry.refs == 0 {
            entries.remove(key);
        }
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.entries.write().expect("store lock poisoned").clear();
        Ok(())
    }
}
