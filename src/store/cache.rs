/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a cache layer on top of a parent store.
//!
//! In Read Operation, pending `writes` are looked up first and the parent is only consulted on a
//! miss. Deletions are pending writes too (`None`), so a deleted key stays deleted even though the
//! parent still holds it.
//!
//! If the enclosing operation succeeds, [CacheStore::write] flushes `writes` into the parent in
//! key order. Otherwise the layer is dropped and the parent is untouched.

use std::collections::BTreeMap;

use super::{lock, KvStore, SharedStore};

pub struct CacheStore {
    parent: SharedStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl CacheStore {
    pub fn new(parent: SharedStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// write flushes pending writes to the parent and empties the layer.
    pub fn write(&mut self) {
        let writes = std::mem::take(&mut self.writes);
        let mut parent = lock(&self.parent);
        for (key, value) in writes {
            match value {
                Some(value) => parent.set(&key, &value),
                None => parent.delete(&key),
            }
        }
    }

    /// discard drops pending writes.
    pub fn discard(&mut self) {
        self.writes.clear();
    }
}

impl KvStore for CacheStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(pending) => pending.clone(),
            None => lock(&self.parent).get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn prefix_entries(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = lock(&self.parent)
            .prefix_entries(prefix)
            .into_iter()
            .collect();
        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }
}
