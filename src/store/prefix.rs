/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use super::{lock, KvStore, SharedStore};

/// PrefixStore is a cheap, cloneable handle onto the keys of `parent` that start with `prefix`.
/// Keys passed in and handed out are relative to the prefix.
#[derive(Clone)]
pub struct PrefixStore {
    parent: SharedStore,
    prefix: Vec<u8>,
}

impl PrefixStore {
    pub fn new(parent: SharedStore, prefix: Vec<u8>) -> Self {
        Self { parent, prefix }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        [self.prefix.as_slice(), key].concat()
    }

    pub fn read(&self, key: &[u8]) -> Option<Vec<u8>> {
        lock(&self.parent).get(&self.full_key(key))
    }

    pub fn write(&self, key: &[u8], value: &[u8]) {
        lock(&self.parent).set(&self.full_key(key), value)
    }

    pub fn remove(&self, key: &[u8]) {
        lock(&self.parent).delete(&self.full_key(key))
    }

    /// entries returns every entry under the prefix, keys stripped of it.
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries_with(&[])
    }

    fn entries_with(&self, sub_prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let strip = self.prefix.len();
        lock(&self.parent)
            .prefix_entries(&self.full_key(sub_prefix))
            .into_iter()
            .map(|(k, v)| (k[strip..].to_vec(), v))
            .collect()
    }
}

impl KvStore for PrefixStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.read(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.write(key, value)
    }

    fn delete(&mut self, key: &[u8]) {
        self.remove(key)
    }

    fn prefix_entries(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries_with(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{shared, MemoryStore};

    #[test]
    fn namespaces_do_not_overlap() {
        let parent = shared(MemoryStore::new());
        let a = PrefixStore::new(parent.clone(), b"\x05a".to_vec());
        let b = PrefixStore::new(parent.clone(), b"\x05b".to_vec());

        a.write(b"key", b"from a");
        b.write(b"key", b"from b");

        assert_eq!(a.read(b"key"), Some(b"from a".to_vec()));
        assert_eq!(b.read(b"key"), Some(b"from b".to_vec()));
        assert_eq!(a.entries(), vec![(b"key".to_vec(), b"from a".to_vec())]);
        assert_eq!(
            lock(&parent).get(b"\x05akey"),
            Some(b"from a".to_vec())
        );

        a.remove(b"key");
        assert_eq!(a.read(b"key"), None);
        assert_eq!(b.read(b"key"), Some(b"from b".to_vec()));
    }
}
