/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Key-value storage seen by the keeper.
//!
//! - [MemoryStore] is a plain ordered map, used as the committed backing store in tests and tools.
//! - [CacheStore] buffers writes over a parent and flushes them only on [CacheStore::write]. This is
//!   how a failed message leaves no trace.
//! - [PrefixStore] confines a handle to the keys under one prefix. Each contract gets one over its
//!   own namespace and can not name keys outside it.
//!
//! Stores are shared as [SharedStore] so that a contract call, the host functions it invokes,
//! and nested queries all see the same pending writes.

pub mod cache;
pub use cache::*;

pub mod memory;
pub use memory::*;

pub mod prefix;
pub use prefix::*;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// KvStore is an ordered byte-keyed map.
pub trait KvStore: Send {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    fn set(&mut self, key: &[u8], value: &[u8]);

    fn delete(&mut self, key: &[u8]);

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_entries(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

pub type SharedStore = Arc<Mutex<dyn KvStore>>;

pub fn shared<S: KvStore + 'static>(store: S) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// lock a shared store. A poisoned lock is still usable: every write is a single map update, so a
/// panic can not leave a store half-written.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, dyn KvStore + 'static> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
