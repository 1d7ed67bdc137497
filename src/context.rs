/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Execution context of a keeper call: the store it reads and writes, the gas meter it charges,
//! the block it runs in, and the events it emits.
//!
//! A context is cheap to clone and clones share everything. [Context::cache_context] is the way to
//! get an isolated branch whose writes and events reach the parent only through [CacheWrite::write].

use std::sync::{Arc, Mutex, PoisonError};

use crate::gas::GasMeter;
use crate::store::{lock, CacheStore, SharedStore};
use crate::types::{BlockInfo, Event};

/// Event type emitted for every message by the ledger's message handlers.
pub const EVENT_TYPE_MESSAGE: &str = "message";

/// EventManager collects the events emitted during one context's lifetime.
#[derive(Clone, Debug, Default)]
pub struct EventManager {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: Event) {
        self.lock().push(event);
    }

    pub fn emit_events(&self, events: impl IntoIterator<Item = Event>) {
        self.lock().extend(events);
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct Context {
    store: SharedStore,
    gas_meter: GasMeter,
    block: BlockInfo,
    event_manager: EventManager,
    /// Smart queries in progress on the way to this context.
    query_depth: u32,
    /// Rounds of contract message dispatch on the way to this context.
    dispatch_depth: u32,
}

impl Context {
    pub fn new(store: SharedStore, block: BlockInfo, gas_meter: GasMeter) -> Self {
        Self {
            store,
            gas_meter,
            block,
            event_manager: EventManager::new(),
            query_depth: 0,
            dispatch_depth: 0,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    pub fn block(&self) -> &BlockInfo {
        &self.block
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.event_manager
    }

    pub fn query_depth(&self) -> u32 {
        self.query_depth
    }

    pub fn dispatch_depth(&self) -> u32 {
        self.dispatch_depth
    }

    pub fn store_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        lock(&self.store).get(key)
    }

    pub fn store_set(&self, key: &[u8], value: &[u8]) {
        lock(&self.store).set(key, value)
    }

    pub fn store_delete(&self, key: &[u8]) {
        lock(&self.store).delete(key)
    }

    pub fn store_prefix_entries(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        lock(&self.store).prefix_entries(prefix)
    }

    /// with_gas_meter returns a context that charges `gas_meter` instead.
    pub fn with_gas_meter(&self, gas_meter: GasMeter) -> Self {
        Self {
            gas_meter,
            ..self.clone()
        }
    }

    pub fn with_query_depth(&self, query_depth: u32) -> Self {
        Self {
            query_depth,
            ..self.clone()
        }
    }

    pub fn with_dispatch_depth(&self, dispatch_depth: u32) -> Self {
        Self {
            dispatch_depth,
            ..self.clone()
        }
    }

    /// with_event_manager returns a context whose events go to `event_manager` instead.
    pub fn with_event_manager(&self, event_manager: EventManager) -> Self {
        Self {
            event_manager,
            ..self.clone()
        }
    }

    /// cache_context branches the store and the event manager. The gas meter stays shared, so gas
    /// spent in a discarded branch is still paid for.
    pub fn cache_context(&self) -> (Context, CacheWrite) {
        let cache = Arc::new(Mutex::new(CacheStore::new(self.store.clone())));
        let store: SharedStore = cache.clone();
        let branch = Context {
            store,
            gas_meter: self.gas_meter.clone(),
            block: self.block.clone(),
            event_manager: EventManager::new(),
            query_depth: self.query_depth,
            dispatch_depth: self.dispatch_depth,
        };
        let write = CacheWrite {
            cache,
            events: branch.event_manager.clone(),
            parent_events: self.event_manager.clone(),
        };
        (branch, write)
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Context::new(
            crate::store::shared(crate::store::MemoryStore::new()),
            BlockInfo {
                height: 1,
                time: 1_600_000_000_000_000_000,
                chain_id: "testing".to_string(),
            },
            GasMeter::infinite(),
        )
    }
}

/// CacheWrite commits a branch created by [Context::cache_context]. Dropping it discards the branch.
pub struct CacheWrite {
    cache: Arc<Mutex<CacheStore>>,
    events: EventManager,
    parent_events: EventManager,
}

impl CacheWrite {
    pub fn write(self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write();
        self.parent_events.emit_events(self.events.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_is_invisible_until_written() {
        let ctx = Context::for_tests();
        ctx.store_set(b"k", b"v0");

        let (branch, write) = ctx.cache_context();
        branch.store_set(b"k", b"v1");
        branch.event_manager().emit(Event::new("changed"));
        assert_eq!(ctx.store_get(b"k"), Some(b"v0".to_vec()));
        assert!(ctx.event_manager().events().is_empty());

        write.write();
        assert_eq!(ctx.store_get(b"k"), Some(b"v1".to_vec()));
        assert_eq!(ctx.event_manager().events(), vec![Event::new("changed")]);
    }

    #[test]
    fn dropped_branch_is_discarded_but_gas_is_kept() {
        let ctx = Context::for_tests().with_gas_meter(GasMeter::new(1_000));
        {
            let (branch, _write) = ctx.cache_context();
            branch.store_set(b"k", b"v");
            branch.gas_meter().consume_gas(10, "work");
        }
        assert_eq!(ctx.store_get(b"k"), None);
        assert_eq!(ctx.gas_meter().consumed(), 10);
    }

    #[test]
    fn branches_keep_the_call_depths() {
        let ctx = Context::for_tests()
            .with_query_depth(3)
            .with_dispatch_depth(2);
        let (branch, _write) = ctx.cache_context();
        assert_eq!(branch.query_depth(), 3);
        assert_eq!(branch.dispatch_depth(), 2);

        let metered = branch.with_gas_meter(GasMeter::new(10));
        assert_eq!(metered.query_depth(), 3);
        assert_eq!(Context::for_tests().dispatch_depth(), 0);
    }
}
