//! Per-item locking for install operations
//!
//! Each item id gets its own async mutex so that the fetch, write, and ledger steps
//! for one id never interleave with another operation on the same id, while
//! operations on different ids proceed concurrently. An id's entry is dropped once
//! nobody holds or waits on it.

use crate::types::ItemId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock registry keyed by item id.
pub struct ItemLocks {
    /// Map from id to that id's mutex; entries live while in use
    locks: RwLock<HashMap<ItemId, Arc<Mutex<()>>>>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: &ItemId) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(id) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Another task may have inserted it between the two locks.
        map.entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `id`. Held until the guard is dropped.
    pub async fn acquire(&self, id: &ItemId) -> ItemGuard<'_> {
        let guard = self.lock_for(id).lock_owned().await;
        ItemGuard {
            locks: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of ids currently tracked.
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }

    fn release(&self, id: &ItemId) {
        let mut map = self.locks.write();
        // The map's own reference is the only one left: no holder, no waiter.
        if map.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(id);
        }
    }
}

/// Exclusive access to one id. Releasing it forgets the id if no one else wants it.
pub struct ItemGuard<'a> {
    locks: &'a ItemLocks,
    id: ItemId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ItemGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.id);
    }
}

impl Default for ItemLocks {
    fn default() -> Self {
        Self::new()
    }
}
