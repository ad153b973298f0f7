use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A map of async mutexes, one per key.
///
/// Work under different keys never waits on each other.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks.entry(key.to_owned()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the entry of `key` unless a task holds or waits for it
    pub fn forget(&self, key: &str) {
        let mut locks = self.locks.lock().unwrap();
        if let Entry::Occupied(o) = locks.entry(key.to_owned()) {
            if Arc::strong_count(o.get()) == 1 {
                o.remove();
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
