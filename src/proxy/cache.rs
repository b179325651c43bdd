//! In-memory response cache keyed by resolved origin URL.
//!
//! Every operation takes the same lock, so `get`, `put` and `clear` are each
//! atomic with respect to one another. Nothing is ever evicted: the map grows
//! with every distinct URL fetched for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

/// Cheaply clonable handle to a shared URL -> body map.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored body for `key`, if any. Keys are compared verbatim.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.lock().get(key).cloned()
    }

    /// Inserts `body` under `key`, replacing any earlier body. Returns the
    /// number of entries after the insert.
    pub fn put(&self, key: impl Into<String>, body: Bytes) -> usize {
        let mut guard = self.entries.lock();
        guard.insert(key.into(), body);
        guard.len()
    }

    /// Swaps the map for an empty one.
    pub fn clear(&self) {
        let previous = {
            let mut guard = self.entries.lock();
            std::mem::take(&mut *guard)
        };
        // Drop the old bodies outside the lock.
        drop(previous);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
