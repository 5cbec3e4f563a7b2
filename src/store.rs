//! In-memory key/value store.

use crate::types::Snapshot;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The key/value mapping at the center of the registry.
///
/// Reads (`get`, `get_all`) share the lock and run in parallel; a `set`
/// excludes every other operation on the same store, so a reader sees either
/// the previous or the new value of a key and nothing in between.
///
/// The store does not validate its input. Empty keys and values are accepted;
/// rejecting them is the request surface's job.
#[derive(Default)]
pub struct Store {
    entries: RwLock<HashMap<String, String>>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`. Last write wins.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.entries.write().insert(key, value);
    }

    /// Get the current value for `key`, or `None` if it was never set.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Whether `key` has ever been set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Copy out every key/value pair.
    ///
    /// The returned map is owned by the caller; writes made after the call
    /// returns never show up in it.
    pub fn get_all(&self) -> Snapshot {
        self.entries.read().clone()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
