//! services/client/src/adapters/memory_storage.rs
//!
//! An in-process implementation of the `DurableStorage` port. Nothing survives a
//! restart; used for ephemeral sessions and in tests.

use habit_tracker_core::ports::{DurableStorage, PortResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A `DurableStorage` adapter backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates a new, empty `MemoryStorage`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().remove(key))
    }
}
