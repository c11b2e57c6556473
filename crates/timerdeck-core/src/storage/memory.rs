use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::PersistentStore;
use crate::error::StorageError;

/// In-memory store for tests and ephemeral sessions.
///
/// `fail_writes` turns every `set` into a backend error, for exercising the
/// best-effort durability contract: in-memory state must keep advancing and
/// the next successful write reconciles.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current stored value, for assertions.
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("store poisoned").get(key).cloned()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().expect("store poisoned").get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "injected write failure for key '{key}'"
            )));
        }
        self.entries
            .lock()
            .expect("store poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
