use std::collections::HashMap;

use parking_lot::RwLock;

use super::{KvStore, StoreResult};

/// In-process store. State vanishes with the process; useful for tests and
/// for hosts that snapshot through their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
