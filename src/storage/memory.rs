use std::collections::HashMap;

use parking_lot::RwLock;

use super::{KeyValueStore, StorageResult};

/// In-process store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.docs.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.docs.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn put_all(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        let mut docs = self.docs.write();
        for (key, value) in entries {
            docs.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
