use std::collections::HashMap;

use anyhow::Result;

use super::Storage;

/// Process-lifetime storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    #[cfg(test)]
    pub fn with_item(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut storage = Self::default();
        storage.items.insert(key.into(), value.into());
        storage
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}
