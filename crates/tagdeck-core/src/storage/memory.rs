//! In-memory session storage.

use super::{SessionKey, SessionStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and sessions that should not outlive the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &SessionKey) -> StorageResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(entries.get(&key.to_string()).cloned())
    }

    fn write(&self, key: &SessionKey, value: &str) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &SessionKey) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        entries.remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let storage = MemoryStorage::new();
        let key = SessionKey::new("history", "acme");

        storage.write(&key, "{}").unwrap();
        assert_eq!(storage.read(&key).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_missing_key_reads_none() {
        let storage = MemoryStorage::new();
        assert!(storage.read(&SessionKey::new("history", "acme")).unwrap().is_none());
    }

    #[test]
    fn test_tenants_are_isolated() {
        let storage = MemoryStorage::new();
        storage.write(&SessionKey::new("history", "a"), "1").unwrap();
        storage.write(&SessionKey::new("history", "b"), "2").unwrap();

        assert_eq!(storage.read(&SessionKey::new("history", "a")).unwrap().as_deref(), Some("1"));
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_remove() {
        let storage = MemoryStorage::new();
        let key = SessionKey::new("history", "acme");

        storage.write(&key, "1").unwrap();
        storage.remove(&key).unwrap();
        storage.remove(&key).unwrap();
        assert!(storage.is_empty());
    }
}
