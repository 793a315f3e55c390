//! Session persistence for per-tenant UI state.
//!
//! Values are JSON strings stored under a [`SessionKey`] built from a feature
//! name and a tenant id, so two tenants (or two features) never share state.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod web;

pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use web::WebSessionStorage;

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Key of one persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub feature: String,
    pub tenant: String,
}

impl SessionKey {
    pub fn new(feature: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            tenant: tenant.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.feature, self.tenant)
    }
}

/// Trait for session storage backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait SessionStorage: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn read(&self, key: &SessionKey) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing what was there.
    fn write(&self, key: &SessionKey, value: &str) -> StorageResult<()>;

    /// Forget `key`. Removing a missing key is not an error.
    fn remove(&self, key: &SessionKey) -> StorageResult<()>;
}

/// Trait for session storage backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait SessionStorage {
    /// Read the raw value stored under `key`, if any.
    fn read(&self, key: &SessionKey) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing what was there.
    fn write(&self, key: &SessionKey, value: &str) -> StorageResult<()>;

    /// Forget `key`. Removing a missing key is not an error.
    fn remove(&self, key: &SessionKey) -> StorageResult<()>;
}

/// Load a snapshot, falling back to `T::default()` when it is absent,
/// unreadable or does not parse.
pub fn load_snapshot<T, S>(storage: &S, key: &SessionKey) -> T
where
    T: DeserializeOwned + Default,
    S: SessionStorage + ?Sized,
{
    match storage.read(key) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Discarding corrupt session state for {}: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Failed to read session state for {}: {}", key, e);
            T::default()
        }
    }
}

/// Serialize and store a snapshot.
pub fn save_snapshot<T, S>(storage: &S, key: &SessionKey, snapshot: &T) -> StorageResult<()>
where
    T: Serialize,
    S: SessionStorage + ?Sized,
{
    let json = serde_json::to_string(snapshot).map_err(|e| StorageError::Serialization(e.to_string()))?;
    storage.write(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    struct Broken;

    impl SessionStorage for Broken {
        fn read(&self, _key: &SessionKey) -> StorageResult<Option<String>> {
            Err(StorageError::Other("unavailable".to_string()))
        }

        fn write(&self, _key: &SessionKey, _value: &str) -> StorageResult<()> {
            Err(StorageError::Other("unavailable".to_string()))
        }

        fn remove(&self, _key: &SessionKey) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(SessionKey::new("hotspot-history", "acme").to_string(), "hotspot-history:acme");
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let storage = MemoryStorage::new();
        let key = SessionKey::new("f", "t");
        save_snapshot(&storage, &key, &Counter { value: 3 }).unwrap();
        assert_eq!(load_snapshot::<Counter, _>(&storage, &key), Counter { value: 3 });
    }

    #[test]
    fn test_absent_and_corrupt_fall_back_to_default() {
        let storage = MemoryStorage::new();
        let key = SessionKey::new("f", "t");
        assert_eq!(load_snapshot::<Counter, _>(&storage, &key), Counter::default());

        storage.write(&key, "{\"value\": \"three\"").unwrap();
        assert_eq!(load_snapshot::<Counter, _>(&storage, &key), Counter::default());
    }

    #[test]
    fn test_read_error_falls_back_to_default() {
        let key = SessionKey::new("f", "t");
        assert_eq!(load_snapshot::<Counter, _>(&Broken, &key), Counter::default());
        assert!(save_snapshot(&Broken, &key, &Counter::default()).is_err());
    }
}
