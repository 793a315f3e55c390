//! File-based session storage for native platforms.

use super::{SessionKey, SessionStorage, StorageError, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-based storage for native platforms.
///
/// Stores each snapshot as `<base>/<feature>/<tenant>.json`.
pub struct FileStorage {
    /// Base directory for session state.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/tagdeck/session/`
    /// On Windows: `%LOCALAPPDATA%\tagdeck\session\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("tagdeck").join("session"))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn entry_path(&self, key: &SessionKey) -> PathBuf {
        self.base_path
            .join(sanitize(&key.feature))
            .join(format!("{}.json", sanitize(&key.tenant)))
    }
}

/// Make a key component safe to use as a file name.
fn sanitize(part: &str) -> String {
    let safe: String = part
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if safe.is_empty() { "_".to_string() } else { safe }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &SessionKey) -> StorageResult<Option<String>> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!("Failed to read {}: {}", path.display(), e))),
        }
    }

    fn write(&self, key: &SessionKey, value: &str) -> StorageResult<()> {
        let path = self.entry_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                StorageError::Io(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        fs::write(&path, value).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    fn remove(&self, key: &SessionKey) -> StorageResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))),
        }
    }
}
