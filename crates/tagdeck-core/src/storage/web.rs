//! `window.sessionStorage` backend for WASM.

use super::{SessionKey, SessionStorage, StorageError, StorageResult};
use wasm_bindgen::JsValue;

/// Session storage backed by the browser tab's `sessionStorage`.
///
/// State lives as long as the tab, matching the lifetime of a curation session.
#[derive(Default)]
pub struct WebSessionStorage;

impl WebSessionStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self) -> StorageResult<web_sys::Storage> {
        let window = web_sys::window().ok_or_else(|| StorageError::Other("No window".to_string()))?;
        window
            .session_storage()
            .map_err(js_error)?
            .ok_or_else(|| StorageError::Other("sessionStorage unavailable".to_string()))
    }
}

fn js_error(e: JsValue) -> StorageError {
    StorageError::Other(format!("{:?}", e))
}

impl SessionStorage for WebSessionStorage {
    fn read(&self, key: &SessionKey) -> StorageResult<Option<String>> {
        self.storage()?.get_item(&key.to_string()).map_err(js_error)
    }

    fn write(&self, key: &SessionKey, value: &str) -> StorageResult<()> {
        self.storage()?.set_item(&key.to_string(), value).map_err(js_error)
    }

    fn remove(&self, key: &SessionKey) -> StorageResult<()> {
        self.storage()?.remove_item(&key.to_string()).map_err(js_error)
    }
}
