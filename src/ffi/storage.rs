use crate::{error::StorageError, storage::KeyValueStorage};
use wasm_bindgen::JsValue;

/// `window.localStorage`
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// The local storage of the current window.
    ///
    /// Fails outside of a window context and when the browser denies the
    /// access (private browsing, disabled cookies).
    pub fn new() -> Result<Self, StorageError> {
        let window = web_sys::window().ok_or(StorageError::Unavailable)?;
        let storage = window
            .local_storage()
            .map_err(backend)?
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

fn backend(error: JsValue) -> StorageError {
    StorageError::Backend(format!("{error:?}"))
}

impl KeyValueStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(backend)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // throws `QuotaExceededError` when the storage is full
        self.storage.set_item(key, value).map_err(backend)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key).map_err(backend)
    }
}
