//! Persistence of the connection across page reloads.
//!
//! A single slot of the browser's local storage holds the last successful
//! connection as JSON. It is restored by [`WalletManager::init`] unless it
//! is older than the configured time to live.
//!
//! [`WalletManager::init`]: crate::WalletManager::init

use crate::{Family, error::StorageError};
use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};
use tracing::{debug, warn};

/// Origin scoped string key/value store, `window.localStorage` in the
/// browser.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// in memory [`KeyValueStorage`], for tests and non browser environments
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Source of the current time, in milliseconds since the UNIX epoch.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_millis(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// The persisted connection.
///
/// The JSON field names are kept compatible with what previous versions of
/// the JS connector wrote in the local storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PersistedRecord {
    #[serde(rename = "walletType")]
    pub family: Family,
    pub address: Option<String>,
    #[serde(rename = "chainId")]
    pub chain_id: Option<String>,
    #[serde(rename = "rdns")]
    pub wallet_id: String,
    #[serde(rename = "timestamp")]
    pub saved_at: u64,
}

pub struct ConnectionStore {
    storage: Rc<dyn KeyValueStorage>,
    clock: Rc<dyn Clock>,
    key: String,
    ttl: Duration,
}

impl ConnectionStore {
    pub fn new(
        storage: Rc<dyn KeyValueStorage>,
        clock: Rc<dyn Clock>,
        key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            key: key.into(),
            ttl,
        }
    }

    /// persist the connection, stamping it with the current time
    pub fn save(
        &self,
        family: Family,
        address: Option<&str>,
        chain_id: Option<&str>,
        wallet_id: &str,
    ) -> Result<(), StorageError> {
        let record = PersistedRecord {
            family,
            address: address.map(ToOwned::to_owned),
            chain_id: chain_id.map(ToOwned::to_owned),
            wallet_id: wallet_id.to_owned(),
            saved_at: self.clock.now_millis(),
        };
        let json = serde_json::to_string(&record)?;
        self.storage.set_item(&self.key, &json)
    }

    /// Load the persisted connection.
    ///
    /// An expired record is removed from the storage and reported as
    /// absent, as is a record that cannot be read.
    pub fn load(&self) -> Option<PersistedRecord> {
        let json = match self.storage.get_item(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(error) => {
                warn!(%error, "Error loading wallet state");
                return None;
            }
        };

        let record: PersistedRecord = match serde_json::from_str(&json) {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "Error loading wallet state");
                return None;
            }
        };

        let age = self.clock.now_millis().saturating_sub(record.saved_at);
        if u128::from(age) > self.ttl.as_millis() {
            debug!(wallet_id = %record.wallet_id, age, "persisted connection expired");
            self.clear();
            return None;
        }

        Some(record)
    }

    /// remove the persisted connection, failures are only logged
    pub fn clear(&self) {
        if let Err(error) = self.storage.remove_item(&self.key) {
            warn!(%error, "couldn't clear the wallet state");
        }
    }
}
