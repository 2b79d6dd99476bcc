use std::time::Duration;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Settings of the [`WalletManager`].
///
/// Every field has a default so a JS caller may pass a partial object
/// (or nothing at all).
///
/// [`WalletManager`]: crate::WalletManager
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// key of the persisted connection in the local storage
    pub storage_key: String,
    /// how long a persisted connection may be restored, in milliseconds
    pub session_ttl_ms: u64,
    /// caller side timeout of a connection attempt, in milliseconds
    pub connect_timeout_ms: u64,
    /// wallet names listed first by the discovery, in this order
    pub priority_wallets: Vec<String>,
    /// number of wallets shown before the "view all" split
    pub top_wallet_count: usize,
}

impl Config {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_millis(self.session_ttl_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: "wallet_connection".to_owned(),
            session_ttl_ms: 7 * DAY_MS,
            connect_timeout_ms: 30_000,
            priority_wallets: vec![
                "Phantom".to_owned(),
                "MetaMask".to_owned(),
                "Coinbase Wallet".to_owned(),
            ],
            top_wallet_count: 4,
        }
    }
}
