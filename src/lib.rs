/*!

# Wallet Connector for EVM, Solana and Tron browser wallets

This library is meant to be used for web applications that need to connect
to the wallet extensions of their users, whatever the chain family of the
wallet.

## Features

- Discover the installed wallets (EIP-6963 announcements and the well known
  globals such as `window.ethereum`, `window.solana` or `window.tronLink`)
- Connect to a wallet, normalizing the address and chain of every family
- Follow the account and network changes of the wallet
- Restore the connection silently on the next page load

## Usage

From JavaScript, the crate exports a `WalletManager` class (see
[`ffi::JsWalletManager`]). From Rust, the [`WalletManager`] is built from
its collaborators: where the providers are found, where the connection is
persisted and the clock used to expire it.

```no_run
use std::rc::Rc;
use wallet_connector::{
    Config, WalletManager,
    ffi::{BrowserGlobals, Eip6963Registry, LocalStorage},
    storage::SystemClock,
};

# async fn test() -> anyhow::Result<()> {
let manager = WalletManager::new(
    Config::default(),
    Rc::new(Eip6963Registry::new()),
    Rc::new(BrowserGlobals),
    Rc::new(LocalStorage::new()?),
    Rc::new(SystemClock),
);

// restore the connection of the previous visit
manager.init().await;

for wallet in manager.detected_wallets() {
    println!("Wallet: {} ({:?})", wallet.name, wallet.families);
}
# Ok(()) }
```

Connecting prompts the user, the returned [`Connection`] carries the
normalized address and chain of the wallet. Later changes are delivered
as [`WalletEvent`]s.

```no_run
# use wallet_connector::{EventKind, WalletEvent, WalletManager};
# use std::rc::Rc;
# async fn test(manager: WalletManager) -> anyhow::Result<()> {
manager.on(
    EventKind::AccountChanged,
    Rc::new(|event: &WalletEvent| println!("{event:?}")),
);

if let Some(connection) = manager.connect("io.metamask", false).await? {
    println!("connected to {:?}", connection.address());
}
# Ok(()) }
```

*/

pub mod adapter;
pub mod chain;
pub mod config;
mod connection;
pub mod connection_manager;
pub mod discovery;
pub mod error;
pub mod events;
pub mod family;
pub mod ffi;
pub mod provider;
pub mod storage;
mod wallet_manager;

#[cfg(test)]
mod testing;

pub use self::{
    config::Config,
    connection::{Connection, StateDiff, StateUpdate},
    connection_manager::ConnectionManager,
    discovery::{DetectedWallet, WalletGroups},
    error::ConnectError,
    events::{EventKind, WalletEvent},
    family::{Family, classify},
    provider::ProviderHandle,
    wallet_manager::WalletManager,
};
