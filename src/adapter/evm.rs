//! EVM wallets, through their EIP-1193 provider.
//!
//! Events listened to:
//!
//! - `accountsChanged`: array of addresses, empty when the wallet locked
//!   or revoked the page;
//! - `chainChanged`: the new chain id, hexadecimal;
//! - `disconnect`: the provider lost the connection to every chain.

use super::{StateListener, Subscriptions};
use crate::{
    Connection, Family, ProviderHandle, StateUpdate, chain,
    error::{ConnectError, ProviderError},
    provider::{EventSource, ProviderDescriptor},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use sha3::{Digest, Keccak256};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// An EIP-1193 provider.
#[async_trait(?Send)]
pub trait EvmProvider: EventSource {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

pub struct EvmAdapter {
    on_state: StateListener,
    provider: Option<Rc<dyn EvmProvider>>,
    subscriptions: Option<Subscriptions<dyn EvmProvider>>,
}

impl EvmAdapter {
    pub fn new(on_state: StateListener) -> Self {
        Self {
            on_state,
            provider: None,
            subscriptions: None,
        }
    }

    pub async fn connect(
        &mut self,
        descriptor: &ProviderDescriptor,
        is_reconnect: bool,
    ) -> Result<Option<Connection>, ConnectError> {
        let provider = descriptor
            .provider()
            .evm()
            .ok_or(ConnectError::ProviderUnavailable(Family::Evm))?;
        self.subscriptions = None;

        // `eth_accounts` never prompts the user
        let method = if is_reconnect {
            "eth_accounts"
        } else {
            "eth_requestAccounts"
        };
        debug!(method, "Sending accounts request");
        let accounts = provider.request(method, json!([])).await?;
        let accounts = parse_accounts(&accounts)?;

        let Some(account) = accounts.first() else {
            if is_reconnect {
                warn!("No accounts found during reconnect.");
                return Ok(None);
            }
            return Err(ConnectError::NoAccounts);
        };
        let address = checksum_address(account)?;

        let chain_id = provider.request("eth_chainId", json!([])).await?;
        let chain_id = chain::evm_chain_id(&chain_id)
            .ok_or_else(|| ProviderError::new(format!("Invalid chain id: {chain_id}")))?;
        debug!(%address, %chain_id, "EVM wallet connected");

        let mut subscriptions = Subscriptions::new(provider.clone());
        let on_state = self.on_state.clone();
        subscriptions.on("accountsChanged", move |accounts| {
            on_state(accounts_changed(&accounts))
        });
        let on_state = self.on_state.clone();
        subscriptions.on("chainChanged", move |chain_id| {
            match chain::evm_chain_id(&chain_id) {
                Some(chain_id) => on_state(StateUpdate::chain_id(chain_id)),
                None => warn!(%chain_id, "ignoring invalid chain id"),
            }
        });
        let on_state = self.on_state.clone();
        subscriptions.on("disconnect", move |_| on_state(StateUpdate::disconnected()));

        self.subscriptions = Some(subscriptions);
        self.provider = Some(provider.clone());

        Ok(Some(Connection::new(
            descriptor.wallet_id(),
            descriptor.name(),
            Family::Evm,
            address,
            chain_id,
            ProviderHandle::default().with_evm(provider),
        )))
    }

    pub async fn disconnect(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        self.subscriptions = None;

        if let Err(error) = provider
            .request(
                "wallet_revokePermissions",
                json!([{ "eth_accounts": {} }]),
            )
            .await
        {
            debug!(%error, "wallet_revokePermissions not supported");
        }

        info!("Disconnected from EVM wallet");
    }
}

fn parse_accounts(accounts: &Value) -> Result<Vec<String>, ProviderError> {
    serde_json::from_value(accounts.clone())
        .map_err(|error| ProviderError::new(format!("Invalid accounts `{accounts}': {error}")))
}

fn accounts_changed(accounts: &Value) -> StateUpdate {
    let accounts = parse_accounts(accounts).unwrap_or_default();
    match accounts.first() {
        None => StateUpdate::disconnected(),
        Some(account) => StateUpdate::address(
            checksum_address(account).unwrap_or_else(|_| account.clone()),
        ),
    }
}

/// Mixed case checksum encoding of an address (EIP-55).
///
/// ```
/// use wallet_connector::adapter::evm::checksum_address;
///
/// assert_eq!(
///     checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap(),
///     "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
/// );
/// ```
pub fn checksum_address(address: &str) -> Result<String, ProviderError> {
    let invalid = || ProviderError::new(format!("Invalid address `{address}'"));

    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    if digits.len() != 40 || hex::decode(digits).is_err() {
        return Err(invalid());
    }

    let digits = digits.to_ascii_lowercase();
    let hash = Keccak256::digest(digits.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, c) in digits.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }
    Ok(checksummed)
}
