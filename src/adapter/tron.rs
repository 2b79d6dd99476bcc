//! Tron wallets (TronLink and compatible), through `tronLink` and its
//! `tronWeb` instance.
//!
//! Events listened to:
//!
//! - `setAccount`: the address now selected (base58), or an object with
//!   an `address` field;
//! - `connect` and `networkChanged`: the node may have changed, the chain
//!   is looked up again, node info first and then the node hosts;
//! - `disconnect`.

use super::{StateListener, Subscriptions};
use crate::{
    Connection, Family, ProviderHandle, StateUpdate, chain,
    error::{ConnectError, ProviderError},
    provider::{EventSource, ProviderDescriptor},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{cell::Cell, rc::Rc};
use tracing::{debug, info};

/// answer of TronLink to `tron_requestAccounts`
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct TronAccessResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl TronAccessResponse {
    pub const REJECTED: i64 = 4001;
    pub const PENDING: i64 = 4000;
}

#[async_trait(?Send)]
pub trait TronProvider: EventSource {
    /// `tronWeb.defaultAddress.base58`, set once the page is authorized
    fn default_address(&self) -> Option<String>;

    /// Prompt the user for access. `None` when the wallet gives no
    /// answer at all, which it does while locked.
    async fn request_accounts(&self) -> Result<Option<TronAccessResponse>, ProviderError>;

    /// `/wallet/getnodeinfo` of the full node
    async fn node_info(&self) -> Result<Value, ProviderError>;

    /// hosts of the full node, solidity node and event server
    fn node_hosts(&self) -> Vec<String>;
}

pub struct TronAdapter {
    on_state: StateListener,
    provider: Option<Rc<dyn TronProvider>>,
    subscriptions: Option<Subscriptions<dyn TronProvider>>,
}

impl TronAdapter {
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
            .tron()
            .ok_or(ConnectError::ProviderUnavailable(Family::Tron))?;
        self.subscriptions = None;

        let mut address = provider.default_address();

        if address.is_none() {
            if is_reconnect {
                return Ok(None);
            }

            debug!("Requesting Tron accounts");
            match provider.request_accounts().await? {
                None => return Err(ConnectError::WalletLocked),
                Some(response) if response.code == TronAccessResponse::REJECTED => {
                    return Err(ConnectError::UserRejected {
                        code: response.code,
                    });
                }
                Some(response) if response.code == TronAccessResponse::PENDING => {
                    return Err(ConnectError::RequestPending);
                }
                Some(response) => debug!(code = response.code, "Tron access granted"),
            }
            address = provider.default_address();
        }

        let Some(address) = address else {
            return Err(ConnectError::NoAccounts);
        };

        let chain_id = fetch_chain_id(provider.as_ref()).await;
        debug!(%address, %chain_id, "Tron wallet connected");

        let mut subscriptions = Subscriptions::new(provider.clone());
        let on_state = self.on_state.clone();
        subscriptions.on("setAccount", move |account| {
            if let Some(address) = account_address(&account) {
                on_state(StateUpdate::address(address))
            }
        });
        // only the answer to the latest network event is kept
        let generation = Rc::new(Cell::new(0u64));
        for event in ["connect", "networkChanged"] {
            let on_state = self.on_state.clone();
            let provider = Rc::downgrade(&provider);
            let generation = generation.clone();
            subscriptions.on(event, move |_| {
                let Some(provider) = provider.upgrade() else {
                    return;
                };
                let current = generation.get() + 1;
                generation.set(current);

                let on_state = on_state.clone();
                let generation = generation.clone();
                super::spawn_local(async move {
                    let chain_id = fetch_chain_id(provider.as_ref()).await;
                    if generation.get() == current {
                        on_state(StateUpdate::chain_id(chain_id))
                    } else {
                        debug!(%chain_id, "Dropping outdated Tron chain id");
                    }
                });
            });
        }
        let on_state = self.on_state.clone();
        subscriptions.on("disconnect", move |_| on_state(StateUpdate::disconnected()));

        self.subscriptions = Some(subscriptions);
        self.provider = Some(provider.clone());

        Ok(Some(Connection::new(
            descriptor.wallet_id(),
            descriptor.name(),
            Family::Tron,
            address,
            chain_id,
            ProviderHandle::default().with_tron(provider),
        )))
    }

    pub async fn disconnect(&mut self) {
        if self.provider.take().is_none() {
            return;
        }
        self.subscriptions = None;

        info!("Disconnected from Tron wallet");
    }
}

/// the node info first, then the node hosts, mainnet as last resort
async fn fetch_chain_id(provider: &dyn TronProvider) -> String {
    match provider.node_info().await {
        Ok(node_info) => {
            if let Some(chain_id) = chain::tron_chain_from_node_info(&node_info) {
                return chain_id;
            }
        }
        Err(error) => debug!(%error, "Could not fetch node info"),
    }

    chain::tron_chain_from_hosts(&provider.node_hosts())
        .unwrap_or(chain::TRON_MAINNET)
        .to_owned()
}

fn account_address(account: &Value) -> Option<&str> {
    match account {
        Value::String(address) => Some(address.as_str()),
        Value::Object(object) => object.get("address").and_then(Value::as_str),
        _ => None,
    }
    .filter(|address| !address.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTron, recorder, tron_descriptor};
    use serde_json::json;

    const ADDRESS: &str = "TJCnKsPa7y5okkXvQAidZBzqx3QyQ6sxMW";

    #[tokio::test]
    async fn already_authorized() {
        let provider = MockTron::new();
        provider.set_default_address(Some(ADDRESS));
        provider.set_node_info(Ok(json!({ "config": { "chainId": 3448148188u64 } })));
        let descriptor = tron_descriptor("tronlink", "TronLink", provider.clone());

        let mut adapter = TronAdapter::new(Rc::new(|_| {}));
        let connection = adapter.connect(&descriptor, false).await.unwrap().unwrap();

        assert_eq!(connection.address(), Some(ADDRESS));
        assert_eq!(connection.chain_id(), Some(chain::TRON_NILE));
        assert_eq!(provider.access_requests(), 0);
    }

    #[tokio::test]
    async fn request_access_then_read_address() {
        let provider = MockTron::new();
        provider.grant_on_request(Some(ADDRESS));
        provider.set_hosts(&["https://api.shasta.trongrid.io"]);
        let descriptor = tron_descriptor("tronlink", "TronLink", provider.clone());

        let mut adapter = TronAdapter::new(Rc::new(|_| {}));
        let connection = adapter.connect(&descriptor, false).await.unwrap().unwrap();

        assert_eq!(connection.address(), Some(ADDRESS));
        assert_eq!(connection.chain_id(), Some(chain::TRON_SHASTA));
        assert_eq!(provider.access_requests(), 1);
    }

    #[tokio::test]
    async fn chain_defaults_to_mainnet() {
        let provider = MockTron::new();
        provider.set_default_address(Some(ADDRESS));
        let descriptor = tron_descriptor("tronlink", "TronLink", provider);

        let mut adapter = TronAdapter::new(Rc::new(|_| {}));
        let connection = adapter.connect(&descriptor, false).await.unwrap().unwrap();
        assert_eq!(connection.chain_id(), Some(chain::TRON_MAINNET));
    }

    #[tokio::test]
    async fn access_failures() {
        let cases = [
            (None, ConnectError::WalletLocked),
            (
                Some(TronAccessResponse {
                    code: 4001,
                    message: "User rejected".to_owned(),
                }),
                ConnectError::UserRejected { code: 4001 },
            ),
            (
                Some(TronAccessResponse {
                    code: 4000,
                    message: "In queue".to_owned(),
                }),
                ConnectError::RequestPending,
            ),
            (
                Some(TronAccessResponse {
                    code: 200,
                    message: String::new(),
                }),
                ConnectError::NoAccounts,
            ),
        ];

        for (response, expected) in cases {
            let provider = MockTron::new();
            provider.set_access_response(response);
            let descriptor = tron_descriptor("tronlink", "TronLink", provider);

            let mut adapter = TronAdapter::new(Rc::new(|_| {}));
            assert_eq!(adapter.connect(&descriptor, false).await.unwrap_err(), expected);
        }
    }

    #[tokio::test]
    async fn silent_reconnect_never_prompts() {
        let provider = MockTron::new();
        provider.grant_on_request(Some(ADDRESS));
        let descriptor = tron_descriptor("tronlink", "TronLink", provider.clone());

        let mut adapter = TronAdapter::new(Rc::new(|_| {}));
        assert!(adapter.connect(&descriptor, true).await.unwrap().is_none());
        assert_eq!(provider.access_requests(), 0);
    }

    #[tokio::test]
    async fn events() {
        let provider = MockTron::new();
        provider.set_default_address(Some(ADDRESS));
        let descriptor = tron_descriptor("tronlink", "TronLink", provider.clone());
        let (updates, on_state) = recorder();

        let mut adapter = TronAdapter::new(on_state);
        adapter.connect(&descriptor, false).await.unwrap();

        provider.emit("setAccount", json!({ "address": "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf" }));
        provider.emit("setAccount", json!(""));
        provider.set_hosts(&["https://nile.trongrid.io"]);
        provider.emit("networkChanged", json!({}));
        provider.emit("disconnect", json!(null));

        assert_eq!(
            updates.borrow().as_slice(),
            &[
                StateUpdate::address("TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf"),
                StateUpdate::chain_id(chain::TRON_NILE),
                StateUpdate::disconnected(),
            ]
        );

        adapter.disconnect().await;
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn network_change_asks_the_node_first() {
        let provider = MockTron::new();
        provider.set_default_address(Some(ADDRESS));
        provider.set_node_info(Ok(json!({ "config": { "chainId": 3448148188u64 } })));
        provider.set_hosts(&["https://my-private-nile-node.example"]);
        let descriptor = tron_descriptor("tronlink", "TronLink", provider.clone());
        let (updates, on_state) = recorder();

        let mut adapter = TronAdapter::new(on_state);
        let connection = adapter.connect(&descriptor, false).await.unwrap().unwrap();
        assert_eq!(connection.chain_id(), Some(chain::TRON_NILE));

        provider.emit("connect", json!(null));
        provider.set_node_info(Ok(json!({ "config": { "chainId": 2494104990u64 } })));
        provider.emit("networkChanged", json!({}));

        assert_eq!(
            updates.borrow().as_slice(),
            &[
                StateUpdate::chain_id(chain::TRON_NILE),
                StateUpdate::chain_id(chain::TRON_SHASTA),
            ]
        );
    }
}
