//! Solana wallets (Phantom, Solflare, ...), through their injected
//! provider.
//!
//! Events listened to:
//!
//! - `accountChanged`: the new public key in base58, `null` when the user
//!   switched to an account the page isn't authorized for;
//! - `connect` and `networkChanged`: the cluster may have changed, it is
//!   read again from the provider's endpoint;
//! - `disconnect`.

use super::{StateListener, Subscriptions};
use crate::{
    Connection, Family, ProviderHandle, StateUpdate, chain,
    error::{ConnectError, ProviderError},
    provider::{EventSource, ProviderDescriptor},
};
use async_trait::async_trait;
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

#[async_trait(?Send)]
pub trait SolanaProvider: EventSource {
    /// Ask the wallet for its public key (base58).
    ///
    /// With `only_if_trusted` the wallet must not prompt the user, and
    /// rejects if the page was never approved.
    async fn connect(&self, only_if_trusted: bool) -> Result<Option<String>, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// the RPC endpoint the wallet is configured with, if it exposes it
    fn rpc_endpoint(&self) -> Option<String>;
}

pub struct SolanaAdapter {
    on_state: StateListener,
    provider: Option<Rc<dyn SolanaProvider>>,
    subscriptions: Option<Subscriptions<dyn SolanaProvider>>,
}

impl SolanaAdapter {
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
            .solana()
            .ok_or(ConnectError::ProviderUnavailable(Family::Solana))?;
        self.subscriptions = None;

        let public_key = match provider.connect(is_reconnect).await {
            Ok(public_key) => public_key,
            // a trusted-only request is rejected when the page was never approved
            Err(error) if is_reconnect && error.is_user_rejection() => {
                debug!(%error, "Solana wallet has no standing authorization");
                None
            }
            Err(error) => return Err(error.into()),
        };

        let Some(address) = public_key else {
            if is_reconnect {
                return Ok(None);
            }
            return Err(ConnectError::NoAccounts);
        };

        let mut subscriptions = Subscriptions::new(provider.clone());
        let on_state = self.on_state.clone();
        subscriptions.on("accountChanged", move |public_key| {
            on_state(account_changed(&public_key))
        });
        for event in ["connect", "networkChanged"] {
            let on_state = self.on_state.clone();
            let provider = Rc::downgrade(&provider);
            subscriptions.on(event, move |_| {
                if let Some(chain_id) = current_cluster(&provider) {
                    on_state(StateUpdate::chain_id(chain_id))
                }
            });
        }
        let on_state = self.on_state.clone();
        subscriptions.on("disconnect", move |_| on_state(StateUpdate::disconnected()));

        let chain_id = chain::solana_cluster(provider.rpc_endpoint().as_deref());
        debug!(%address, chain_id, "Solana wallet connected");

        self.subscriptions = Some(subscriptions);
        self.provider = Some(provider.clone());

        Ok(Some(Connection::new(
            descriptor.wallet_id(),
            descriptor.name(),
            Family::Solana,
            address,
            chain_id,
            ProviderHandle::default().with_solana(provider),
        )))
    }

    pub async fn disconnect(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        self.subscriptions = None;

        if let Err(error) = provider.disconnect().await {
            debug!(%error, "Solana wallet refused to disconnect");
        }

        info!("Disconnected from Solana wallet");
    }
}

fn account_changed(public_key: &Value) -> StateUpdate {
    match public_key.as_str() {
        Some(public_key) if !public_key.is_empty() => StateUpdate::address(public_key),
        _ => StateUpdate::disconnected(),
    }
}

fn current_cluster(provider: &Weak<dyn SolanaProvider>) -> Option<&'static str> {
    let provider = provider.upgrade()?;
    Some(chain::solana_cluster(provider.rpc_endpoint().as_deref()))
}
