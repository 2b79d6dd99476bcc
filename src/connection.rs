use crate::{Family, ProviderHandle, chain};
use core::fmt;

/// Partial state reported by a wallet after one of its events.
///
/// `None` leaves the field untouched, `Some(None)` clears it: an account
/// change with no account left clears both fields, the wallet has
/// disconnected on its side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub address: Option<Option<String>>,
    pub chain_id: Option<Option<String>>,
}

impl StateUpdate {
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: Some(Some(address.into())),
            chain_id: None,
        }
    }

    pub fn chain_id(chain_id: impl Into<String>) -> Self {
        Self {
            address: None,
            chain_id: Some(Some(chain_id.into())),
        }
    }

    /// the wallet no longer exposes any account
    pub fn disconnected() -> Self {
        Self {
            address: Some(None),
            chain_id: Some(None),
        }
    }
}

/// which fields an update actually modified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub address_changed: bool,
    pub chain_changed: bool,
}

/// A live connection with a wallet.
///
/// The address and chain follow the wallet's events for as long as the
/// connection is held by the [`ConnectionManager`]. The family is fixed at
/// creation.
///
/// [`ConnectionManager`]: crate::ConnectionManager
#[derive(Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    wallet_id: String,
    name: String,
    family: Family,
    address: Option<String>,
    chain_id: Option<String>,
    /// display name of the chain, when it is a well known one
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_name: Option<&'static str>,
    chains: Vec<String>,
    #[serde(skip)]
    provider: ProviderHandle,
}

impl Connection {
    pub fn new(
        wallet_id: impl Into<String>,
        name: impl Into<String>,
        family: Family,
        address: impl Into<String>,
        chain_id: impl Into<String>,
        provider: ProviderHandle,
    ) -> Self {
        let chain_id = chain_id.into();
        Self {
            wallet_id: wallet_id.into(),
            name: name.into(),
            family,
            address: Some(address.into()),
            chains: vec![family.chain_namespace(&chain_id)],
            chain_name: chain::chain_name(&chain_id, family),
            chain_id: Some(chain_id),
            provider,
        }
    }

    pub fn wallet_id(&self) -> &str {
        &self.wallet_id
    }

    /// name of the wallet, for display
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.chain_id.as_deref()
    }

    /// `Ethereum Mainnet`, `Tron Nile Testnet`...
    pub fn chain_name(&self) -> Option<&'static str> {
        self.chain_name
    }

    /// chain namespaces of the connection, `eip155:1` for example
    pub fn chains(&self) -> &[String] {
        &self.chains
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub(crate) fn set_wallet_id(&mut self, wallet_id: impl Into<String>) {
        self.wallet_id = wallet_id.into();
    }

    /// merge the update in place and report what changed
    pub(crate) fn apply(&mut self, update: StateUpdate) -> StateDiff {
        let mut diff = StateDiff::default();

        if let Some(address) = update.address {
            diff.address_changed = self.address != address;
            self.address = address;
        }

        if let Some(chain_id) = update.chain_id {
            diff.chain_changed = self.chain_id != chain_id;
            if let Some(chain_id) = &chain_id {
                self.chains = vec![self.family.chain_namespace(chain_id)];
            }
            self.chain_name = chain_id
                .as_deref()
                .and_then(|chain_id| chain::chain_name(chain_id, self.family));
            self.chain_id = chain_id;
        }

        diff
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("wallet_id", &self.wallet_id)
            .field("name", &self.name)
            .field("family", &self.family)
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
