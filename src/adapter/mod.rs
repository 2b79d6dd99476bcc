//! Family adapters.
//!
//! Each family speaks its own protocol to its wallets. The adapters hide
//! it behind the same contract: connect (with a silent path for
//! reconnections), disconnect and translate the wallet's events into
//! [`StateUpdate`]s given to the listener the adapter was built with.

pub mod evm;
pub mod solana;
pub mod tron;

pub use self::{
    evm::{EvmAdapter, EvmProvider},
    solana::{SolanaAdapter, SolanaProvider},
    tron::{TronAccessResponse, TronAdapter, TronProvider},
};
use crate::{
    Connection, Family, StateUpdate,
    error::ConnectError,
    provider::{EventSource, ListenerId, ProviderDescriptor},
};
use serde_json::Value;
use std::rc::Rc;

/// receives the state updates translated from the wallet's events
pub type StateListener = Rc<dyn Fn(StateUpdate)>;

pub enum Adapter {
    Evm(EvmAdapter),
    Solana(SolanaAdapter),
    Tron(TronAdapter),
}

impl Adapter {
    pub fn new(family: Family, on_state: StateListener) -> Self {
        match family {
            Family::Evm => Self::Evm(EvmAdapter::new(on_state)),
            Family::Solana => Self::Solana(SolanaAdapter::new(on_state)),
            Family::Tron => Self::Tron(TronAdapter::new(on_state)),
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Self::Evm(_) => Family::Evm,
            Self::Solana(_) => Family::Solana,
            Self::Tron(_) => Family::Tron,
        }
    }

    /// Connect to the wallet of the descriptor.
    ///
    /// With `is_reconnect` the wallet is never prompted: `Ok(None)` means
    /// it holds no standing authorization for this page.
    pub async fn connect(
        &mut self,
        descriptor: &ProviderDescriptor,
        is_reconnect: bool,
    ) -> Result<Option<Connection>, ConnectError> {
        match self {
            Self::Evm(adapter) => adapter.connect(descriptor, is_reconnect).await,
            Self::Solana(adapter) => adapter.connect(descriptor, is_reconnect).await,
            Self::Tron(adapter) => adapter.connect(descriptor, is_reconnect).await,
        }
    }

    /// Release the provider and every listener registered on it.
    ///
    /// Never fails and may be called more than once.
    pub async fn disconnect(&mut self) {
        match self {
            Self::Evm(adapter) => adapter.disconnect().await,
            Self::Solana(adapter) => adapter.disconnect().await,
            Self::Tron(adapter) => adapter.disconnect().await,
        }
    }
}

/// Run the reaction to a wallet event that needs to query the wallet.
///
/// Outside of the browser the task is driven to completion on the spot.
pub(crate) fn spawn_local(task: impl Future<Output = ()> + 'static) {
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(task);

    #[cfg(not(target_arch = "wasm32"))]
    futures::executor::block_on(task);
}

/// The listeners an adapter registered on its provider.
///
/// They are removed on [`Subscriptions::clear`] or when dropped.
pub(crate) struct Subscriptions<P: ?Sized + EventSource> {
    source: Rc<P>,
    ids: Vec<(&'static str, ListenerId)>,
}

impl<P: ?Sized + EventSource> Subscriptions<P> {
    pub fn new(source: Rc<P>) -> Self {
        Self {
            source,
            ids: Vec::new(),
        }
    }

    pub fn on(&mut self, event: &'static str, listener: impl Fn(Value) + 'static) {
        let id = self.source.on(event, Rc::new(listener));
        self.ids.push((event, id));
    }

    pub fn clear(&mut self) {
        for (event, id) in self.ids.drain(..) {
            self.source.remove_listener(event, id);
        }
    }
}

impl<P: ?Sized + EventSource> Drop for Subscriptions<P> {
    fn drop(&mut self) {
        self.clear();
    }
}
