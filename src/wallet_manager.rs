//! The entry point of the crate for applications.
//!
//! The [`WalletManager`] keeps a single active wallet connection, persists it
//! so it can be restored silently on the next page load, and forwards the
//! wallet's changes as typed events.

use crate::{
    Config, Connection,
    connection_manager::{ConnectionManager, StateCallback},
    discovery::{DetectedWallet, WalletDiscovery, WalletGroups},
    error::ConnectError,
    events::{EventEmitter, EventKind, WalletEventListener, WalletEvent},
    provider::{GlobalProviders, ListenerId, ProviderRegistry, ProviderResolver, Unsubscribe},
    storage::{Clock, ConnectionStore, KeyValueStorage},
};
use futures::future::{Either, select};
use futures_timer::Delay;
use std::{
    cell::Cell,
    rc::{Rc, Weak},
};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct WalletManager {
    inner: Rc<Inner>,
}

struct Inner {
    config: Config,
    connections: ConnectionManager,
    discovery: WalletDiscovery,
    store: ConnectionStore,
    events: Rc<EventEmitter>,
    initialized: Cell<bool>,
}

impl WalletManager {
    pub fn new(
        config: Config,
        registry: Rc<dyn ProviderRegistry>,
        globals: Rc<dyn GlobalProviders>,
        storage: Rc<dyn KeyValueStorage>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let events = Rc::new(EventEmitter::new());
        let store = ConnectionStore::new(
            storage,
            clock,
            config.storage_key.clone(),
            config.session_ttl(),
        );
        let discovery = WalletDiscovery::new(
            registry.clone(),
            globals.clone(),
            config.priority_wallets.clone(),
        );
        let connections =
            ConnectionManager::new(ProviderResolver::new(registry, globals), events.clone());

        Self {
            inner: Rc::new(Inner {
                config,
                connections,
                discovery,
                store,
                events,
                initialized: Cell::new(false),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Restore the persisted connection, without prompting the user.
    ///
    /// Only the first call does anything. A failed restoration forgets the
    /// persisted connection, it is logged and never returned.
    pub async fn init(&self) {
        if self.inner.initialized.replace(true) {
            debug!("Wallet manager already initialized");
            return;
        }

        let Some(record) = self.inner.store.load() else {
            return;
        };
        debug!(wallet_id = %record.wallet_id, "Restoring persisted connection");

        match self.connect_with_timeout(&record.wallet_id, true).await {
            Ok(Some(connection)) => {
                info!(wallet_id = connection.wallet_id(), "Connection restored")
            }
            // the wallet is locked for now, it may be restored next time
            Ok(None) => debug!(wallet_id = %record.wallet_id, "No connection to restore"),
            Err(error) => {
                warn!(%error, "Automatic reconnection failed");
                self.inner.store.clear();
            }
        }
    }

    /// Connect to the given wallet.
    ///
    /// A different active wallet is disconnected first. Connecting again
    /// to the active wallet fails with [`ConnectError::AlreadyConnected`],
    /// unless `is_reconnect` is set: the stale connection is then torn down
    /// and restored silently.
    pub async fn connect(
        &self,
        wallet_id: &str,
        is_reconnect: bool,
    ) -> Result<Option<Connection>, ConnectError> {
        let connections = &self.inner.connections;
        if connections.is_connecting() {
            return Err(ConnectError::ConnectionInProgress);
        }

        if !is_reconnect {
            if let Some(active) = connections.active_wallet_id() {
                if active != wallet_id {
                    debug!(from = %active, to = wallet_id, "Switching wallet");
                    connections.disconnect(&active).await;
                }
            }
        }

        if connections.has_connection(wallet_id) {
            if !is_reconnect {
                return Err(ConnectError::AlreadyConnected(wallet_id.to_owned()));
            }
            connections.disconnect(wallet_id).await;
        }

        let inner = Rc::downgrade(&self.inner);
        let on_state: StateCallback = Rc::new(move |connection: &Connection| {
            Inner::persist_state(&inner, connection)
        });

        let connection = connections
            .connect(wallet_id, is_reconnect, Some(on_state))
            .await?;

        if let Some(connection) = &connection {
            self.inner.persist(connection);
            self.inner.events.emit(&WalletEvent::Connected {
                connection: connection.clone(),
            });
        }

        Ok(connection)
    }

    /// [`connect`] bounded by the configured connection timeout.
    ///
    /// On timeout the pending attempt is dropped, which releases the
    /// wallet's listeners and lets the next attempt through.
    ///
    /// [`connect`]: Self::connect
    pub async fn connect_with_timeout(
        &self,
        wallet_id: &str,
        is_reconnect: bool,
    ) -> Result<Option<Connection>, ConnectError> {
        let timeout = self.inner.config.connect_timeout();
        let connect = Box::pin(self.connect(wallet_id, is_reconnect));

        match select(connect, Delay::new(timeout)).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                warn!(wallet_id, ?timeout, "Connection timed out");
                Err(ConnectError::Timeout)
            }
        }
    }

    /// Disconnect the given wallet, the active one by default, and forget
    /// the persisted connection.
    pub async fn disconnect(&self, wallet_id: Option<&str>) {
        let wallet_id = match wallet_id {
            Some(wallet_id) => wallet_id.to_owned(),
            None => match self.inner.connections.active_wallet_id() {
                Some(wallet_id) => wallet_id,
                None => return,
            },
        };

        self.inner.connections.disconnect(&wallet_id).await;
        self.inner.store.clear();
    }

    pub fn active_connection(&self) -> Option<Connection> {
        self.inner.connections.active_connection()
    }

    pub fn connection(&self, wallet_id: &str) -> Option<Connection> {
        self.inner.connections.connection(wallet_id)
    }

    pub fn is_connecting(&self) -> bool {
        self.inner.connections.is_connecting()
    }

    pub fn detected_wallets(&self) -> Vec<DetectedWallet> {
        self.inner.discovery.detected_wallets()
    }

    /// the detected wallets split for a wallet picker
    pub fn wallet_groups(&self) -> WalletGroups {
        WalletGroups::split(
            self.detected_wallets(),
            self.inner.config.top_wallet_count,
        )
    }

    pub fn on(&self, kind: EventKind, listener: WalletEventListener) -> ListenerId {
        self.inner.events.on(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    /// be notified when a wallet announces itself after the page loaded
    pub fn on_wallets_changed(&self, listener: Rc<dyn Fn()>) -> Option<Unsubscribe> {
        self.inner
            .connections
            .resolver()
            .registry()
            .subscribe(listener)
    }
}

impl Inner {
    /// A connection left with no address is still saved: the wallet may
    /// only be locked and restores it once unlocked.
    fn persist(&self, connection: &Connection) {
        if let Err(error) = self.store.save(
            connection.family(),
            connection.address(),
            connection.chain_id(),
            connection.wallet_id(),
        ) {
            warn!(%error, "Error saving wallet state");
        }
    }

    fn persist_state(inner: &Weak<Self>, connection: &Connection) {
        if let Some(inner) = inner.upgrade() {
            inner.persist(connection);
        }
    }
}
