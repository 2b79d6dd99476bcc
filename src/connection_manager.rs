//! Table of the live connections and of the adapters serving them.
//!
//! The manager allows a single connection attempt at a time, whichever
//! wallet it is for. The attempt's guard is released when the attempt
//! completes, fails or is dropped, so a caller giving up on a wallet that
//! never answers does not block the next attempts.

use crate::{
    Connection, StateUpdate,
    adapter::Adapter,
    error::ConnectError,
    events::{EventEmitter, WalletEvent},
    family,
    provider::ProviderResolver,
};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::{Rc, Weak},
};
use tracing::{debug, info};

/// called with the merged connection after each state update of a wallet
pub type StateCallback = Rc<dyn Fn(&Connection)>;

#[derive(Clone)]
pub struct ConnectionManager {
    inner: Rc<Inner>,
}

struct Inner {
    resolver: ProviderResolver,
    connections: RefCell<HashMap<String, Connection>>,
    adapters: RefCell<HashMap<String, Adapter>>,
    active: RefCell<Option<String>>,
    connecting: Cell<bool>,
    events: Rc<EventEmitter>,
}

/// marks a connection attempt in flight for as long as it lives
struct ConnectingGuard<'a>(&'a Cell<bool>);

impl<'a> ConnectingGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl ConnectionManager {
    pub fn new(resolver: ProviderResolver, events: Rc<EventEmitter>) -> Self {
        Self {
            inner: Rc::new(Inner {
                resolver,
                connections: RefCell::new(HashMap::new()),
                adapters: RefCell::new(HashMap::new()),
                active: RefCell::new(None),
                connecting: Cell::new(false),
                events,
            }),
        }
    }

    pub fn resolver(&self) -> &ProviderResolver {
        &self.inner.resolver
    }

    /// Connect to the given wallet and make it the active connection.
    ///
    /// `on_state` is called with the merged connection on every state
    /// update the wallet reports afterwards. With `is_reconnect` the wallet
    /// is not prompted, `Ok(None)` means it has nothing to restore.
    pub async fn connect(
        &self,
        wallet_id: &str,
        is_reconnect: bool,
        on_state: Option<StateCallback>,
    ) -> Result<Option<Connection>, ConnectError> {
        let Some(_guard) = ConnectingGuard::acquire(&self.inner.connecting) else {
            return Err(ConnectError::ConnectionInProgress);
        };

        let descriptor = self
            .inner
            .resolver
            .find_provider(wallet_id)
            .ok_or_else(|| ConnectError::ProviderNotFound(wallet_id.to_owned()))?;

        let chains = descriptor.chains();
        let family = family::classify(Some(chains.as_slice()), Some(wallet_id))
            .ok_or_else(|| ConnectError::UnsupportedFamily(wallet_id.to_owned()))?;
        debug!(wallet_id, %family, is_reconnect, "Connecting");

        let inner = Rc::downgrade(&self.inner);
        let id = wallet_id.to_owned();
        let mut adapter = Adapter::new(
            family,
            Rc::new(move |update| {
                Inner::handle_state_change(&inner, &id, update, on_state.as_ref())
            }),
        );

        let Some(mut connection) = adapter.connect(&descriptor, is_reconnect).await? else {
            debug!(wallet_id, "Nothing to reconnect");
            return Ok(None);
        };
        connection.set_wallet_id(wallet_id);

        self.inner
            .connections
            .borrow_mut()
            .insert(wallet_id.to_owned(), connection.clone());
        self.inner
            .adapters
            .borrow_mut()
            .insert(wallet_id.to_owned(), adapter);
        *self.inner.active.borrow_mut() = Some(wallet_id.to_owned());

        info!(wallet_id, address = ?connection.address(), "Connected");
        Ok(Some(connection))
    }

    /// Disconnect the given wallet, does nothing if it isn't connected.
    ///
    /// The connection leaves the table and `Disconnected` is emitted before
    /// the wallet itself is told: whatever happens to that call, or to the
    /// caller waiting on it, the connection is gone.
    pub async fn disconnect(&self, wallet_id: &str) {
        if self.inner.connections.borrow_mut().remove(wallet_id).is_none() {
            return;
        }
        let adapter = self.inner.adapters.borrow_mut().remove(wallet_id);
        {
            let mut active = self.inner.active.borrow_mut();
            if active.as_deref() == Some(wallet_id) {
                *active = None;
            }
        }

        info!(wallet_id, "Disconnected");
        self.inner.events.emit(&WalletEvent::Disconnected {
            wallet_id: wallet_id.to_owned(),
        });

        if let Some(mut adapter) = adapter {
            adapter.disconnect().await;
        }
    }

    /// Merge a state update into the connection of the given wallet and
    /// emit the matching events.
    ///
    /// Updates for a wallet no longer connected are dropped.
    pub fn handle_state_change(
        &self,
        wallet_id: &str,
        update: StateUpdate,
        on_state: Option<&StateCallback>,
    ) {
        Inner::handle_state_change(&Rc::downgrade(&self.inner), wallet_id, update, on_state)
    }

    pub fn active_connection(&self) -> Option<Connection> {
        let active = self.inner.active.borrow();
        let wallet_id = active.as_deref()?;
        self.connection(wallet_id)
    }

    pub fn active_wallet_id(&self) -> Option<String> {
        self.inner.active.borrow().clone()
    }

    pub fn connection(&self, wallet_id: &str) -> Option<Connection> {
        self.inner.connections.borrow().get(wallet_id).cloned()
    }

    pub fn has_connection(&self, wallet_id: &str) -> bool {
        self.inner.connections.borrow().contains_key(wallet_id)
    }

    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.get()
    }
}

impl Inner {
    fn handle_state_change(
        inner: &Weak<Self>,
        wallet_id: &str,
        update: StateUpdate,
        on_state: Option<&StateCallback>,
    ) {
        let Some(inner) = inner.upgrade() else {
            return;
        };

        let (connection, diff) = {
            let mut connections = inner.connections.borrow_mut();
            let Some(connection) = connections.get_mut(wallet_id) else {
                debug!(wallet_id, ?update, "Dropping state update of a closed connection");
                return;
            };
            let diff = connection.apply(update);
            (connection.clone(), diff)
        };
        debug!(wallet_id, ?diff, "State changed");

        if let Some(on_state) = on_state {
            on_state(&connection);
        }

        if diff.address_changed {
            inner.events.emit(&WalletEvent::AccountChanged {
                connection: connection.clone(),
            });
        }
        if diff.chain_changed {
            inner.events.emit(&WalletEvent::ChainChanged {
                connection: connection.clone(),
            });
        }
        inner
            .events
            .emit(&WalletEvent::StateChanged { connection });
    }
}
