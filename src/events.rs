//! Typed events of the [`WalletManager`].
//!
//! [`WalletManager`]: crate::WalletManager

use crate::{Connection, provider::ListenerId};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

/// Serialized as `{ "type": "chainChanged", "detail": { ... } }`, the shape
/// of the DOM custom events the JS connector used to dispatch.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(
    tag = "type",
    content = "detail",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum WalletEvent {
    Connected { connection: Connection },
    Disconnected { wallet_id: String },
    ChainChanged { connection: Connection },
    AccountChanged { connection: Connection },
    /// after any state update of the wallet, once the more specific
    /// events were emitted
    StateChanged { connection: Connection },
}

impl WalletEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::ChainChanged { .. } => EventKind::ChainChanged,
            Self::AccountChanged { .. } => EventKind::AccountChanged,
            Self::StateChanged { .. } => EventKind::StateChanged,
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        match self {
            Self::Connected { connection }
            | Self::ChainChanged { connection }
            | Self::AccountChanged { connection }
            | Self::StateChanged { connection } => Some(connection),
            Self::Disconnected { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    ChainChanged,
    AccountChanged,
    StateChanged,
}

impl EventKind {
    pub const ALL: [Self; 5] = [
        Self::Connected,
        Self::Disconnected,
        Self::ChainChanged,
        Self::AccountChanged,
        Self::StateChanged,
    ];

    /// name of the event on the JS side
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::ChainChanged => "chainChanged",
            Self::AccountChanged => "accountChanged",
            Self::StateChanged => "stateChanged",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

pub type WalletEventListener = Rc<dyn Fn(&WalletEvent)>;

#[derive(Default)]
pub struct EventEmitter {
    listeners: RefCell<Vec<(ListenerId, EventKind, WalletEventListener)>>,
    next_id: Cell<u64>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, listener: WalletEventListener) -> ListenerId {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.listeners.borrow_mut().push((id, kind, listener));
        id
    }

    /// returns `false` if no listener had this id
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(i, _, _)| *i != id);
        listeners.len() != before
    }

    /// Call the listeners of the event's kind, in registration order.
    ///
    /// Listeners registered or removed while dispatching only take effect
    /// from the next event.
    pub fn emit(&self, event: &WalletEvent) {
        let kind = event.kind();
        let listeners: Vec<WalletEventListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }
}
