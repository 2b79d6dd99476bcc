//! Scripted wallets and helpers shared by the unit tests.

use crate::{
    StateUpdate,
    adapter::{EvmProvider, SolanaProvider, StateListener, TronAccessResponse, TronProvider},
    error::{ProviderError, ProviderErrorCode},
    provider::{EventListener, EventSource, ListenerId, ProviderDescriptor, ProviderHandle, ProviderInfo},
    storage::Clock,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

/// the updates given to the returned listener, in order
pub fn recorder() -> (Rc<RefCell<Vec<StateUpdate>>>, StateListener) {
    let updates = Rc::new(RefCell::new(Vec::new()));
    let recorded = updates.clone();
    (
        updates,
        Rc::new(move |update| recorded.borrow_mut().push(update)),
    )
}

fn info(wallet_id: &str, name: &str, chains: &[&str]) -> ProviderInfo {
    ProviderInfo {
        name: name.to_owned(),
        wallet_id: wallet_id.to_owned(),
        icon: None,
        chains: chains.iter().map(|chain| chain.to_string()).collect(),
    }
}

pub fn evm_descriptor(
    wallet_id: &str,
    name: &str,
    chains: &[&str],
    provider: Rc<MockEvm>,
) -> ProviderDescriptor {
    ProviderDescriptor::new(
        info(wallet_id, name, chains),
        ProviderHandle::default().with_evm(provider),
    )
}

pub fn solana_descriptor(
    wallet_id: &str,
    name: &str,
    chains: &[&str],
    provider: Rc<MockSolana>,
) -> ProviderDescriptor {
    ProviderDescriptor::new(
        info(wallet_id, name, chains),
        ProviderHandle::default().with_solana(provider),
    )
}

pub fn tron_descriptor(wallet_id: &str, name: &str, provider: Rc<MockTron>) -> ProviderDescriptor {
    ProviderDescriptor::new(
        info(wallet_id, name, &[]),
        ProviderHandle::default().with_tron(provider),
    )
}

fn rejected() -> ProviderError {
    ProviderError::with_code(ProviderErrorCode::UserRejected, "User rejected the request.")
}

/// listeners of a mock provider, emitted synchronously
#[derive(Default)]
struct Listeners {
    listeners: RefCell<Vec<(String, ListenerId, EventListener)>>,
    next: Cell<u64>,
}

impl Listeners {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next.get() + 1);
        self.next.set(id.0);
        self.listeners
            .borrow_mut()
            .push((event.to_owned(), id, listener));
        id
    }

    fn remove(&self, event: &str, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(e, i, _)| !(e == event && *i == id));
    }

    fn emit(&self, event: &str, payload: Value) {
        let listeners: Vec<EventListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(e, _, _)| e == event)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(payload.clone());
        }
    }

    fn count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// An EIP-1193 wallet.
///
/// Starts authorized, on chain `0x1`, with no account.
pub struct MockEvm {
    listeners: Listeners,
    accounts: RefCell<Vec<String>>,
    chain: RefCell<String>,
    authorized: Cell<bool>,
    revoke_supported: Cell<bool>,
    pending: Cell<bool>,
    revoke_pending: Cell<bool>,
    next_error: RefCell<Option<ProviderError>>,
    requests: RefCell<Vec<String>>,
}

impl MockEvm {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            listeners: Listeners::default(),
            accounts: RefCell::new(Vec::new()),
            chain: RefCell::new("0x1".to_owned()),
            authorized: Cell::new(true),
            revoke_supported: Cell::new(true),
            pending: Cell::new(false),
            revoke_pending: Cell::new(false),
            next_error: RefCell::new(None),
            requests: RefCell::new(Vec::new()),
        })
    }

    pub fn set_accounts(&self, accounts: &[&str]) {
        *self.accounts.borrow_mut() = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn set_chain(&self, chain: &str) {
        *self.chain.borrow_mut() = chain.to_owned();
    }

    /// whether `eth_accounts` exposes the accounts without a prompt
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.set(authorized);
    }

    pub fn set_revoke_supported(&self, supported: bool) {
        self.revoke_supported.set(supported);
    }

    /// the account requests never get an answer, as when the user leaves
    /// the wallet's popup open
    pub fn set_pending(&self, pending: bool) {
        self.pending.set(pending);
    }

    /// `wallet_revokePermissions` never gets an answer
    pub fn set_revoke_pending(&self, pending: bool) {
        self.revoke_pending.set(pending);
    }

    pub fn fail_next(&self, error: ProviderError) {
        *self.next_error.borrow_mut() = Some(error);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.listeners.emit(event, payload)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }
}

impl EventSource for MockEvm {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        self.listeners.on(event, listener)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

#[async_trait(?Send)]
impl EvmProvider for MockEvm {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        self.requests.borrow_mut().push(method.to_owned());
        if let Some(error) = self.next_error.borrow_mut().take() {
            return Err(error);
        }

        match method {
            "eth_requestAccounts" => {
                if self.pending.get() {
                    futures::future::pending::<()>().await;
                }
                self.authorized.set(true);
                Ok(json!(*self.accounts.borrow()))
            }
            "eth_accounts" if self.authorized.get() => Ok(json!(*self.accounts.borrow())),
            "eth_accounts" => Ok(json!([])),
            "eth_chainId" => Ok(json!(*self.chain.borrow())),
            "wallet_revokePermissions" if self.revoke_supported.get() => {
                if self.revoke_pending.get() {
                    futures::future::pending::<()>().await;
                }
                self.authorized.set(false);
                Ok(Value::Null)
            }
            _ => Err(ProviderError::with_code(
                ProviderErrorCode::UnsupportedMethod,
                format!("method {method} not supported"),
            )),
        }
    }
}

/// A Solana wallet.
///
/// Starts trusted, on the default endpoint, with no public key.
pub struct MockSolana {
    listeners: Listeners,
    public_key: RefCell<Option<String>>,
    endpoint: RefCell<Option<String>>,
    trusted: Cell<bool>,
    rejects: Cell<bool>,
    connect_calls: RefCell<Vec<bool>>,
    disconnect_calls: Cell<usize>,
}

impl MockSolana {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            listeners: Listeners::default(),
            public_key: RefCell::new(None),
            endpoint: RefCell::new(None),
            trusted: Cell::new(true),
            rejects: Cell::new(false),
            connect_calls: RefCell::new(Vec::new()),
            disconnect_calls: Cell::new(0),
        })
    }

    pub fn set_public_key(&self, public_key: Option<&str>) {
        *self.public_key.borrow_mut() = public_key.map(ToOwned::to_owned);
    }

    pub fn set_endpoint(&self, endpoint: Option<&str>) {
        *self.endpoint.borrow_mut() = endpoint.map(ToOwned::to_owned);
    }

    /// whether the page was approved before, for trusted only requests
    pub fn set_trusted(&self, trusted: bool) {
        self.trusted.set(trusted);
    }

    /// the user rejects every prompt
    pub fn set_rejects(&self, rejects: bool) {
        self.rejects.set(rejects);
    }

    /// the `only_if_trusted` flag of every connect call
    pub fn connect_calls(&self) -> Vec<bool> {
        self.connect_calls.borrow().clone()
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.get()
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.listeners.emit(event, payload)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }
}

impl EventSource for MockSolana {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        self.listeners.on(event, listener)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

#[async_trait(?Send)]
impl SolanaProvider for MockSolana {
    async fn connect(&self, only_if_trusted: bool) -> Result<Option<String>, ProviderError> {
        self.connect_calls.borrow_mut().push(only_if_trusted);
        if self.rejects.get() || (only_if_trusted && !self.trusted.get()) {
            return Err(rejected());
        }
        self.trusted.set(true);
        Ok(self.public_key.borrow().clone())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnect_calls.set(self.disconnect_calls.get() + 1);
        Ok(())
    }

    fn rpc_endpoint(&self) -> Option<String> {
        self.endpoint.borrow().clone()
    }
}

/// A TronLink wallet.
///
/// Starts locked: no default address and no answer to access requests.
pub struct MockTron {
    listeners: Listeners,
    default_address: RefCell<Option<String>>,
    access_response: RefCell<Option<TronAccessResponse>>,
    granted_address: RefCell<Option<String>>,
    node_info: RefCell<Result<Value, ProviderError>>,
    hosts: RefCell<Vec<String>>,
    access_requests: Cell<usize>,
}

impl MockTron {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            listeners: Listeners::default(),
            default_address: RefCell::new(None),
            access_response: RefCell::new(None),
            granted_address: RefCell::new(None),
            node_info: RefCell::new(Err(ProviderError::new("node unreachable"))),
            hosts: RefCell::new(Vec::new()),
            access_requests: Cell::new(0),
        })
    }

    pub fn set_default_address(&self, address: Option<&str>) {
        *self.default_address.borrow_mut() = address.map(ToOwned::to_owned);
    }

    pub fn set_access_response(&self, response: Option<TronAccessResponse>) {
        *self.access_response.borrow_mut() = response;
    }

    /// access requests are granted and expose this address
    pub fn grant_on_request(&self, address: Option<&str>) {
        *self.granted_address.borrow_mut() = address.map(ToOwned::to_owned);
        self.set_access_response(Some(TronAccessResponse {
            code: 200,
            message: "The site is already in the whitelist".to_owned(),
        }));
    }

    pub fn set_node_info(&self, node_info: Result<Value, ProviderError>) {
        *self.node_info.borrow_mut() = node_info;
    }

    pub fn set_hosts(&self, hosts: &[&str]) {
        *self.hosts.borrow_mut() = hosts.iter().map(|h| h.to_string()).collect();
    }

    pub fn access_requests(&self) -> usize {
        self.access_requests.get()
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.listeners.emit(event, payload)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }
}

impl EventSource for MockTron {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        self.listeners.on(event, listener)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

#[async_trait(?Send)]
impl TronProvider for MockTron {
    fn default_address(&self) -> Option<String> {
        self.default_address.borrow().clone()
    }

    async fn request_accounts(&self) -> Result<Option<TronAccessResponse>, ProviderError> {
        self.access_requests.set(self.access_requests.get() + 1);
        if let Some(address) = self.granted_address.borrow().clone() {
            *self.default_address.borrow_mut() = Some(address);
        }
        Ok(self.access_response.borrow().clone())
    }

    async fn node_info(&self) -> Result<Value, ProviderError> {
        self.node_info.borrow().clone()
    }

    fn node_hosts(&self) -> Vec<String> {
        self.hosts.borrow().clone()
    }
}

