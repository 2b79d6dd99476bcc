//! Lookup of the live provider of a wallet.
//!
//! Providers come from two places: a discovery registry where wallets
//! announce themselves (EIP-6963) and the well known global objects
//! wallets inject in the page (`window.ethereum`, `window.solana`,
//! `window.tronLink`). Both are injected collaborators so the lookup
//! logic never reaches for the page's globals itself.

use crate::{
    Family,
    adapter::{EvmProvider, SolanaProvider, TronProvider},
    family::KNOWN_WALLETS,
};
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};
use tracing::debug;

/// callback registered on a provider event
pub type EventListener = Rc<dyn Fn(Value)>;

/// handle returned by [`EventSource::on`] to remove the listener later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Subscription to the events of a wallet provider.
///
/// Payloads are JSON values, each family adapter documents the shape it
/// expects for the events it listens to.
pub trait EventSource {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId;
    fn remove_listener(&self, event: &str, id: ListenerId);
}

/// Opaque reference to the provider object of a wallet.
///
/// A wallet may speak for more than one family (Phantom injects both an
/// EVM and a Solana provider), the handle carries one capability per
/// family it supports.
#[derive(Clone, Default)]
pub struct ProviderHandle {
    evm: Option<Rc<dyn EvmProvider>>,
    solana: Option<Rc<dyn SolanaProvider>>,
    tron: Option<Rc<dyn TronProvider>>,
}

impl ProviderHandle {
    pub fn with_evm(mut self, provider: Rc<dyn EvmProvider>) -> Self {
        self.evm = Some(provider);
        self
    }

    pub fn with_solana(mut self, provider: Rc<dyn SolanaProvider>) -> Self {
        self.solana = Some(provider);
        self
    }

    pub fn with_tron(mut self, provider: Rc<dyn TronProvider>) -> Self {
        self.tron = Some(provider);
        self
    }

    pub fn evm(&self) -> Option<Rc<dyn EvmProvider>> {
        self.evm.clone()
    }

    pub fn solana(&self) -> Option<Rc<dyn SolanaProvider>> {
        self.solana.clone()
    }

    pub fn tron(&self) -> Option<Rc<dyn TronProvider>> {
        self.tron.clone()
    }

    pub fn supports(&self, family: Family) -> bool {
        match family {
            Family::Evm => self.evm.is_some(),
            Family::Solana => self.solana.is_some(),
            Family::Tron => self.tron.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !Family::ALL.into_iter().any(|family| self.supports(family))
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let families: Vec<Family> = Family::ALL
            .into_iter()
            .filter(|family| self.supports(*family))
            .collect();
        f.debug_tuple("ProviderHandle").field(&families).finish()
    }
}

/// What a wallet announces about itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ProviderInfo {
    pub name: String,
    #[serde(rename = "rdns")]
    pub wallet_id: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
}

/// A live provider and the information it announced.
///
/// The chain namespaces may be filled in after the fact, when the wallet
/// didn't announce any (see [`ProviderResolver::find_provider`]).
pub struct ProviderDescriptor {
    info: RefCell<ProviderInfo>,
    provider: ProviderHandle,
}

impl ProviderDescriptor {
    pub fn new(info: ProviderInfo, provider: ProviderHandle) -> Self {
        Self {
            info: RefCell::new(info),
            provider,
        }
    }

    pub fn wallet_id(&self) -> String {
        self.info.borrow().wallet_id.clone()
    }

    pub fn name(&self) -> String {
        self.info.borrow().name.clone()
    }

    pub fn icon(&self) -> Option<String> {
        self.info.borrow().icon.clone()
    }

    pub fn chains(&self) -> Vec<String> {
        self.info.borrow().chains.clone()
    }

    pub fn info(&self) -> ProviderInfo {
        self.info.borrow().clone()
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    fn has_chains(&self) -> bool {
        !self.info.borrow().chains.is_empty()
    }

    fn set_chains(&self, chains: Vec<String>) {
        self.info.borrow_mut().chains = chains;
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("info", &*self.info.borrow())
            .field("provider", &self.provider)
            .finish()
    }
}

/// removes the subscription it was returned for
pub type Unsubscribe = Box<dyn FnOnce()>;

/// Registry of the providers announced in the page.
pub trait ProviderRegistry {
    fn providers(&self) -> Vec<Rc<ProviderDescriptor>>;

    /// be notified when a new provider announces itself
    ///
    /// Registries that cannot notify return `None`.
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Option<Unsubscribe> {
        let _ = listener;
        None
    }
}

/// the global objects wallets inject in the page, one per family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalSlot {
    /// `window.ethereum`
    Ethereum,
    /// `window.solana`
    Solana,
    /// `window.tronLink`, or `window.tronWeb` for older versions
    Tron,
}

impl GlobalSlot {
    pub fn name(&self) -> &'static str {
        match self {
            GlobalSlot::Ethereum => "ethereum",
            GlobalSlot::Solana => "solana",
            GlobalSlot::Tron => "tronLink",
        }
    }
}

pub trait GlobalProviders {
    fn global(&self, slot: GlobalSlot) -> Option<ProviderHandle>;
}

/// wallets that may be found through a global object, with the
/// information the registry would have given
pub(crate) struct KnownGlobal {
    pub wallet_id: &'static str,
    pub name: &'static str,
    pub chain: &'static str,
    pub slot: GlobalSlot,
}

pub(crate) const KNOWN_GLOBALS: &[KnownGlobal] = &[
    KnownGlobal {
        wallet_id: "io.metamask",
        name: "MetaMask",
        chain: "eip155:1",
        slot: GlobalSlot::Ethereum,
    },
    KnownGlobal {
        wallet_id: "io.rabby",
        name: "Rabby Wallet",
        chain: "eip155:1",
        slot: GlobalSlot::Ethereum,
    },
    KnownGlobal {
        wallet_id: "phantom",
        name: "Phantom",
        chain: "solana:101",
        slot: GlobalSlot::Solana,
    },
    KnownGlobal {
        wallet_id: "tronlink",
        name: "TronLink",
        chain: "tron:0x2b6653dc",
        slot: GlobalSlot::Tron,
    },
];

/// the main network namespace assumed for a wallet announcing no chain
fn default_chain(family: Family) -> &'static str {
    match family {
        Family::Evm => "eip155:1",
        Family::Solana => "solana:101",
        Family::Tron => "tron:0x2b6653dc",
    }
}

pub(crate) fn infer_chains(wallet_id: &str) -> Vec<String> {
    KNOWN_WALLETS
        .iter()
        .find(|(fragment, _)| wallet_id.contains(fragment))
        .map(|(_, family)| vec![default_chain(*family).to_owned()])
        .unwrap_or_default()
}

pub struct ProviderResolver {
    registry: Rc<dyn ProviderRegistry>,
    globals: Rc<dyn GlobalProviders>,
}

impl ProviderResolver {
    pub fn new(registry: Rc<dyn ProviderRegistry>, globals: Rc<dyn GlobalProviders>) -> Self {
        Self { registry, globals }
    }

    pub fn registry(&self) -> &Rc<dyn ProviderRegistry> {
        &self.registry
    }

    pub fn globals(&self) -> &Rc<dyn GlobalProviders> {
        &self.globals
    }

    /// Find the live provider of the given wallet.
    ///
    /// The registry is looked up first. A registry entry announcing no
    /// chain namespace gets them inferred from its wallet id, and keeps
    /// them for the next lookups. Without a registry entry the known
    /// global objects are tried.
    pub fn find_provider(&self, wallet_id: &str) -> Option<Rc<ProviderDescriptor>> {
        debug!(wallet_id, "Looking for registered provider");
        if let Some(descriptor) = self
            .registry
            .providers()
            .into_iter()
            .find(|descriptor| descriptor.wallet_id() == wallet_id)
        {
            if !descriptor.has_chains() {
                let chains = infer_chains(wallet_id);
                debug!(wallet_id, ?chains, "Inferred chains");
                descriptor.set_chains(chains);
            }
            return Some(descriptor);
        }

        self.global_provider(wallet_id)
    }

    fn global_provider(&self, wallet_id: &str) -> Option<Rc<ProviderDescriptor>> {
        let known = KNOWN_GLOBALS.iter().find(|g| g.wallet_id == wallet_id)?;
        let Some(provider) = self.globals.global(known.slot) else {
            debug!(wallet_id, "No provider found");
            return None;
        };

        debug!(wallet_id, slot = known.slot.name(), "Found global provider");
        Some(Rc::new(ProviderDescriptor::new(
            ProviderInfo {
                name: known.name.to_owned(),
                wallet_id: known.wallet_id.to_owned(),
                icon: None,
                chains: vec![known.chain.to_owned()],
            },
            provider,
        )))
    }
}

/// in memory [`ProviderRegistry`], wallets are announced by hand
#[derive(Default)]
pub struct MemoryRegistry {
    providers: RefCell<Vec<Rc<ProviderDescriptor>>>,
    listeners: Rc<RefCell<Vec<(u64, Rc<dyn Fn()>)>>>,
    next_listener: Cell<u64>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// add (or replace, same wallet id) a provider and notify subscribers
    pub fn announce(&self, descriptor: ProviderDescriptor) {
        let descriptor = Rc::new(descriptor);
        {
            let mut providers = self.providers.borrow_mut();
            providers.retain(|p| p.wallet_id() != descriptor.wallet_id());
            providers.push(descriptor);
        }

        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl ProviderRegistry for MemoryRegistry {
    fn providers(&self) -> Vec<Rc<ProviderDescriptor>> {
        self.providers.borrow().clone()
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Option<Unsubscribe> {
        let id = self.next_listener.get() + 1;
        self.next_listener.set(id);
        self.listeners.borrow_mut().push((id, listener));

        let listeners = Rc::downgrade(&self.listeners);
        Some(Box::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        }))
    }
}

/// in memory [`GlobalProviders`]
#[derive(Default)]
pub struct MemoryGlobals {
    slots: RefCell<HashMap<GlobalSlot, ProviderHandle>>,
}

impl MemoryGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, slot: GlobalSlot, provider: ProviderHandle) {
        self.slots.borrow_mut().insert(slot, provider);
    }

    pub fn remove(&self, slot: GlobalSlot) {
        self.slots.borrow_mut().remove(&slot);
    }
}

impl GlobalProviders for MemoryGlobals {
    fn global(&self, slot: GlobalSlot) -> Option<ProviderHandle> {
        self.slots.borrow().get(&slot).cloned()
    }
}
