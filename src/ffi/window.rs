//! The providers wallets inject in the page.

use super::{
    JsEvmProvider, JsSolanaProvider, JsTronProvider, eip1193::looks_like_eip1193_provider, global,
    property,
};
use crate::provider::{
    GlobalProviders, GlobalSlot, MemoryRegistry, ProviderDescriptor, ProviderHandle, ProviderInfo,
    ProviderRegistry, Unsubscribe,
};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

const ANNOUNCE_PROVIDER: &str = "eip6963:announceProvider";
const REQUEST_PROVIDER: &str = "eip6963:requestProvider";

/// The global objects of the page: `window.ethereum`, `window.solana`
/// (or `window.phantom.solana`) and `window.tronLink`.
///
/// The globals are read on every lookup, extensions may inject them after
/// the page has loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserGlobals;

impl BrowserGlobals {
    fn ethereum() -> Option<ProviderHandle> {
        let ethereum = global("ethereum").filter(looks_like_eip1193_provider)?;
        Some(ProviderHandle::default().with_evm(Rc::new(JsEvmProvider::new(ethereum.unchecked_into()))))
    }

    fn solana() -> Option<ProviderHandle> {
        let phantom = global("phantom");
        let solana = phantom
            .as_ref()
            .and_then(|phantom| property(phantom, "solana"))
            .or_else(|| global("solana"))
            .filter(|solana| solana.is_object())?;

        let mut handle =
            ProviderHandle::default().with_solana(Rc::new(JsSolanaProvider::new(solana)));
        // Phantom speaks for EVM chains as well
        if let Some(ethereum) = phantom
            .as_ref()
            .and_then(|phantom| property(phantom, "ethereum"))
            .filter(looks_like_eip1193_provider)
        {
            handle = handle.with_evm(Rc::new(JsEvmProvider::new(ethereum.unchecked_into())));
        }
        Some(handle)
    }

    /// TronLink is there as soon as one of its objects is: `tronWeb` only
    /// shows up once the page is authorized.
    fn tron() -> Option<ProviderHandle> {
        let tron_link = global("tronLink");
        if tron_link.is_none() && global("tronWeb").is_none() {
            return None;
        }
        Some(ProviderHandle::default().with_tron(Rc::new(JsTronProvider::new(tron_link))))
    }
}

impl GlobalProviders for BrowserGlobals {
    fn global(&self, slot: GlobalSlot) -> Option<ProviderHandle> {
        match slot {
            GlobalSlot::Ethereum => Self::ethereum(),
            GlobalSlot::Solana => Self::solana(),
            GlobalSlot::Tron => Self::tron(),
        }
    }
}

/// The EIP-6963 providers announced in the page.
///
/// Listens to `eip6963:announceProvider` as long as it lives and requests
/// the wallets to announce themselves on creation.
pub struct Eip6963Registry {
    registry: Rc<MemoryRegistry>,
    listener: Option<Closure<dyn FnMut(web_sys::CustomEvent)>>,
}

impl Eip6963Registry {
    pub fn new() -> Self {
        let registry = Rc::new(MemoryRegistry::new());
        let listener = Self::listen(Rc::downgrade(&registry));
        let this = Self { registry, listener };
        this.request_providers();
        this
    }

    fn listen(registry: Weak<MemoryRegistry>) -> Option<Closure<dyn FnMut(web_sys::CustomEvent)>> {
        let Some(window) = web_sys::window() else {
            warn!("No window, EIP-6963 providers won't be discovered");
            return None;
        };

        let listener = Closure::<dyn FnMut(web_sys::CustomEvent)>::new(
            move |event: web_sys::CustomEvent| {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                match decode_announcement(&event.detail()) {
                    Some(descriptor) => {
                        debug!(wallet_id = descriptor.wallet_id(), "Provider announced");
                        registry.announce(descriptor);
                    }
                    None => debug!("Ignoring malformed provider announcement"),
                }
            },
        );

        if let Err(error) = window
            .add_event_listener_with_callback(ANNOUNCE_PROVIDER, listener.as_ref().unchecked_ref())
        {
            warn!(?error, "Couldn't listen to the provider announcements");
            return None;
        }
        Some(listener)
    }

    /// ask the wallets to announce themselves (again)
    pub fn request_providers(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let dispatched = web_sys::Event::new(REQUEST_PROVIDER)
            .and_then(|event| window.dispatch_event(&event));
        if let Err(error) = dispatched {
            warn!(?error, "Couldn't request the providers");
        }
    }
}

impl Default for Eip6963Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// `{ info: { uuid, name, icon, rdns }, provider }`
fn decode_announcement(detail: &JsValue) -> Option<ProviderDescriptor> {
    let info: ProviderInfo = serde_wasm_bindgen::from_value(property(detail, "info")?).ok()?;
    let provider = property(detail, "provider").filter(looks_like_eip1193_provider)?;

    Some(ProviderDescriptor::new(
        info,
        ProviderHandle::default().with_evm(Rc::new(JsEvmProvider::new(provider.unchecked_into()))),
    ))
}

impl Drop for Eip6963Registry {
    fn drop(&mut self) {
        let (Some(window), Some(listener)) = (web_sys::window(), self.listener.take()) else {
            return;
        };
        let _ = window
            .remove_event_listener_with_callback(ANNOUNCE_PROVIDER, listener.as_ref().unchecked_ref());
    }
}

impl ProviderRegistry for Eip6963Registry {
    fn providers(&self) -> Vec<Rc<ProviderDescriptor>> {
        self.registry.providers()
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Option<Unsubscribe> {
        self.registry.subscribe(listener)
    }
}
