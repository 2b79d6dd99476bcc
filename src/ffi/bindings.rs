use super::{BrowserGlobals, Eip6963Registry, LocalStorage, to_js};
use crate::{
    Config, ConnectError, WalletManager,
    events::{EventKind, WalletEvent, WalletEventListener},
    provider::ListenerId,
    storage::{KeyValueStorage, MemoryStorage, SystemClock},
};
use js_sys::{Function, Promise, Reflect};
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// The [`WalletManager`] of the page, as exported to JavaScript.
///
/// ```js
/// const manager = new WalletManager({ connectTimeoutMs: 10000 });
/// manager.on("connected", ({ detail }) => console.log(detail.connection.address));
/// await manager.init();
/// await manager.connect("io.metamask");
/// ```
#[wasm_bindgen(js_name = WalletManager)]
pub struct JsWalletManager {
    manager: WalletManager,
}

#[wasm_bindgen(js_class = WalletManager)]
impl JsWalletManager {
    /// Takes an optional, possibly partial, configuration object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsWalletManager, JsValue> {
        let config: Config = if config.is_undefined() || config.is_null() {
            Config::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };

        let storage: Rc<dyn KeyValueStorage> = match LocalStorage::new() {
            Ok(storage) => Rc::new(storage),
            Err(error) => {
                warn!(%error, "Connections won't be persisted");
                Rc::new(MemoryStorage::new())
            }
        };

        let manager = WalletManager::new(
            config,
            Rc::new(Eip6963Registry::new()),
            Rc::new(BrowserGlobals),
            storage,
            Rc::new(SystemClock),
        );
        Ok(Self { manager })
    }

    /// Restore the connection of the previous visit, if any.
    pub fn init(&self) -> Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            manager.init().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to the connection, or `null` when a reconnection found
    /// nothing to restore.
    pub fn connect(&self, wallet_id: String, is_reconnect: Option<bool>) -> Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            match manager
                .connect_with_timeout(&wallet_id, is_reconnect.unwrap_or(false))
                .await
            {
                Ok(Some(connection)) => to_js(&connection),
                Ok(None) => Ok(JsValue::NULL),
                Err(error) => Err(connect_error(&error)),
            }
        })
    }

    /// Disconnect the given wallet, the active one by default.
    pub fn disconnect(&self, wallet_id: Option<String>) -> Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            manager.disconnect(wallet_id.as_deref()).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = activeConnection)]
    pub fn active_connection(&self) -> Result<JsValue, JsValue> {
        match self.manager.active_connection() {
            Some(connection) => to_js(&connection),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = isConnecting)]
    pub fn is_connecting(&self) -> bool {
        self.manager.is_connecting()
    }

    /// `{ topWallets, groupedWallets: { multiChain, evm, solana, tron }, totalCount }`
    #[wasm_bindgen(js_name = detectedWallets)]
    pub fn detected_wallets(&self) -> Result<JsValue, JsValue> {
        to_js(&self.manager.wallet_groups())
    }

    /// Call `callback({ type, detail })` on every event of the given type.
    ///
    /// Returns the id to give to [`off`](Self::off).
    pub fn on(&self, event: &str, callback: Function) -> Result<f64, JsValue> {
        let kind = EventKind::from_name(event)
            .ok_or_else(|| js_sys::Error::new(&format!("Unknown event `{event}'")))?;

        let listener: WalletEventListener = Rc::new(move |event: &WalletEvent| {
            let payload = match to_js(event) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(?error, "Couldn't encode the event");
                    return;
                }
            };
            if let Err(error) = callback.call1(&JsValue::NULL, &payload) {
                warn!(?error, "Event listener failed");
            }
        });
        Ok(self.manager.on(kind, listener).0 as f64)
    }

    pub fn off(&self, id: f64) -> bool {
        self.manager.off(ListenerId(id as u64))
    }
}

/// an `Error` carrying `code` (for rejections) and `userMessage`
fn connect_error(error: &ConnectError) -> JsValue {
    let js_error = js_sys::Error::new(&error.to_string());
    if let ConnectError::UserRejected { code } = error {
        let _ = Reflect::set(&js_error, &"code".into(), &JsValue::from_f64(*code as f64));
    }
    let _ = Reflect::set(
        &js_error,
        &"userMessage".into(),
        &JsValue::from_str(error.user_message()),
    );
    js_error.into()
}
