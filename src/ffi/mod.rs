//! Browser implementations of the collaborators of the [`WalletManager`]
//! and its JS bindings.
//!
//! [`WalletManager`]: crate::WalletManager

mod bindings;
pub mod eip1193;
pub mod solana;
pub mod storage;
pub mod tron;
pub mod window;

pub use self::{
    bindings::JsWalletManager,
    eip1193::{Eip1193Provider, JsEvmProvider},
    solana::JsSolanaProvider,
    storage::LocalStorage,
    tron::JsTronProvider,
    window::{BrowserGlobals, Eip6963Registry},
};
use crate::{
    error::{ProviderError, ProviderErrorCode},
    provider::{EventListener, ListenerId},
};
use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize as _;
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// `target[name]`, `None` if undefined or null
fn property(target: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// `window[name]`, when it's an object
fn global(name: &str) -> Option<JsValue> {
    web_sys::window()
        .and_then(|window| property(&window, name))
        .filter(|value| value.is_object())
}

fn method(target: &JsValue, name: &str) -> Option<Function> {
    property(target, name).and_then(|value| value.dyn_into::<Function>().ok())
}

/// Call `target[name](...args)` and wait for the result, promise or not.
async fn call_async(target: &JsValue, name: &str, args: &Array) -> Result<JsValue, ProviderError> {
    let function = method(target, name).ok_or_else(|| {
        ProviderError::with_code(
            ProviderErrorCode::UnsupportedMethod,
            format!("`{name}' is not available"),
        )
    })?;
    let value = Reflect::apply(&function, target, args).map_err(ProviderError::from_js)?;
    JsFuture::from(Promise::resolve(&value))
        .await
        .map_err(ProviderError::from_js)
}

fn to_json(value: JsValue) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    serde_wasm_bindgen::from_value(value).unwrap_or(Value::Null)
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).map_err(JsValue::from)
}

impl ProviderError {
    /// Decode the error a wallet rejected a promise with.
    ///
    /// Wallets throw plain `{ code, message }` objects as well as `Error`
    /// instances, whose fields are not enumerable.
    pub fn from_js(error: JsValue) -> Self {
        if let Ok(decoded) = serde_wasm_bindgen::from_value::<ProviderError>(error.clone()) {
            if !decoded.message.is_empty() {
                return decoded;
            }
        }

        let code = property(&error, "code")
            .and_then(|code| code.as_f64())
            .map(|code| ProviderErrorCode::from_code(code as i64));
        let message = property(&error, "message")
            .and_then(|message| message.as_string())
            .or_else(|| error.as_string())
            .unwrap_or_else(|| format!("{error:?}"));

        Self { code, message }
    }
}

/// Listeners registered on a JS event emitter (`on`/`removeListener`).
///
/// The closures handed to JS are kept alive until removed. `decode` turns
/// the payload of the events into JSON.
pub(crate) struct JsListeners {
    target: JsValue,
    decode: fn(JsValue) -> Value,
    closures: RefCell<HashMap<ListenerId, (String, Closure<dyn FnMut(JsValue)>)>>,
    next_id: Cell<u64>,
}

impl JsListeners {
    pub fn new(target: JsValue, decode: fn(JsValue) -> Value) -> Self {
        Self {
            target,
            decode,
            closures: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let decode = self.decode;
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| listener(decode(payload)));

        match method(&self.target, "on") {
            Some(on) => {
                if let Err(error) = on.call2(&self.target, &JsValue::from_str(event), closure.as_ref())
                {
                    tracing::warn!(event, ?error, "Couldn't subscribe to the wallet");
                }
            }
            None => tracing::debug!(event, "The wallet doesn't emit events"),
        }

        self.closures
            .borrow_mut()
            .insert(id, (event.to_owned(), closure));
        id
    }

    pub fn target(&self) -> &JsValue {
        &self.target
    }

    pub fn is_empty(&self) -> bool {
        self.closures.borrow().is_empty()
    }

    pub fn remove(&self, event: &str, id: ListenerId) {
        let Some((registered, closure)) = self.closures.borrow_mut().remove(&id) else {
            return;
        };
        debug_assert_eq!(registered, event);

        let remove = method(&self.target, "removeListener").or_else(|| method(&self.target, "off"));
        if let Some(remove) = remove {
            let _ = remove.call2(&self.target, &JsValue::from_str(event), closure.as_ref());
        }
    }
}

impl Drop for JsListeners {
    fn drop(&mut self) {
        let ids: Vec<(ListenerId, String)> = self
            .closures
            .borrow()
            .iter()
            .map(|(id, (event, _))| (*id, event.clone()))
            .collect();
        for (id, event) in ids {
            self.remove(&event, id);
        }
    }
}
