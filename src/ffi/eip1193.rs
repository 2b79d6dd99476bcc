use super::{JsListeners, to_js, to_json};
use crate::{
    adapter::EvmProvider,
    error::ProviderError,
    provider::{EventListener, EventSource, ListenerId},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// The provider object of an EVM wallet, as specified by EIP-1193.
    ///
    /// Injected as `window.ethereum` or announced through EIP-6963.
    #[derive(Clone, PartialEq)]
    pub type Eip1193Provider;

    /// Submit a JSON-RPC request `{ method, params }` to the wallet.
    ///
    /// Rejects with a `ProviderRpcError`, `{ code, message, data? }`.
    #[wasm_bindgen(method, catch)]
    pub async fn request(this: &Eip1193Provider, arguments: JsValue) -> Result<JsValue, JsValue>;
}

/// Whether the value has the shape of an EIP-1193 provider.
pub fn looks_like_eip1193_provider(value: &JsValue) -> bool {
    value.is_object()
        && js_sys::Reflect::get(value, &JsValue::from_str("request"))
            .map(|request| request.is_function())
            .unwrap_or(false)
}

pub struct JsEvmProvider {
    provider: Eip1193Provider,
    listeners: JsListeners,
}

impl JsEvmProvider {
    pub fn new(provider: Eip1193Provider) -> Self {
        let listeners = JsListeners::new(provider.clone().into(), to_json);
        Self {
            provider,
            listeners,
        }
    }
}

impl EventSource for JsEvmProvider {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        self.listeners.on(event, listener)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

#[async_trait(?Send)]
impl EvmProvider for JsEvmProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let arguments = to_js(&json!({ "method": method, "params": params }))
            .map_err(ProviderError::from_js)?;

        match self.provider.request(arguments).await {
            Ok(result) => Ok(to_json(result)),
            Err(error) => Err(ProviderError::from_js(error)),
        }
    }
}
