use super::{JsListeners, call_async, method, property, to_json};
use crate::{
    adapter::SolanaProvider,
    error::ProviderError,
    provider::{EventListener, EventSource, ListenerId},
};
use async_trait::async_trait;
use js_sys::{Array, Object, Reflect};
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// A Solana wallet provider (`window.solana`, `window.phantom.solana`, ...).
pub struct JsSolanaProvider {
    provider: JsValue,
    listeners: JsListeners,
}

impl JsSolanaProvider {
    pub fn new(provider: JsValue) -> Self {
        let listeners = JsListeners::new(provider.clone(), public_key_payload);
        Self {
            provider,
            listeners,
        }
    }
}

/// base58 form of a `PublicKey` object
fn base58(public_key: &JsValue) -> Option<String> {
    if let Some(public_key) = public_key.as_string() {
        return Some(public_key);
    }
    let to_base58 = method(public_key, "toBase58").or_else(|| method(public_key, "toString"))?;
    to_base58.call0(public_key).ok()?.as_string()
}

/// `accountChanged` gives a `PublicKey` object, decoded to its base58 form
fn public_key_payload(payload: JsValue) -> Value {
    match base58(&payload) {
        Some(public_key) if payload.is_object() => Value::String(public_key),
        _ => to_json(payload),
    }
}

impl EventSource for JsSolanaProvider {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        self.listeners.on(event, listener)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        self.listeners.remove(event, id)
    }
}

#[async_trait(?Send)]
impl SolanaProvider for JsSolanaProvider {
    async fn connect(&self, only_if_trusted: bool) -> Result<Option<String>, ProviderError> {
        let options = Object::new();
        if only_if_trusted {
            Reflect::set(&options, &"onlyIfTrusted".into(), &JsValue::TRUE)
                .map_err(ProviderError::from_js)?;
        }

        let response = call_async(&self.provider, "connect", &Array::of1(&options)).await?;
        // some wallets resolve with nothing and expose the key on the provider
        let public_key =
            property(&response, "publicKey").or_else(|| property(&self.provider, "publicKey"));

        Ok(public_key.as_ref().and_then(base58))
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        call_async(&self.provider, "disconnect", &Array::new()).await?;
        Ok(())
    }

    fn rpc_endpoint(&self) -> Option<String> {
        property(&self.provider, "_rpcEndpoint")
            .or_else(|| property(&self.provider, "_apiEndpoint"))
            .or_else(|| {
                property(&self.provider, "connection")
                    .and_then(|connection| property(&connection, "rpcEndpoint"))
            })
            .and_then(|endpoint| endpoint.as_string())
    }
}
