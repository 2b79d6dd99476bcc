use super::{JsListeners, call_async, global, property, to_js, to_json};
use crate::{
    adapter::{TronAccessResponse, TronProvider},
    error::{ProviderError, ProviderErrorCode},
    provider::{EventListener, EventSource, ListenerId},
};
use async_trait::async_trait;
use js_sys::{Array, Object};
use serde_json::{Value, json};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};
use wasm_bindgen::prelude::*;

/// TronLink, through `window.tronLink` and its `tronWeb` instance.
///
/// TronLink replaces `tronWeb` once the page is authorized, it is looked
/// up again on every use (`tronLink.tronWeb`, then `window.tronWeb`).
///
/// Account changes are not emitted by `tronWeb` but posted to the window
/// as `{ message: { action: "setAccount", data: { address } } }`, as is
/// `disconnect`. The other events are subscribed on `tronWeb` when it
/// supports it.
pub struct JsTronProvider {
    tron_link: Option<JsValue>,
    listeners: RefCell<Option<JsListeners>>,
    messages: RefCell<HashMap<ListenerId, Closure<dyn FnMut(web_sys::MessageEvent)>>>,
    next_message: Cell<u64>,
}

/// events TronLink posts to the window instead of emitting them
const WINDOW_ACTIONS: &[&str] = &["setAccount", "disconnect"];

impl JsTronProvider {
    pub fn new(tron_link: Option<JsValue>) -> Self {
        Self {
            tron_link,
            listeners: RefCell::new(None),
            messages: RefCell::new(HashMap::new()),
            next_message: Cell::new(0),
        }
    }

    /// `tronWeb` is `false` until TronLink is ready
    fn tron_web(&self) -> Option<JsValue> {
        self.tron_link
            .as_ref()
            .and_then(|tron_link| property(tron_link, "tronWeb"))
            .filter(|tron_web| tron_web.is_object())
            .or_else(|| global("tronWeb"))
    }

    fn node(&self, name: &str) -> Option<JsValue> {
        property(&self.tron_web()?, name)
    }

    /// subscribe on the current `tronWeb`, a new one is only picked up
    /// once nothing listens to the previous one
    fn on_tron_web(&self, event: &str, listener: EventListener) -> ListenerId {
        let tron_web = self.tron_web().unwrap_or(JsValue::UNDEFINED);
        let mut listeners = self.listeners.borrow_mut();
        let listeners = match listeners.take() {
            Some(current) if !current.is_empty() || current.target() == &tron_web => {
                listeners.insert(current)
            }
            _ => listeners.insert(JsListeners::new(tron_web, to_json)),
        };
        listeners.on(event, listener)
    }

    fn on_message(&self, action: &'static str, listener: EventListener) -> ListenerId {
        // counted down so they never collide with the provider listener ids
        let id = ListenerId(u64::MAX - self.next_message.get());
        self.next_message.set(self.next_message.get() + 1);

        let closure = Closure::<dyn FnMut(web_sys::MessageEvent)>::new(
            move |event: web_sys::MessageEvent| {
                let Some(message) = property(&event.data(), "message") else {
                    return;
                };
                if property(&message, "action").and_then(|a| a.as_string()).as_deref()
                    != Some(action)
                {
                    return;
                }
                listener(to_json(property(&message, "data").unwrap_or(JsValue::NULL)));
            },
        );

        if let Some(window) = web_sys::window() {
            if let Err(error) = window
                .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            {
                tracing::warn!(?error, "Couldn't listen to the window messages");
            }
        }
        self.messages.borrow_mut().insert(id, closure);
        id
    }

    fn remove_message(&self, id: ListenerId) {
        let Some(closure) = self.messages.borrow_mut().remove(&id) else {
            return;
        };
        if let Some(window) = web_sys::window() {
            let _ = window
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for JsTronProvider {
    fn drop(&mut self) {
        let ids: Vec<ListenerId> = self.messages.borrow().keys().copied().collect();
        for id in ids {
            self.remove_message(id);
        }
    }
}

impl EventSource for JsTronProvider {
    fn on(&self, event: &str, listener: EventListener) -> ListenerId {
        match WINDOW_ACTIONS.iter().find(|action| **action == event) {
            Some(action) => self.on_message(*action, listener),
            None => self.on_tron_web(event, listener),
        }
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        if WINDOW_ACTIONS.iter().any(|action| *action == event) {
            self.remove_message(id)
        } else if let Some(listeners) = self.listeners.borrow().as_ref() {
            listeners.remove(event, id)
        }
    }
}

#[async_trait(?Send)]
impl TronProvider for JsTronProvider {
    fn default_address(&self) -> Option<String> {
        // `base58` is `false` until the page is authorized
        self.tron_web()
            .and_then(|tron_web| property(&tron_web, "defaultAddress"))
            .and_then(|address| property(&address, "base58"))
            .and_then(|base58| base58.as_string())
            .filter(|base58| !base58.is_empty())
    }

    async fn request_accounts(&self) -> Result<Option<TronAccessResponse>, ProviderError> {
        let Some(tron_link) = &self.tron_link else {
            return Err(ProviderError::with_code(
                ProviderErrorCode::UnsupportedMethod,
                "tron_requestAccounts is not available",
            ));
        };

        let arguments = to_js(&json!({ "method": "tron_requestAccounts" }))
            .map_err(ProviderError::from_js)?;
        let response = call_async(tron_link, "request", &Array::of1(&arguments)).await?;

        // TronLink answers with nothing at all while locked
        if response.is_undefined() || response.is_null() || response.as_string().is_some() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(response)
            .map(Some)
            .map_err(|decode_error| {
                ProviderError::new(format!("Couldn't decode the TronLink answer: {decode_error}"))
            })
    }

    async fn node_info(&self) -> Result<Value, ProviderError> {
        let full_node = self
            .node("fullNode")
            .ok_or_else(|| ProviderError::new("tronWeb has no full node"))?;
        let arguments = Array::of3(
            &JsValue::from_str("/wallet/getnodeinfo"),
            &Object::new(),
            &JsValue::from_str("post"),
        );
        call_async(&full_node, "request", &arguments)
            .await
            .map(to_json)
    }

    fn node_hosts(&self) -> Vec<String> {
        ["fullNode", "solidityNode", "eventServer"]
            .into_iter()
            .filter_map(|name| self.node(name))
            .filter_map(|node| property(&node, "host"))
            .filter_map(|host| host.as_string())
            .collect()
    }
}
