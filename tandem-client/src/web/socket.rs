use async_trait::async_trait;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use crate::engine::{SignalTransport, TransportConnector, TransportEvent, TransportEventSink};
use crate::error::TransportError;
use crate::web::js_text;

/// Path of the signaling endpoint on the page's own host.
pub const SIGNALING_PATH: &str = "/ws";

pub struct BrowserConnector {
    url: String,
}

impl BrowserConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// `wss://` when the page was served over https, `ws://` otherwise.
    pub fn for_current_page() -> Result<Self, TransportError> {
        let location = web_sys::window()
            .ok_or_else(|| TransportError::Connect("no window".to_string()))?
            .location();
        let protocol = location
            .protocol()
            .map_err(|e| TransportError::Connect(js_text(&e)))?;
        let host = location
            .host()
            .map_err(|e| TransportError::Connect(js_text(&e)))?;
        let scheme = if protocol == "https:" { "wss" } else { "ws" };
        Ok(Self::new(format!("{}://{}{}", scheme, host, SIGNALING_PATH)))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait(?Send)]
impl TransportConnector for BrowserConnector {
    type Transport = BrowserSocket;

    async fn connect(&self, events: TransportEventSink) -> Result<BrowserSocket, TransportError> {
        BrowserSocket::open(&self.url, events)
    }
}

/// A browser `WebSocket` reporting into a [`TransportEventSink`].
pub struct BrowserSocket {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut(JsValue)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

impl BrowserSocket {
    fn open(url: &str, events: TransportEventSink) -> Result<Self, TransportError> {
        let ws = WebSocket::new(url).map_err(|e| TransportError::Connect(js_text(&e)))?;

        let on_open = {
            let events = events.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                events.emit(TransportEvent::Opened);
            }) as Box<dyn FnMut(JsValue)>)
        };
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let on_message = {
            let events = events.clone();
            Closure::wrap(Box::new(move |ev: MessageEvent| {
                if let Some(text) = ev.data().as_string() {
                    events.emit(TransportEvent::Message(text));
                }
            }) as Box<dyn FnMut(MessageEvent)>)
        };
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_close = {
            let events = events.clone();
            Closure::wrap(Box::new(move |_: CloseEvent| {
                events.emit(TransportEvent::Closed);
            }) as Box<dyn FnMut(CloseEvent)>)
        };
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let on_error = Closure::wrap(Box::new(move |err: JsValue| {
            events.emit(TransportEvent::Error(js_text(&err)));
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        })
    }
}

impl SignalTransport for BrowserSocket {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        if self.ws.ready_state() != WebSocket::OPEN {
            return Err(TransportError::Closed);
        }
        self.ws
            .send_with_str(text)
            .map_err(|e| TransportError::Send(js_text(&e)))
    }

    fn close(&self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        let _ = self.ws.close();
    }
}
