use futures::StreamExt;
use tandem_core::{Role, RoomCode};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::MediaStream;

use crate::config::{RoomLocation, SessionConfig, join_url};
use crate::negotiator::{Negotiator, SessionHandle, SessionUpdate};
use crate::web::{BrowserConnector, BrowserMedia, BrowserPeerFactory, Logger, MediaStore};

/// One room session on the page.
///
/// `onUpdate` receives plain objects with a `kind` field: `status`,
/// `local-stream` and `remote-stream` (carrying the `MediaStream` to attach
/// to a video element), `room-full` and `error`.
#[wasm_bindgen]
pub struct RoomSession {
    handle: SessionHandle,
    role: Role,
    code: String,
}

#[wasm_bindgen]
impl RoomSession {
    #[wasm_bindgen(constructor)]
    pub fn new(
        room_code: String,
        role: String,
        on_update: js_sys::Function,
    ) -> Result<RoomSession, JsValue> {
        let role = role.parse::<Role>().unwrap_or(Role::Host);
        Self::start(SessionConfig::new(room_code, role), on_update)
    }

    /// Reads code and role from `/room/<code>?role=...` and leaves the room
    /// when the page unloads. The leave finishes inside the unload handler,
    /// since queued work never runs once the page is gone.
    #[wasm_bindgen(js_name = fromLocation)]
    pub fn from_location(on_update: js_sys::Function) -> Result<RoomSession, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let location = window.location();
        let parsed = RoomLocation::parse(&location.pathname()?, &location.search()?);
        let session = Self::start(parsed.into_config(), on_update)?;

        let handle = session.handle.clone();
        let on_unload = Closure::wrap(Box::new(move |_: JsValue| {
            handle.leave();
        }) as Box<dyn FnMut(JsValue)>);
        window.set_onbeforeunload(Some(on_unload.as_ref().unchecked_ref()));
        on_unload.forget();

        Ok(session)
    }

    #[wasm_bindgen(getter)]
    pub fn role(&self) -> String {
        self.role.to_string()
    }

    #[wasm_bindgen(getter, js_name = roomCode)]
    pub fn room_code(&self) -> String {
        RoomCode::normalize_input(&self.code)
    }

    /// Link for the guest device, or `undefined` while the code is invalid.
    #[wasm_bindgen(js_name = joinUrl)]
    pub fn join_url(&self, base: String) -> Option<String> {
        self.room_code()
            .parse::<RoomCode>()
            .ok()
            .map(|code| join_url(&base, &code))
    }

    pub fn rejoin(&self) {
        if !self.handle.rejoin() {
            Logger::warn("session has already ended");
        }
    }

    pub fn leave(&self) {
        self.handle.leave();
    }
}

impl RoomSession {
    fn start(config: SessionConfig, on_update: js_sys::Function) -> Result<RoomSession, JsValue> {
        let connector =
            BrowserConnector::for_current_page().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let store = MediaStore::default();
        let role = config.role;
        let code = config.room_code.clone();
        Logger::info(&format!("joining room {} as {} via {}", code, role, connector.url()));

        let (negotiator, handle, mut updates) = Negotiator::new(
            config,
            BrowserMedia::new(store.clone()),
            BrowserPeerFactory::new(store.clone()),
            connector,
        );
        spawn_local(negotiator.run());
        spawn_local(async move {
            while let Some(update) = updates.next().await {
                deliver(&on_update, &store, update);
            }
        });

        Ok(RoomSession { handle, role, code })
    }
}

fn deliver(callback: &js_sys::Function, store: &MediaStore, update: SessionUpdate) {
    if let SessionUpdate::Error { message } = &update {
        Logger::warn(message);
    }
    let value = match &update {
        SessionUpdate::LocalStream { stream } => stream_update("local-stream", store.get(&stream.id)),
        SessionUpdate::RemoteStream { stream } => {
            stream_update("remote-stream", store.get(&stream.id))
        }
        _ => serde_wasm_bindgen::to_value(&update).map_err(JsValue::from),
    };
    match value {
        Ok(value) => {
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                Logger::error(&e);
            }
        }
        Err(e) => Logger::error(&e),
    }
}

fn stream_update(kind: &str, stream: Option<MediaStream>) -> Result<JsValue, JsValue> {
    let update = js_sys::Object::new();
    js_sys::Reflect::set(&update, &"kind".into(), &kind.into())?;
    if let Some(stream) = stream {
        js_sys::Reflect::set(&update, &"stream".into(), &stream)?;
    }
    Ok(update.into())
}
