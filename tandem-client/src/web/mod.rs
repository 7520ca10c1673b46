//! Browser implementations of the engine seams plus the `RoomSession`
//! export used by the room page.

mod logger;
mod media;
mod peer;
mod session;
mod socket;

pub use logger::Logger;
pub use media::{BrowserMedia, MediaStore};
pub use peer::{BrowserPeer, BrowserPeerFactory};
pub use session::RoomSession;
pub use socket::{BrowserConnector, BrowserSocket};

use wasm_bindgen::{JsCast, JsValue};

pub(crate) fn js_text(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<web_sys::DomException>() {
        return err.message();
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return err.message().into();
    }
    format!("{:?}", value)
}
