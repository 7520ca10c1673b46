use wasm_bindgen::JsValue;
use web_sys::console;

/// Writes to the browser console. `tracing` has no subscriber in the page,
/// so anything the user may need to see goes through here.
pub struct Logger;

impl Logger {
    pub fn info(msg: &str) {
        console::log_1(&format!("[tandem] {}", msg).into());
    }

    pub fn warn(msg: &str) {
        console::warn_1(&format!("[tandem] {}", msg).into());
    }

    pub fn error(err: &JsValue) {
        console::error_2(&"[tandem]".into(), err);
    }
}
