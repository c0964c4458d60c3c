//! Inspection of the browser environment.

use wasm_bindgen::JsValue;

use crate::platform::EnvCapabilities;

use super::window;

/// Returns the raw capabilities of the browser environment.
#[must_use]
pub fn capabilities() -> EnvCapabilities {
    let window = window();
    let navigator = window.navigator();

    let media_devices = navigator.media_devices().ok();
    let has = |target: &JsValue, name: &str| {
        js_sys::Reflect::has(target, &JsValue::from_str(name))
            .unwrap_or(false)
    };

    EnvCapabilities {
        media_devices: media_devices
            .as_ref()
            .map_or(false, |md| has(md.as_ref(), "getUserMedia")),
        recorder: has(window.as_ref(), "MediaRecorder"),
        device_enumeration: media_devices
            .as_ref()
            .map_or(false, |md| has(md.as_ref(), "enumerateDevices")),
        display_media: media_devices
            .as_ref()
            .map_or(false, |md| has(md.as_ref(), "getDisplayMedia")),
        secure_context: window.is_secure_context(),
        user_agent: navigator.user_agent().unwrap_or_default(),
    }
}
