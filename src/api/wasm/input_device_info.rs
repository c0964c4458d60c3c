//! Media input device info exported to the JS side.

use derive_more::From;
use wasm_bindgen::prelude::*;

use crate::platform;

/// [MediaDeviceInfo][1] of a video input device.
///
/// [1]: https://w3.org/TR/mediacapture-streams/#device-info
#[wasm_bindgen]
#[derive(From)]
pub struct InputDeviceInfo(platform::InputDeviceInfo);

#[wasm_bindgen]
impl InputDeviceInfo {
    /// Returns the unique identifier of the represented device.
    #[must_use]
    pub fn device_id(&self) -> String {
        self.0.device_id()
    }

    /// Returns the kind of the represented device (`audio`/`video`).
    #[must_use]
    pub fn kind(&self) -> String {
        self.0.kind().to_string().to_lowercase()
    }

    /// Returns the label describing the represented device (for example
    /// "External USB Webcam"), or an empty string if none is associated.
    #[must_use]
    pub fn label(&self) -> String {
        self.0.label()
    }
}
