//! Weak reference to a [`MediaManager`] exported to the JS side.
//!
//! [`MediaManager`]: crate::media::MediaManager

use derive_more::From;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::media;

use super::{error::StagehandError, input_device_info::InputDeviceInfo};

/// Weak reference to a [`MediaManager`].
///
/// Like all the handles it contains a weak reference to the object
/// managed by Rust, so its methods fail once the manager is disposed.
///
/// [`MediaManager`]: media::MediaManager
#[wasm_bindgen]
#[derive(Clone, From)]
pub struct MediaManagerHandle(media::MediaManagerHandle);

#[wasm_bindgen]
impl MediaManagerHandle {
    /// Returns a list of [`InputDeviceInfo`] objects representing the
    /// connected video input devices.
    ///
    /// Fails soft: an enumeration error resolves to an empty array.
    pub fn enumerate_devices(&self) -> Promise {
        let this = self.0.clone();
        future_to_promise(async move {
            this.enumerate_devices()
                .await
                .map(|devices| {
                    devices
                        .into_iter()
                        .fold(js_sys::Array::new(), |array, info| {
                            array.push(&JsValue::from(
                                InputDeviceInfo::from(info),
                            ));
                            array
                        })
                        .into()
                })
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Re-acquires the camera pinned to the given device.
    pub fn switch_camera(&self, device_id: String) -> Promise {
        let this = self.0.clone();
        future_to_promise(async move {
            this.switch_camera(device_id)
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Returns the current camera permission state
    /// (`unknown`/`prompt`/`granted`/`denied`).
    ///
    /// # Errors
    ///
    /// If the manager was disposed.
    pub fn permission_state(&self) -> Result<String, JsValue> {
        self.0
            .permission_state()
            .map(|state| state.to_string().to_lowercase())
            .map_err(StagehandError::from)
            .map_err(JsValue::from)
    }

    /// Indicates whether the camera permission is permanently denied,
    /// which requires changing the browser settings to recover.
    ///
    /// # Errors
    ///
    /// If the manager was disposed.
    pub fn is_permanently_denied(&self) -> Result<bool, JsValue> {
        self.0
            .is_permanently_denied()
            .map_err(StagehandError::from)
            .map_err(JsValue::from)
    }
}
