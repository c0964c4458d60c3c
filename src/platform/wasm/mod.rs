//! Browser platform adapter (`wasm32-unknown-unknown`), backed by Web
//! APIs.

mod blob;
mod callback;
mod capabilities;
mod constraints;
mod error;
pub mod http;
mod input_device_info;
mod media_devices;
mod media_track;
mod permissions;
mod recorder;
mod utils;

use std::{future::Future, time::Duration};

use wasm_bindgen_futures::JsFuture;

pub use self::{
    blob::Blob,
    callback::{Callback, Function},
    capabilities::capabilities,
    error::Error,
    input_device_info::InputDeviceInfo,
    media_devices::{
        enumerate_devices, get_display_media, get_user_media,
        synthesized_video_track,
    },
    media_track::MediaStreamTrack,
    permissions::{query_permission, PermissionSubscription},
    recorder::Recorder,
};

/// Returns the [`web_sys::Window`] object.
///
/// # Panics
///
/// When there is no [`web_sys::Window`] object in the global scope. This
/// library only runs in a browsing context, so it is always there.
pub fn window() -> web_sys::Window {
    // Cannot use lazy_static since Window is !Sync.
    web_sys::window().unwrap()
}

/// Spawns the given `task` onto the browser event loop.
pub fn spawn<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task);
}

/// Resolves after the provided [`Duration`].
#[allow(clippy::cast_possible_truncation)]
pub async fn delay_for(delay: Duration) {
    let delay_ms = delay.as_millis() as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        drop(
            window().set_timeout_with_callback_and_timeout_and_arguments_0(
                &resolve, delay_ms,
            ),
        );
    });
    drop(JsFuture::from(promise).await);
}

/// Initializes a `wasm-logger` backend for the [`log`] facade.
///
/// Subsequent calls are no-ops.
pub fn init_logger() {
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| wasm_logger::init(wasm_logger::Config::default()));
}

/// Sets the `console.error` panic hook, if the feature is enabled.
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Returns the property of the given JS `value` by its `name`, converted
/// with `into`.
pub fn get_property_by_name<T, F, U>(
    value: &T,
    name: &str,
    into: F,
) -> Option<U>
where
    T: AsRef<wasm_bindgen::JsValue>,
    F: Fn(wasm_bindgen::JsValue) -> Option<U>,
{
    js_sys::Reflect::get(value.as_ref(), &js_sys::JsString::from(name))
        .ok()
        .and_then(into)
}
