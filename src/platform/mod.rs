//! Platform-specific functionality.
//!
//! Everything touching the User Agent lives here: media devices, the
//! permission store, the media recorder, blobs, timers, task spawning and
//! HTTP. On `wasm32-unknown-unknown` the adapters are backed by Web APIs;
//! on native targets by a deterministic in-process media rig driving the
//! same surface, which the test-suite programs with failure scenarios.

pub mod storage;

#[cfg(not(target_arch = "wasm32"))]
mod native;
#[cfg(not(target_arch = "wasm32"))]
pub use self::native::{
    capabilities, delay_for, enumerate_devices, get_display_media,
    get_user_media, init_logger, query_permission, rig, set_panic_hook,
    spawn, synthesized_video_track, Blob, Callback, Error, InputDeviceInfo,
    MediaStreamTrack, PermissionSubscription, Recorder,
};

#[cfg(target_arch = "wasm32")]
mod wasm;
#[cfg(target_arch = "wasm32")]
pub use self::wasm::{
    capabilities, delay_for, enumerate_devices, get_display_media,
    get_user_media, http, init_logger, query_permission, set_panic_hook,
    spawn, synthesized_video_track, Blob, Callback, Error, Function,
    InputDeviceInfo, MediaStreamTrack, PermissionSubscription, Recorder,
};

/// Raw capabilities of the runtime environment, as reported by the
/// platform.
///
/// Interpreted by [`media::capability::check_compatibility()`].
///
/// [`media::capability::check_compatibility()`]:
/// crate::media::check_compatibility
#[derive(Clone, Debug)]
pub struct EnvCapabilities {
    /// Whether the media devices API is present.
    pub media_devices: bool,

    /// Whether the media recorder API is present.
    pub recorder: bool,

    /// Whether input devices can be enumerated.
    pub device_enumeration: bool,

    /// Whether display capture is available.
    pub display_media: bool,

    /// Whether the page runs in a secure context.
    pub secure_context: bool,

    /// Raw user agent string.
    pub user_agent: String,
}
