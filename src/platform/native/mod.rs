//! Native platform adapter.
//!
//! Backed by an in-process [`rig`] simulating the User Agent media stack,
//! so the whole acquisition/recording/upload machinery can be driven
//! deterministically on native targets. Scheduling is a `tokio`
//! current-thread runtime: all futures are `!Send`, matching the browser
//! event loop model.

mod blob;
mod callback;
mod error;
mod input_device_info;
mod media_devices;
mod media_track;
mod permissions;
mod recorder;
pub mod rig;

use std::{future::Future, time::Duration};

pub use self::{
    blob::Blob,
    callback::Callback,
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

use crate::platform::EnvCapabilities;

/// Returns the raw capabilities of the simulated environment.
#[must_use]
pub fn capabilities() -> EnvCapabilities {
    rig::current().capabilities()
}

/// Spawns the given `task` onto the current thread.
///
/// # Panics
///
/// If called outside of a [`tokio::task::LocalSet`] context.
pub fn spawn<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    drop(tokio::task::spawn_local(task));
}

/// Resolves after the provided [`Duration`].
pub async fn delay_for(delay: Duration) {
    tokio::time::sleep(delay).await;
}

/// Initializes an [`env_logger`] backend for the [`log`] facade.
///
/// Subsequent calls are no-ops.
pub fn init_logger() {
    drop(env_logger::try_init());
}

/// No-op on native targets.
pub fn set_panic_hook() {}
