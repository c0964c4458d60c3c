//! Media acquisition: environment probing, permission tracking and the
//! strategy ladder.

pub mod capability;
pub mod constraints;
mod ladder;
mod manager;
mod permission;
mod stream;

use derive_more::Display;

pub use self::{
    capability::{
        check_compatibility, enumerate_devices, BrowserKind,
        CompatibilityReport, InputDeviceInfo,
    },
    constraints::{
        AudioTrackConstraints, ConstrainNumber, ConstrainString,
        DeviceVideoTrackConstraints, DisplayMediaSettings,
        MediaStreamSettings,
    },
    ladder::{
        camera_ladder, screen_ladder, AcquireError, AcquireSource,
        AcquireStrategy, FallbackMode,
    },
    manager::{MediaManager, MediaManagerHandle},
    permission::{PermissionState, PermissionTracker},
    stream::StreamHandle,
};

/// Media track kind.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum MediaKind {
    /// Audio track.
    Audio,

    /// Video track.
    Video,
}
