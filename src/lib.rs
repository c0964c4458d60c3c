//! Browser-side media capture and upload core of the Callboard rehearsal
//! platform.
//!
//! Stagehand probes the runtime environment, tracks the camera permission
//! state, acquires a camera/microphone (or screen capture) stream through an
//! ordered ladder of fallback strategies, records it into timestamped
//! segments, and pushes the finished take to a remote object storage with a
//! chunked resumable transfer.
//!
//! The crate is platform-split: all the business logic is
//! platform-independent, while everything touching the User Agent lives in
//! the [`platform`] module, which is backed by Web APIs on
//! `wasm32-unknown-unknown` and by a deterministic in-process media rig on
//! native targets (used by the test-suite and native smoke builds).

#![allow(clippy::module_name_repetitions)]
#![forbid(non_ascii_idents)]

#[macro_use]
pub mod utils;
pub mod api;
pub mod conf;
pub mod media;
pub mod platform;
pub mod recorder;
pub mod upload;

pub use self::{
    conf::Conf,
    media::{
        AcquireError, AcquireSource, CompatibilityReport, FallbackMode,
        MediaKind, MediaManager, PermissionState, PermissionTracker,
        StreamHandle,
    },
    recorder::{RecordingSession, SessionState},
    upload::{UploadError, UploadJob, UploadPhase, Uploader},
    utils::errors::{Caused, StagehandError},
};
