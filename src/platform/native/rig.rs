//! In-process stand-in for the User Agent media stack.
//!
//! One [`Rig`] is installed per thread. The adapter functions of this
//! platform consult it on every call, so a test can program devices,
//! permission transitions and failure scenarios, then observe every media
//! request the library issued.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    media::{DisplayMediaSettings, MediaStreamSettings, PermissionState},
    platform::EnvCapabilities,
};

use super::error::Error;

thread_local! {
    static CURRENT: RefCell<Option<Rc<RigState>>> = RefCell::new(None);
}

/// Returns the [`RigState`] installed on the current thread, installing a
/// default one if none is.
pub(super) fn current() -> Rc<RigState> {
    CURRENT.with(|cell| {
        let mut slot = cell.borrow_mut();
        if let Some(state) = slot.as_ref() {
            Rc::clone(state)
        } else {
            let state = Rc::new(RigState::default());
            *slot = Some(Rc::clone(&state));
            state
        }
    })
}

/// Camera known to the rig.
#[derive(Clone, Debug)]
pub struct RigDevice {
    /// Identifier reported for the device.
    pub id: String,

    /// Human-readable label of the device.
    pub label: String,
}

/// Source a media request was addressed to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestSource {
    /// `getUserMedia()`-like camera/microphone request.
    Camera,

    /// `getDisplayMedia()`-like screen capture request.
    Screen,
}

/// One media acquisition request observed by the rig.
#[derive(Clone, Debug)]
pub struct MediaRequest {
    /// Source the request was addressed to.
    pub source: RequestSource,

    /// Whether an audio track was requested.
    pub audio: bool,

    /// Whether a video track was requested.
    pub video: bool,

    /// Device the video track was pinned to, if any.
    pub device_id: Option<String>,

    /// Width requested for the video track, if any.
    pub width: Option<u32>,

    /// Number of live tracks existing at the moment of the request.
    pub live_tracks_before: usize,
}

/// Failure a programmed responder may answer a media request with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimFailure {
    /// Permission denied by the user or the platform.
    NotAllowed,

    /// No device satisfying the request exists.
    NotFound,

    /// Device exists, but is held by another application.
    NotReadable,

    /// Device cannot satisfy the requested constraints.
    Overconstrained,

    /// Failure with no defined mapping.
    Unknown,
}

impl SimFailure {
    /// Converts this failure into the platform [`Error`] a browser would
    /// raise for it.
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            Self::NotAllowed => {
                Error::new("NotAllowedError", "Permission denied")
            }
            Self::NotFound => {
                Error::new("NotFoundError", "Requested device not found")
            }
            Self::NotReadable => {
                Error::new("NotReadableError", "Could not start video source")
            }
            Self::Overconstrained => Error::new(
                "OverconstrainedError",
                "Constraints could not be satisfied",
            ),
            Self::Unknown => Error::new("UnknownError", "Unknown failure"),
        }
    }
}

type Responder = Box<dyn Fn(&MediaRequest) -> Option<SimFailure>>;
type PermissionWatcher = (u64, Rc<dyn Fn(PermissionState)>);

/// Mutable state of the installed rig.
pub struct RigState {
    cameras: RefCell<Vec<RigDevice>>,
    permission: Cell<PermissionState>,
    permission_watchers: RefCell<Vec<PermissionWatcher>>,
    next_watcher_id: Cell<u64>,
    responder: RefCell<Option<Responder>>,
    hang_acquisition: Cell<bool>,
    fail_enumeration: Cell<bool>,
    recorder_fail_after: Cell<Option<u32>>,
    requests: RefCell<Vec<MediaRequest>>,
    live_tracks: Cell<usize>,
    next_track_id: Cell<u64>,
    capabilities: RefCell<EnvCapabilities>,
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            cameras: RefCell::new(vec![RigDevice {
                id: String::from("cam-1"),
                label: String::from("Integrated Camera"),
            }]),
            permission: Cell::new(PermissionState::Prompt),
            permission_watchers: RefCell::new(Vec::new()),
            next_watcher_id: Cell::new(0),
            responder: RefCell::new(None),
            hang_acquisition: Cell::new(false),
            fail_enumeration: Cell::new(false),
            recorder_fail_after: Cell::new(None),
            requests: RefCell::new(Vec::new()),
            live_tracks: Cell::new(0),
            next_track_id: Cell::new(0),
            capabilities: RefCell::new(EnvCapabilities {
                media_devices: true,
                recorder: true,
                device_enumeration: true,
                display_media: true,
                secure_context: true,
                user_agent: String::from(
                    "Mozilla/5.0 (X11; Linux x86_64) Chrome/90.0",
                ),
            }),
        }
    }
}

impl RigState {
    /// Decides the outcome of the given media request.
    pub(super) fn decide(&self, req: &MediaRequest) -> Option<SimFailure> {
        if let Some(responder) = self.responder.borrow().as_ref() {
            return responder(req);
        }
        if self.permission.get() == PermissionState::Denied {
            return Some(SimFailure::NotAllowed);
        }
        if req.source == RequestSource::Camera
            && req.video
            && self.resolve_camera(req.device_id.as_deref()).is_none()
        {
            return Some(SimFailure::NotFound);
        }
        None
    }

    /// Picks the camera answering the given `device_id` request, if any.
    pub(super) fn resolve_camera(
        &self,
        device_id: Option<&str>,
    ) -> Option<RigDevice> {
        let cameras = self.cameras.borrow();
        match device_id {
            Some(id) => cameras.iter().find(|d| d.id == id).cloned(),
            None => cameras.first().cloned(),
        }
    }

    pub(super) fn log_request(&self, req: MediaRequest) {
        self.requests.borrow_mut().push(req);
    }

    pub(super) fn cameras(&self) -> Vec<RigDevice> {
        self.cameras.borrow().clone()
    }

    pub(super) fn permission(&self) -> PermissionState {
        self.permission.get()
    }

    pub(super) fn hangs(&self) -> bool {
        self.hang_acquisition.get()
    }

    pub(super) fn enumeration_fails(&self) -> bool {
        self.fail_enumeration.get()
    }

    pub(super) fn recorder_fail_after(&self) -> Option<u32> {
        self.recorder_fail_after.get()
    }

    pub(super) fn capabilities(&self) -> EnvCapabilities {
        self.capabilities.borrow().clone()
    }

    pub(super) fn live_track_count(&self) -> usize {
        self.live_tracks.get()
    }

    pub(super) fn track_created(&self) -> u64 {
        self.live_tracks.set(self.live_tracks.get() + 1);
        let id = self.next_track_id.get();
        self.next_track_id.set(id + 1);
        id
    }

    pub(super) fn track_stopped(&self) {
        self.live_tracks.set(self.live_tracks.get().saturating_sub(1));
    }

    pub(super) fn watch_permission(
        &self,
        watcher: Rc<dyn Fn(PermissionState)>,
    ) -> u64 {
        let id = self.next_watcher_id.get();
        self.next_watcher_id.set(id + 1);
        self.permission_watchers.borrow_mut().push((id, watcher));
        id
    }

    pub(super) fn unwatch_permission(&self, id: u64) {
        self.permission_watchers.borrow_mut().retain(|(i, _)| *i != id);
    }
}

/// Handle to the rig installed on the current thread.
///
/// Dropping it uninstalls the rig.
pub struct Rig(Rc<RigState>);

impl Rig {
    /// Installs a fresh [`Rig`] on the current thread, replacing any
    /// previously installed one.
    #[allow(clippy::new_without_default)]
    #[must_use]
    pub fn install() -> Self {
        let state = Rc::new(RigState::default());
        CURRENT.with(|cell| {
            *cell.borrow_mut() = Some(Rc::clone(&state));
        });
        Self(state)
    }

    /// Replaces the set of cameras known to the rig.
    pub fn set_cameras(&self, cameras: Vec<RigDevice>) {
        *self.0.cameras.borrow_mut() = cameras;
    }

    /// Adds a camera with the given `id` and `label`.
    pub fn add_camera<I: Into<String>, L: Into<String>>(
        &self,
        id: I,
        label: L,
    ) {
        self.0.cameras.borrow_mut().push(RigDevice {
            id: id.into(),
            label: label.into(),
        });
    }

    /// Sets the camera permission state, notifying subscribers on change.
    pub fn set_permission(&self, state: PermissionState) {
        let prev = self.0.permission.replace(state);
        if prev != state {
            let watchers = self.0.permission_watchers.borrow().clone();
            for (_, watcher) in watchers {
                watcher(state);
            }
        }
    }

    /// Programs the outcome of media requests.
    ///
    /// The responder returns [`None`] to grant a request, or the
    /// [`SimFailure`] to reject it with. Overrides the default behavior
    /// (grant unless permission is denied or no camera matches).
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&MediaRequest) -> Option<SimFailure> + 'static,
    {
        *self.0.responder.borrow_mut() = Some(Box::new(responder));
    }

    /// Removes the programmed responder, restoring the default behavior.
    pub fn clear_responder(&self) {
        *self.0.responder.borrow_mut() = None;
    }

    /// Makes every acquisition request hang unresolved.
    pub fn hang_acquisition(&self, hang: bool) {
        self.0.hang_acquisition.set(hang);
    }

    /// Makes device enumeration fail.
    pub fn fail_enumeration(&self, fail: bool) {
        self.0.fail_enumeration.set(fail);
    }

    /// Makes a running recorder raise an error after emitting the given
    /// number of segments.
    pub fn fail_recorder_after(&self, segments: u32) {
        self.0.recorder_fail_after.set(Some(segments));
    }

    /// Replaces the reported environment capabilities.
    pub fn set_capabilities(&self, caps: EnvCapabilities) {
        *self.0.capabilities.borrow_mut() = caps;
    }

    /// Returns every media request observed so far, in issue order.
    #[must_use]
    pub fn requests(&self) -> Vec<MediaRequest> {
        self.0.requests.borrow().clone()
    }

    /// Returns the number of currently live (not stopped) tracks.
    #[must_use]
    pub fn live_tracks(&self) -> usize {
        self.0.live_tracks.get()
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        CURRENT.with(|cell| {
            let mut slot = cell.borrow_mut();
            if let Some(state) = slot.as_ref() {
                if Rc::ptr_eq(state, &self.0) {
                    *slot = None;
                }
            }
        });
    }
}

impl MediaRequest {
    /// Builds a [`MediaRequest`] out of camera constraints.
    pub(super) fn from_camera(
        settings: &MediaStreamSettings,
        live_tracks_before: usize,
    ) -> Self {
        let video = settings.get_video();
        Self {
            source: RequestSource::Camera,
            audio: settings.is_audio_enabled(),
            video: settings.is_video_enabled(),
            device_id: video.and_then(|v| {
                v.get_device_id().map(|c| c.value().to_owned())
            }),
            width: video.and_then(|v| v.width.map(|c| c.value())),
            live_tracks_before,
        }
    }

    /// Builds a [`MediaRequest`] out of screen capture constraints.
    pub(super) fn from_screen(
        settings: &DisplayMediaSettings,
        live_tracks_before: usize,
    ) -> Self {
        Self {
            source: RequestSource::Screen,
            audio: settings.is_audio_enabled(),
            video: true,
            device_id: None,
            width: None,
            live_tracks_before,
        }
    }
}
