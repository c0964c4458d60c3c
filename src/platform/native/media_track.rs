//! Simulated media track of the native adapter.

use std::{
    cell::Cell,
    rc::{Rc, Weak},
};

use crate::media::MediaKind;

use super::rig::RigState;

struct Inner {
    id: String,
    kind: MediaKind,
    device_id: Option<String>,
    stopped: Cell<bool>,
    rig: Weak<RigState>,
}

/// Wrapper around a live media track handed out by the rig.
#[derive(Clone)]
pub struct MediaStreamTrack(Rc<Inner>);

impl MediaStreamTrack {
    pub(super) fn new(
        rig: &Rc<RigState>,
        kind: MediaKind,
        device_id: Option<String>,
    ) -> Self {
        let serial = rig.track_created();
        Self(Rc::new(Inner {
            id: format!("track-{}", serial),
            kind,
            device_id,
            stopped: Cell::new(false),
            rig: Rc::downgrade(rig),
        }))
    }

    /// Returns the unique identifier of this track.
    #[inline]
    #[must_use]
    pub fn id(&self) -> String {
        self.0.id.clone()
    }

    /// Returns this track's kind (audio/video).
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.0.kind
    }

    /// Returns the identifier of the device producing this track.
    #[inline]
    #[must_use]
    pub fn device_id(&self) -> Option<String> {
        self.0.device_id.clone()
    }

    /// Indicates whether this track has not been stopped yet.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.0.stopped.get()
    }

    /// Stops this track, releasing the simulated hardware.
    ///
    /// Subsequent calls are no-ops.
    pub fn stop(&self) {
        if !self.0.stopped.replace(true) {
            if let Some(rig) = self.0.rig.upgrade() {
                rig.track_stopped();
            }
        }
    }
}

impl std::fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStreamTrack")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("device_id", &self.0.device_id)
            .field("stopped", &self.0.stopped.get())
            .finish()
    }
}
