//! Exclusive ownership wrapper around one live capture session.

use std::cell::Cell;

use crate::platform;

use super::ladder::{AcquireSource, FallbackMode};

/// Owner of the tracks of exactly one live capture session.
///
/// The camera/microphone hardware is the one true exclusive resource of
/// the whole subsystem: the [`MediaManager`] guarantees at most one live
/// [`StreamHandle`] per manager, and stops the previous one before any
/// new platform request. Dropping the handle stops the tracks as well, so
/// every exit path releases the hardware.
///
/// [`MediaManager`]: super::MediaManager
#[derive(Debug)]
pub struct StreamHandle {
    tracks: Vec<platform::MediaStreamTrack>,
    source: AcquireSource,
    fallback: FallbackMode,
    tier: u8,
    stopped: Cell<bool>,
}

impl StreamHandle {
    pub(super) fn new(
        tracks: Vec<platform::MediaStreamTrack>,
        source: AcquireSource,
        fallback: FallbackMode,
        tier: u8,
    ) -> Self {
        Self {
            tracks,
            source,
            fallback,
            tier,
            stopped: Cell::new(false),
        }
    }

    /// Returns the tracks of this capture session.
    #[inline]
    #[must_use]
    pub fn tracks(&self) -> &[platform::MediaStreamTrack] {
        &self.tracks
    }

    /// Returns the source this stream was captured from.
    #[inline]
    #[must_use]
    pub fn source(&self) -> AcquireSource {
        self.source
    }

    /// Returns the reduced guarantees this stream was acquired with.
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> FallbackMode {
        self.fallback
    }

    /// Returns the 1-based number of the ladder tier that produced this
    /// stream.
    #[inline]
    #[must_use]
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Returns the identifier of the device producing the video track.
    #[must_use]
    pub fn video_device_id(&self) -> Option<String> {
        self.tracks
            .iter()
            .find(|t| t.kind() == super::MediaKind::Video)
            .and_then(platform::MediaStreamTrack::device_id)
    }

    /// Indicates whether this handle was released already.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Stops every track, releasing the hardware.
    ///
    /// Subsequent calls are no-ops.
    pub fn stop(&self) {
        if !self.stopped.replace(true) {
            log::debug!(
                "Releasing capture stream of {} track(s)",
                self.tracks.len(),
            );
            for track in &self.tracks {
                track.stop();
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
