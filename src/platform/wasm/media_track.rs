//! Wrapper around a [MediaStreamTrack][1].
//!
//! [1]: https://w3.org/TR/mediacapture-streams/#mediastreamtrack

use crate::media::MediaKind;

use super::get_property_by_name;

/// Wrapper around a [MediaStreamTrack][1] received from a
/// [getUserMedia()][2]/[getDisplayMedia()][3] request.
///
/// [1]: https://w3.org/TR/mediacapture-streams/#mediastreamtrack
/// [2]: https://w3.org/TR/mediacapture-streams/#dom-mediadevices-getusermedia
/// [3]: https://w3.org/TR/screen-capture/#dom-mediadevices-getdisplaymedia
#[derive(Clone, Debug)]
pub struct MediaStreamTrack {
    sys_track: web_sys::MediaStreamTrack,
    kind: MediaKind,
}

impl<T> From<T> for MediaStreamTrack
where
    web_sys::MediaStreamTrack: From<T>,
{
    fn from(from: T) -> Self {
        let sys_track = web_sys::MediaStreamTrack::from(from);
        let kind = match sys_track.kind().as_ref() {
            "audio" => MediaKind::Audio,
            _ => MediaKind::Video,
        };
        Self { sys_track, kind }
    }
}

impl MediaStreamTrack {
    /// Returns the unique identifier of this track.
    #[inline]
    #[must_use]
    pub fn id(&self) -> String {
        self.sys_track.id()
    }

    /// Returns this track's kind (audio/video).
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Returns the [`deviceId`][1] of the underlying track.
    ///
    /// [1]: https://tinyurl.com/w3-streams#dom-mediatracksettings-deviceid
    #[must_use]
    pub fn device_id(&self) -> Option<String> {
        get_property_by_name(&self.sys_track.get_settings(), "deviceId", |v| {
            v.as_string()
        })
    }

    /// Indicates whether this track has not ended yet.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.sys_track.ready_state()
            == web_sys::MediaStreamTrackState::Live
    }

    /// Stops this track, releasing the related hardware.
    pub fn stop(&self) {
        self.sys_track.stop();
    }

    /// Returns the underlying [`web_sys::MediaStreamTrack`].
    #[inline]
    #[must_use]
    pub fn as_sys(&self) -> &web_sys::MediaStreamTrack {
        &self.sys_track
    }
}
