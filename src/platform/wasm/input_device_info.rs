//! [MediaDeviceInfo][1] related objects.
//!
//! [1]: https://w3.org/TR/mediacapture-streams/#device-info

use std::convert::TryFrom;

use web_sys as sys;

use crate::media::MediaKind;

/// Representation of a [MediaDeviceInfo][1] of an input device.
///
/// [1]: https://w3.org/TR/mediacapture-streams/#device-info
#[derive(Clone, Debug)]
pub struct InputDeviceInfo {
    media_kind: MediaKind,

    /// Actual underlying [MediaDeviceInfo][1] object.
    ///
    /// [1]: https://w3.org/TR/mediacapture-streams/#device-info
    info: sys::MediaDeviceInfo,
}

impl TryFrom<sys::MediaDeviceKind> for MediaKind {
    type Error = NotInputDevice;

    fn try_from(value: sys::MediaDeviceKind) -> Result<Self, Self::Error> {
        match value {
            sys::MediaDeviceKind::Audioinput => Ok(Self::Audio),
            sys::MediaDeviceKind::Videoinput => Ok(Self::Video),
            _ => Err(NotInputDevice),
        }
    }
}

/// Occurs when the kind of a media device is not an input kind.
#[derive(Clone, Copy, Debug)]
pub struct NotInputDevice;

impl TryFrom<sys::MediaDeviceInfo> for InputDeviceInfo {
    type Error = NotInputDevice;

    fn try_from(info: sys::MediaDeviceInfo) -> Result<Self, Self::Error> {
        Ok(Self {
            media_kind: MediaKind::try_from(info.kind())?,
            info,
        })
    }
}

impl InputDeviceInfo {
    /// Returns the unique identifier of the represented device.
    #[inline]
    #[must_use]
    pub fn device_id(&self) -> String {
        self.info.device_id()
    }

    /// Returns the kind of the represented device.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.media_kind
    }

    /// Returns the label describing the represented device (for example
    /// "External USB Webcam"), or an empty string if none is associated.
    #[inline]
    #[must_use]
    pub fn label(&self) -> String {
        self.info.label()
    }
}
