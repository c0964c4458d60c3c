//! Media input device info of the native adapter.

use crate::media::MediaKind;

/// Representation of a media input device known to the rig.
#[derive(Clone, Debug)]
pub struct InputDeviceInfo {
    device_id: String,
    label: String,
    media_kind: MediaKind,
}

impl InputDeviceInfo {
    pub(super) fn new(
        device_id: String,
        label: String,
        media_kind: MediaKind,
    ) -> Self {
        Self {
            device_id,
            label,
            media_kind,
        }
    }

    /// Returns the unique identifier of the represented device.
    #[inline]
    #[must_use]
    pub fn device_id(&self) -> String {
        self.device_id.clone()
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
        self.label.clone()
    }
}
