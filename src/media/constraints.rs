//! Constraints of requested media tracks.
//!
//! Platform-independent shapes; each platform adapter converts them into
//! its own constraint dictionaries.

/// Representation of a `ConstrainDOMString`-like constraint.
///
/// Can be exact (must be the parameter's value) or ideal (should be used
/// if possible).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConstrainString {
    /// Must be the parameter's value.
    Exact(String),

    /// Should be used if possible.
    Ideal(String),
}

impl ConstrainString {
    /// Returns the constrained value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Exact(v) | Self::Ideal(v) => v,
        }
    }

    /// Indicates whether this constraint is mandatory.
    #[inline]
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

/// Representation of a numeric constraint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstrainNumber {
    /// Must be the parameter's value.
    Exact(u32),

    /// Should be used if possible.
    Ideal(u32),
}

impl ConstrainNumber {
    /// Returns the constrained value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u32 {
        match self {
            Self::Exact(v) | Self::Ideal(v) => v,
        }
    }
}

/// Constraints applicable to audio tracks.
#[derive(Clone, Debug, Default)]
pub struct AudioTrackConstraints {
    /// Identifier of the device generating the content of the track.
    pub(crate) device_id: Option<ConstrainString>,
}

impl AudioTrackConstraints {
    /// Creates new [`AudioTrackConstraints`] with no constraints configured.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an exact `deviceId` constraint.
    #[inline]
    pub fn device_id(&mut self, device_id: String) {
        self.device_id = Some(ConstrainString::Exact(device_id));
    }
}

/// Constraints applicable to video tracks sourced from a media device.
#[derive(Clone, Debug, Default)]
pub struct DeviceVideoTrackConstraints {
    /// Identifier of the device generating the content of the track.
    pub(crate) device_id: Option<ConstrainString>,

    /// Width of the requested video.
    pub(crate) width: Option<ConstrainNumber>,

    /// Height of the requested video.
    pub(crate) height: Option<ConstrainNumber>,

    /// Frame rate of the requested video.
    pub(crate) frame_rate: Option<ConstrainNumber>,
}

impl DeviceVideoTrackConstraints {
    /// Creates new [`DeviceVideoTrackConstraints`] with no constraints
    /// configured.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an exact `deviceId` constraint.
    #[inline]
    pub fn device_id(&mut self, device_id: String) {
        self.device_id = Some(ConstrainString::Exact(device_id));
    }

    /// Sets an ideal `width` constraint.
    #[inline]
    pub fn ideal_width(&mut self, width: u32) {
        self.width = Some(ConstrainNumber::Ideal(width));
    }

    /// Sets an ideal `height` constraint.
    #[inline]
    pub fn ideal_height(&mut self, height: u32) {
        self.height = Some(ConstrainNumber::Ideal(height));
    }

    /// Sets an ideal `frameRate` constraint.
    #[inline]
    pub fn ideal_frame_rate(&mut self, frame_rate: u32) {
        self.frame_rate = Some(ConstrainNumber::Ideal(frame_rate));
    }

    /// Returns the `deviceId` constraint of these constraints.
    #[inline]
    #[must_use]
    pub fn get_device_id(&self) -> Option<&ConstrainString> {
        self.device_id.as_ref()
    }
}

/// Constraints of a `getUserMedia()`-like request.
#[derive(Clone, Debug, Default)]
pub struct MediaStreamSettings {
    /// Audio constraints, if audio is requested at all.
    audio: Option<AudioTrackConstraints>,

    /// Video constraints, if video is requested at all.
    video: Option<DeviceVideoTrackConstraints>,
}

impl MediaStreamSettings {
    /// Creates new [`MediaStreamSettings`] requesting no media.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Specifies the nature and settings of the audio track.
    #[inline]
    pub fn audio(&mut self, constraints: AudioTrackConstraints) {
        self.audio = Some(constraints);
    }

    /// Specifies the nature and settings of the device video track.
    #[inline]
    pub fn device_video(&mut self, constraints: DeviceVideoTrackConstraints) {
        self.video = Some(constraints);
    }

    /// Indicates whether audio is requested.
    #[inline]
    #[must_use]
    pub fn is_audio_enabled(&self) -> bool {
        self.audio.is_some()
    }

    /// Indicates whether video is requested.
    #[inline]
    #[must_use]
    pub fn is_video_enabled(&self) -> bool {
        self.video.is_some()
    }

    /// Returns the audio constraints, if audio is requested.
    #[inline]
    #[must_use]
    pub fn get_audio(&self) -> Option<&AudioTrackConstraints> {
        self.audio.as_ref()
    }

    /// Returns the video constraints, if video is requested.
    #[inline]
    #[must_use]
    pub fn get_video(&self) -> Option<&DeviceVideoTrackConstraints> {
        self.video.as_ref()
    }
}

/// Constraints of a `getDisplayMedia()`-like request.
#[derive(Clone, Debug, Default)]
pub struct DisplayMediaSettings {
    /// Whether system audio capture is requested alongside the video.
    audio: bool,
}

impl DisplayMediaSettings {
    /// Creates new [`DisplayMediaSettings`] requesting video only.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests system audio capture alongside the video.
    #[inline]
    pub fn system_audio(&mut self) {
        self.audio = true;
    }

    /// Indicates whether system audio capture is requested.
    #[inline]
    #[must_use]
    pub fn is_audio_enabled(&self) -> bool {
        self.audio
    }
}
