//! Ordered ladder of media acquisition strategies.
//!
//! Strategies are plain descriptors iterated by index: the fallthrough
//! order and the attempts bound are visible in one place and testable in
//! isolation. Each attempt races against a timeout, and the first
//! succeeding tier wins.

use std::{cell::Cell, rc::Rc, time::Duration};

use bitflags::bitflags;
use derive_more::Display;
use futures::{
    channel::oneshot,
    future::{self, Either},
};
use tracerr::Traced;

use crate::{conf, platform, utils::Caused};

use super::{
    constraints::{
        AudioTrackConstraints, DeviceVideoTrackConstraints,
        DisplayMediaSettings, MediaStreamSettings,
    },
    stream::StreamHandle,
    MediaKind,
};

bitflags! {
    /// Reduced guarantees a stream was acquired with.
    ///
    /// Lets the UI label degraded captures ("recording without sound",
    /// "recording the screen instead of the camera", and so on).
    pub struct FallbackMode: u8 {
        /// No audio track was captured.
        const NO_AUDIO = 0b0000_0001;

        /// Resolution constraints were dropped entirely.
        const UNCONSTRAINED = 0b0000_0010;

        /// Emergency low resolution was requested.
        const LOW_RESOLUTION = 0b0000_0100;

        /// The video track is synthesized black frames, not a capture.
        const SYNTHESIZED_VIDEO = 0b0000_1000;

        /// The stream captures a display, not a camera.
        const SCREEN = 0b0001_0000;
    }
}

/// Source requested from the acquisition ladder.
///
/// Screen capture is an explicit user choice, never an automatic
/// fallback of a failed camera request: it changes what is being
/// recorded.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum AcquireSource {
    /// Camera plus microphone.
    Camera,

    /// Display capture.
    Screen,
}

/// Media request of a single ladder tier.
#[derive(Clone, Debug)]
enum StrategyRequest {
    /// `getUserMedia()`-like request.
    UserMedia(MediaStreamSettings),

    /// `getDisplayMedia()`-like request.
    DisplayMedia(DisplayMediaSettings),

    /// Audio-only `getUserMedia()` request with a synthesized black-frame
    /// video track spliced in, so a valid video+audio pair results
    /// whenever any media access is possible at all.
    SynthesizedVideo(AudioTrackConstraints),
}

/// Descriptor of a single tier of the acquisition ladder.
#[derive(Clone, Debug)]
pub struct AcquireStrategy {
    tier: u8,
    label: &'static str,
    source: AcquireSource,
    fallback: FallbackMode,
    request: StrategyRequest,
}

impl AcquireStrategy {
    /// Returns the 1-based number of this tier.
    #[inline]
    #[must_use]
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Returns the human-readable label of this tier.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the reduced guarantees acquiring via this tier implies.
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> FallbackMode {
        self.fallback
    }
}

/// Builds the ordered camera acquisition ladder.
///
/// The device-pinned tier is present only when a `preferred_device` is
/// supplied; every following tier is always present, in this order:
/// ideal resolution with audio, video only, unconstrained video+audio,
/// then the emergency tiers (low resolution, low video only, audio only
/// with a synthesized video track).
#[must_use]
pub fn camera_ladder(
    acquire: &conf::Acquire,
    preferred_device: Option<&str>,
) -> Vec<AcquireStrategy> {
    let ideal_video = || {
        let mut video = DeviceVideoTrackConstraints::new();
        video.ideal_width(acquire.ideal_width);
        video.ideal_height(acquire.ideal_height);
        video.ideal_frame_rate(acquire.ideal_frame_rate);
        video
    };
    let low_video = || {
        let mut video = DeviceVideoTrackConstraints::new();
        video.ideal_width(acquire.emergency_width);
        video.ideal_height(acquire.emergency_height);
        video
    };

    let mut tiers = Vec::new();

    if let Some(device_id) = preferred_device {
        let mut settings = MediaStreamSettings::new();
        let mut video = ideal_video();
        video.device_id(String::from(device_id));
        settings.device_video(video);
        settings.audio(AudioTrackConstraints::new());
        tiers.push(("exact-device", FallbackMode::empty(), settings));
    }

    let mut settings = MediaStreamSettings::new();
    settings.device_video(ideal_video());
    settings.audio(AudioTrackConstraints::new());
    tiers.push(("ideal-resolution", FallbackMode::empty(), settings));

    let mut settings = MediaStreamSettings::new();
    let mut video = DeviceVideoTrackConstraints::new();
    if let Some(device_id) = preferred_device {
        video.device_id(String::from(device_id));
    }
    settings.device_video(video);
    tiers.push(("video-only", FallbackMode::NO_AUDIO, settings));

    let mut settings = MediaStreamSettings::new();
    settings.device_video(DeviceVideoTrackConstraints::new());
    settings.audio(AudioTrackConstraints::new());
    tiers.push(("unconstrained", FallbackMode::UNCONSTRAINED, settings));

    let mut settings = MediaStreamSettings::new();
    settings.device_video(low_video());
    settings.audio(AudioTrackConstraints::new());
    tiers.push(("emergency-low", FallbackMode::LOW_RESOLUTION, settings));

    let mut settings = MediaStreamSettings::new();
    settings.device_video(low_video());
    tiers.push((
        "emergency-video-only",
        FallbackMode::LOW_RESOLUTION | FallbackMode::NO_AUDIO,
        settings,
    ));

    let mut strategies: Vec<_> = tiers
        .into_iter()
        .map(|(label, fallback, settings)| AcquireStrategy {
            tier: 0,
            label,
            source: AcquireSource::Camera,
            fallback,
            request: StrategyRequest::UserMedia(settings),
        })
        .collect();
    strategies.push(AcquireStrategy {
        tier: 0,
        label: "emergency-synthesized",
        source: AcquireSource::Camera,
        fallback: FallbackMode::SYNTHESIZED_VIDEO,
        request: StrategyRequest::SynthesizedVideo(
            AudioTrackConstraints::new(),
        ),
    });

    for (i, strategy) in strategies.iter_mut().enumerate() {
        strategy.tier = (i + 1) as u8;
    }
    strategies
}

/// Builds the screen capture ladder: system audio first, then video
/// only.
#[must_use]
pub fn screen_ladder() -> Vec<AcquireStrategy> {
    let mut with_audio = DisplayMediaSettings::new();
    with_audio.system_audio();

    vec![
        AcquireStrategy {
            tier: 1,
            label: "screen-with-audio",
            source: AcquireSource::Screen,
            fallback: FallbackMode::SCREEN,
            request: StrategyRequest::DisplayMedia(with_audio),
        },
        AcquireStrategy {
            tier: 2,
            label: "screen-video-only",
            source: AcquireSource::Screen,
            fallback: FallbackMode::SCREEN | FallbackMode::NO_AUDIO,
            request: StrategyRequest::DisplayMedia(
                DisplayMediaSettings::new(),
            ),
        },
    ]
}

/// Errors occurring when acquiring a capture stream.
#[derive(Clone, Debug, Display)]
pub enum AcquireError {
    /// Camera/microphone permission was denied. Not retried
    /// automatically: recovering requires a user action, observed through
    /// the permission tracker.
    #[display(fmt = "Camera/microphone permission denied: {}", _0)]
    PermissionDenied(platform::Error),

    /// No device satisfying the request exists.
    #[display(fmt = "No matching capture device found: {}", _0)]
    DeviceNotFound(platform::Error),

    /// The device exists, but another application holds it.
    #[display(fmt = "Capture device is busy: {}", _0)]
    DeviceBusy(platform::Error),

    /// The device cannot satisfy the requested constraints.
    #[display(fmt = "Capture constraints cannot be satisfied: {}", _0)]
    ConstraintUnsatisfiable(platform::Error),

    /// The platform did not resolve the request in time.
    #[display(fmt = "Acquisition attempt timed out")]
    Timeout,

    /// The page runs in an insecure context. Fatal: media capture is not
    /// reachable at all.
    #[display(fmt = "Media capture requires a secure (HTTPS) context")]
    InsecureContext,

    /// A required platform API is missing. Fatal.
    #[display(fmt = "Unsupported platform: {}", _0)]
    UnsupportedPlatform(String),

    /// Failure with no defined mapping.
    #[display(fmt = "Failed to acquire capture stream: {}", _0)]
    Unknown(platform::Error),
}

impl AcquireError {
    /// Indicates whether re-running the ladder may help without any user
    /// action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DeviceNotFound(_)
            | Self::DeviceBusy(_)
            | Self::ConstraintUnsatisfiable(_)
            | Self::Timeout
            | Self::Unknown(_) => true,
            Self::PermissionDenied(_)
            | Self::InsecureContext
            | Self::UnsupportedPlatform(_) => false,
        }
    }

    /// Significance of this error among failures collected across ladder
    /// tiers: when every tier fails, the most significant one is
    /// surfaced.
    fn severity(&self) -> u8 {
        match self {
            Self::InsecureContext | Self::UnsupportedPlatform(_) => 7,
            Self::PermissionDenied(_) => 6,
            Self::DeviceBusy(_) => 5,
            Self::DeviceNotFound(_) => 4,
            Self::Timeout => 3,
            Self::ConstraintUnsatisfiable(_) => 2,
            Self::Unknown(_) => 1,
        }
    }
}

impl From<platform::Error> for AcquireError {
    /// Classifies a platform error by its DOM exception name.
    fn from(err: platform::Error) -> Self {
        match err.name().as_str() {
            "NotAllowedError" | "PermissionDeniedError"
            | "SecurityError" => Self::PermissionDenied(err),
            "NotFoundError" | "DevicesNotFoundError" => {
                Self::DeviceNotFound(err)
            }
            "NotReadableError" | "TrackStartError" | "AbortError" => {
                Self::DeviceBusy(err)
            }
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                Self::ConstraintUnsatisfiable(err)
            }
            _ => Self::Unknown(err),
        }
    }
}

impl Caused for AcquireError {
    type Error = platform::Error;

    fn name(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PermissionDenied",
            Self::DeviceNotFound(_) => "DeviceNotFound",
            Self::DeviceBusy(_) => "DeviceBusy",
            Self::ConstraintUnsatisfiable(_) => "ConstraintUnsatisfiable",
            Self::Timeout => "AcquireTimeout",
            Self::InsecureContext => "InsecureContext",
            Self::UnsupportedPlatform(_) => "UnsupportedPlatform",
            Self::Unknown(_) => "UnknownAcquireError",
        }
    }

    fn cause(self) -> Option<Self::Error> {
        match self {
            Self::PermissionDenied(err)
            | Self::DeviceNotFound(err)
            | Self::DeviceBusy(err)
            | Self::ConstraintUnsatisfiable(err)
            | Self::Unknown(err) => Some(err),
            Self::Timeout
            | Self::InsecureContext
            | Self::UnsupportedPlatform(_) => None,
        }
    }
}

/// Executes the media request of a single tier.
async fn execute(
    request: StrategyRequest,
) -> Result<Vec<platform::MediaStreamTrack>, Traced<AcquireError>> {
    match request {
        StrategyRequest::UserMedia(settings) => {
            platform::get_user_media(&settings)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> AcquireError))
        }
        StrategyRequest::DisplayMedia(settings) => {
            platform::get_display_media(&settings)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> AcquireError))
        }
        StrategyRequest::SynthesizedVideo(audio) => {
            let mut settings = MediaStreamSettings::new();
            settings.audio(audio);
            let mut tracks = platform::get_user_media(&settings)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> AcquireError))?;
            let video = platform::synthesized_video_track()
                .map_err(tracerr::map_from_and_wrap!(=> AcquireError))?;
            tracks.insert(0, video);
            Ok(tracks)
        }
    }
}

/// Runs the media request of the given tier racing against `timeout`.
///
/// The losing side of the race is discarded: a stream arriving after the
/// attempt was abandoned is stopped right away, so hardware locks cannot
/// leak through a lost race.
async fn attempt(
    strategy: &AcquireStrategy,
    timeout: Duration,
) -> Result<Vec<platform::MediaStreamTrack>, Traced<AcquireError>> {
    let (tx, rx) = oneshot::channel();
    let abandoned = Rc::new(Cell::new(false));

    let flag = Rc::clone(&abandoned);
    let request = strategy.request.clone();
    let tier = strategy.tier;
    platform::spawn(async move {
        let result = execute(request).await;
        if flag.get() {
            if let Ok(tracks) = result {
                log::warn!(
                    "Tier {} stream arrived after its attempt was \
                     abandoned; stopping {} track(s)",
                    tier,
                    tracks.len(),
                );
                for track in &tracks {
                    track.stop();
                }
            }
        } else {
            drop(tx.send(result));
        }
    });

    match future::select(rx, Box::pin(platform::delay_for(timeout))).await {
        Either::Left((received, _)) => received.unwrap_or_else(|_| {
            Err(tracerr::new!(AcquireError::Timeout))
        }),
        Either::Right(((), _)) => {
            abandoned.set(true);
            Err(tracerr::new!(AcquireError::Timeout))
        }
    }
}

/// Walks the given `strategies` in order until one succeeds.
///
/// Every tier is attempted before any error is surfaced; each failure is
/// logged with its tier and reason. When all tiers fail, the most
/// significant collected error is returned, preferring the later attempt
/// on ties.
pub(super) async fn run_ladder(
    strategies: &[AcquireStrategy],
    timeout: Duration,
) -> Result<StreamHandle, Traced<AcquireError>> {
    let mut worst: Option<Traced<AcquireError>> = None;

    for strategy in strategies {
        log::debug!(
            "Acquisition tier {} ({}): attempting",
            strategy.tier,
            strategy.label,
        );
        match attempt(strategy, timeout).await {
            Ok(tracks) => {
                let mut fallback = strategy.fallback;
                if !tracks.iter().any(|t| t.kind() == MediaKind::Audio) {
                    fallback |= FallbackMode::NO_AUDIO;
                }
                log::info!(
                    "Acquisition tier {} ({}) succeeded with {} track(s)",
                    strategy.tier,
                    strategy.label,
                    tracks.len(),
                );
                return Ok(StreamHandle::new(
                    tracks,
                    strategy.source,
                    fallback,
                    strategy.tier,
                ));
            }
            Err(e) => {
                log::warn!(
                    "Acquisition tier {} ({}) failed: {}",
                    strategy.tier,
                    strategy.label,
                    e.as_ref(),
                );
                worst = Some(match worst.take() {
                    Some(w)
                        if w.as_ref().severity()
                            > e.as_ref().severity() =>
                    {
                        w
                    }
                    _ => e,
                });
            }
        }
    }

    Err(worst.unwrap_or_else(|| {
        tracerr::new!(AcquireError::Unknown(platform::Error::new(
            "EmptyLadder",
            "No acquisition strategies to attempt",
        )))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquire_conf() -> conf::Acquire {
        conf::Acquire::default()
    }

    #[test]
    fn camera_ladder_has_every_tier_in_order() {
        let ladder = camera_ladder(&acquire_conf(), Some("cam-7"));

        let labels: Vec<_> = ladder.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            [
                "exact-device",
                "ideal-resolution",
                "video-only",
                "unconstrained",
                "emergency-low",
                "emergency-video-only",
                "emergency-synthesized",
            ],
        );
        let tiers: Vec<_> = ladder.iter().map(|s| s.tier).collect();
        assert_eq!(tiers, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn device_pinned_tier_requires_a_preferred_device() {
        let ladder = camera_ladder(&acquire_conf(), None);

        assert_eq!(ladder[0].label, "ideal-resolution");
        assert_eq!(ladder.len(), 6);
    }

    #[test]
    fn screen_is_never_part_of_the_camera_ladder() {
        for strategy in camera_ladder(&acquire_conf(), Some("cam-1")) {
            assert_eq!(strategy.source, AcquireSource::Camera);
            assert!(!strategy.fallback.contains(FallbackMode::SCREEN));
        }
    }

    #[test]
    fn classifies_platform_errors_by_name() {
        let classify = |name: &str| {
            AcquireError::from(platform::Error::new(name, "boom"))
        };

        assert!(matches!(
            classify("NotAllowedError"),
            AcquireError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify("NotFoundError"),
            AcquireError::DeviceNotFound(_)
        ));
        assert!(matches!(
            classify("NotReadableError"),
            AcquireError::DeviceBusy(_)
        ));
        assert!(matches!(
            classify("OverconstrainedError"),
            AcquireError::ConstraintUnsatisfiable(_)
        ));
        assert!(matches!(
            classify("SomethingElse"),
            AcquireError::Unknown(_)
        ));
    }

    #[test]
    fn permission_denial_outranks_other_failures() {
        let permission = AcquireError::PermissionDenied(platform::Error::new(
            "NotAllowedError",
            "denied",
        ));
        let busy = AcquireError::DeviceBusy(platform::Error::new(
            "NotReadableError",
            "busy",
        ));

        assert!(permission.severity() > busy.severity());
        assert!(busy.severity() > AcquireError::Timeout.severity());
    }
}
