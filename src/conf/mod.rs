//! Application configuration options.
//!
//! All values have sane defaults and may be overridden with a JSON blob
//! handed over by the embedder on initialization.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// All configuration settings of the library.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Conf {
    /// Media acquisition settings.
    pub acquire: Acquire,

    /// Recording session settings.
    pub recorder: Recorder,

    /// Upload pipeline settings.
    pub upload: Upload,
}

impl Conf {
    /// Parses a [`Conf`] from the given JSON, layering the provided values
    /// over the defaults.
    ///
    /// # Errors
    ///
    /// Errors if the given string is not a valid JSON representation of
    /// [`Conf`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Media acquisition settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Acquire {
    /// Timeout of a single acquisition strategy attempt, racing against the
    /// User Agent's own grant/deny resolution.
    #[default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Width requested by the resolution-constrained ladder tiers.
    #[default = 1280]
    pub ideal_width: u32,

    /// Height requested by the resolution-constrained ladder tiers.
    #[default = 720]
    pub ideal_height: u32,

    /// Frame rate requested by the resolution-constrained ladder tiers.
    #[default = 30]
    pub ideal_frame_rate: u32,

    /// Width requested by the emergency ladder tiers.
    #[default = 320]
    pub emergency_width: u32,

    /// Height requested by the emergency ladder tiers.
    #[default = 240]
    pub emergency_height: u32,
}

/// Recording session settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Recorder {
    /// Interval of flushing the recorder buffer into a next segment.
    #[default(Duration::from_secs(1))]
    #[serde(with = "humantime_serde")]
    pub timeslice: Duration,

    /// Preferred MIME type of the produced recording.
    ///
    /// Falls back to the User Agent's default container when not supported.
    #[default(String::from("video/webm;codecs=vp8,opus"))]
    pub mime_type: String,
}

/// Upload pipeline settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Upload {
    /// Size of a single chunk of the resumable transfer.
    #[default(5 * 1024 * 1024)]
    pub chunk_size: u64,

    /// Maximum number of manual retries of a failed upload job.
    #[default = 3]
    pub max_retries: u8,

    /// Client-side settle delay of the `processing` phase.
    ///
    /// Remote transcoding is fire-and-forget and is not awaited beyond this
    /// delay.
    #[default(Duration::from_secs(2))]
    #[serde(with = "humantime_serde")]
    pub processing_settle: Duration,

    /// Name of the application root folder in the remote storage.
    #[default(String::from("Callboard"))]
    pub root_folder: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conf = Conf::default();

        assert_eq!(conf.acquire.attempt_timeout, Duration::from_secs(10));
        assert_eq!(conf.acquire.ideal_width, 1280);
        assert_eq!(conf.acquire.ideal_height, 720);
        assert_eq!(conf.recorder.timeslice, Duration::from_secs(1));
        assert_eq!(conf.upload.chunk_size, 5 * 1024 * 1024);
        assert_eq!(conf.upload.max_retries, 3);
        assert_eq!(conf.upload.root_folder, "Callboard");
    }

    #[test]
    fn overrides_defaults_with_json() {
        let conf = Conf::from_json(
            r#"{
                "acquire": {"attempt_timeout": "3s", "ideal_width": 1920},
                "upload": {"chunk_size": 1048576, "root_folder": "Studio"}
            }"#,
        )
        .unwrap();

        assert_eq!(conf.acquire.attempt_timeout, Duration::from_secs(3));
        assert_eq!(conf.acquire.ideal_width, 1920);
        assert_eq!(conf.acquire.ideal_height, 720);
        assert_eq!(conf.upload.chunk_size, 1024 * 1024);
        assert_eq!(conf.upload.root_folder, "Studio");
        assert_eq!(conf.upload.max_retries, 3);
    }

    #[test]
    fn json_roundtrip_keeps_durations_human_readable() {
        let json = serde_json::to_string(&Conf::default()).unwrap();

        assert!(json.contains("\"attempt_timeout\":\"10s\""));
        assert!(json.contains("\"timeslice\":\"1s\""));
    }
}
