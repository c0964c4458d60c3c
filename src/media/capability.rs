//! Probing of the runtime environment capabilities.

use derive_more::Display;
use serde::Serialize;

use crate::platform;

use super::{ladder::AcquireError, MediaKind};

pub use crate::platform::InputDeviceInfo;

/// Family of the User Agent, guessed from its user agent string.
///
/// Only used to tailor the permission-recovery guidance shown to the
/// user, so the guess is allowed to be rough.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium-family browsers.
    Chrome,

    /// Mozilla Firefox.
    Firefox,

    /// Apple Safari.
    Safari,

    /// Microsoft Edge.
    Edge,

    /// Everything else.
    Other,
}

impl BrowserKind {
    /// Guesses the [`BrowserKind`] from the given user agent string.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("Edg/") || user_agent.contains("Edge/") {
            Self::Edge
        } else if user_agent.contains("Firefox/") {
            Self::Firefox
        } else if user_agent.contains("Chrome/") {
            Self::Chrome
        } else if user_agent.contains("Safari/") {
            Self::Safari
        } else {
            Self::Other
        }
    }
}

/// Report of a synchronous inspection of the host environment.
#[derive(Clone, Debug, Serialize)]
pub struct CompatibilityReport {
    /// Whether the media capture API is present.
    pub media_api_supported: bool,

    /// Whether the media recorder API is present.
    pub recorder_api_supported: bool,

    /// Whether input devices can be enumerated.
    pub device_enumeration_supported: bool,

    /// Whether screen capture is available.
    pub screen_share_supported: bool,

    /// Whether the page runs in a secure context.
    ///
    /// Media capture is not reachable from insecure contexts at all.
    pub is_secure_context: bool,

    /// Family of the User Agent.
    pub browser: BrowserKind,
}

impl CompatibilityReport {
    /// Returns the unrecoverable environment failure to surface before any
    /// acquisition attempt, if there is one.
    ///
    /// Missing screen share or device enumeration is not blocking: the
    /// ladder degrades around those.
    #[must_use]
    pub fn blocking_defect(&self) -> Option<AcquireError> {
        if !self.is_secure_context {
            return Some(AcquireError::InsecureContext);
        }
        if !self.media_api_supported {
            return Some(AcquireError::UnsupportedPlatform(String::from(
                "media capture API is not available",
            )));
        }
        if !self.recorder_api_supported {
            return Some(AcquireError::UnsupportedPlatform(String::from(
                "media recorder API is not available",
            )));
        }
        None
    }
}

/// Inspects the host environment.
///
/// Pure and synchronous: safe to call at any point, any number of times.
#[must_use]
pub fn check_compatibility() -> CompatibilityReport {
    let caps = platform::capabilities();
    CompatibilityReport {
        media_api_supported: caps.media_devices,
        recorder_api_supported: caps.recorder,
        device_enumeration_supported: caps.device_enumeration,
        screen_share_supported: caps.display_media,
        is_secure_context: caps.secure_context,
        browser: BrowserKind::from_user_agent(&caps.user_agent),
    }
}

/// Enumerates connected video input devices.
///
/// Fails soft: an enumeration error is logged and an empty list is
/// returned, since a missing device list only degrades the
/// camera-selection UI.
pub async fn enumerate_devices() -> Vec<InputDeviceInfo> {
    match platform::enumerate_devices().await {
        Ok(devices) => devices
            .into_iter()
            .filter(|d| d.kind() == MediaKind::Video)
            .collect(),
        Err(e) => {
            log::warn!("Failed to enumerate devices: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_browser_family() {
        for (ua, expected) in &[
            ("Mozilla/5.0 (X11; Linux x86_64) Chrome/90.0", BrowserKind::Chrome),
            (
                "Mozilla/5.0 (X11; Linux x86_64; rv:88.0) Gecko/20100101 \
                 Firefox/88.0",
                BrowserKind::Firefox,
            ),
            (
                "Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/14.0 \
                 Safari/605.1.15",
                BrowserKind::Safari,
            ),
            (
                "Mozilla/5.0 (Windows NT 10.0) Chrome/91.0 Safari/537.36 \
                 Edg/91.0",
                BrowserKind::Edge,
            ),
            ("curl/7.68.0", BrowserKind::Other),
        ] {
            assert_eq!(BrowserKind::from_user_agent(ua), *expected, "{}", ua);
        }
    }

    #[test]
    fn insecure_context_is_a_blocking_defect() {
        let report = CompatibilityReport {
            media_api_supported: true,
            recorder_api_supported: true,
            device_enumeration_supported: true,
            screen_share_supported: true,
            is_secure_context: false,
            browser: BrowserKind::Chrome,
        };

        assert!(matches!(
            report.blocking_defect(),
            Some(AcquireError::InsecureContext)
        ));
    }

    #[test]
    fn missing_screen_share_is_not_blocking() {
        let report = CompatibilityReport {
            media_api_supported: true,
            recorder_api_supported: true,
            device_enumeration_supported: false,
            screen_share_supported: false,
            is_secure_context: true,
            browser: BrowserKind::Firefox,
        };

        assert!(report.blocking_defect().is_none());
    }
}
