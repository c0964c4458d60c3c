//! Media devices functionality of the native adapter.

use futures::future;
use tracerr::Traced;

use crate::media::{DisplayMediaSettings, MediaKind, MediaStreamSettings};

use super::{
    error::Error,
    input_device_info::InputDeviceInfo,
    media_track::MediaStreamTrack,
    rig::{self, MediaRequest},
};

/// Collects information about available media input devices.
///
/// # Errors
///
/// With [`Error`] if the rig is programmed to fail enumeration.
pub async fn enumerate_devices() -> Result<Vec<InputDeviceInfo>, Traced<Error>>
{
    let rig = rig::current();
    if rig.enumeration_fails() {
        return Err(tracerr::new!(Error::new(
            "EnumerationError",
            "Device enumeration failed",
        )));
    }
    Ok(rig
        .cameras()
        .into_iter()
        .map(|d| InputDeviceInfo::new(d.id, d.label, MediaKind::Video))
        .collect())
}

/// Requests camera/microphone tracks satisfying the given constraints.
///
/// # Errors
///
/// With [`Error`] if the rig rejects the request.
pub async fn get_user_media(
    settings: &MediaStreamSettings,
) -> Result<Vec<MediaStreamTrack>, Traced<Error>> {
    let rig = rig::current();
    let request =
        MediaRequest::from_camera(settings, rig.live_track_count());
    rig.log_request(request.clone());

    if rig.hangs() {
        future::pending::<()>().await;
    }
    if let Some(failure) = rig.decide(&request) {
        return Err(tracerr::new!(failure.into_error()));
    }

    let mut tracks = Vec::new();
    if request.video {
        let camera = rig
            .resolve_camera(request.device_id.as_deref())
            .ok_or_else(|| {
                tracerr::new!(Error::new(
                    "NotFoundError",
                    "Requested device not found",
                ))
            })?;
        tracks.push(MediaStreamTrack::new(
            &rig,
            MediaKind::Video,
            Some(camera.id),
        ));
    }
    if request.audio {
        tracks.push(MediaStreamTrack::new(
            &rig,
            MediaKind::Audio,
            Some(String::from("mic-1")),
        ));
    }
    Ok(tracks)
}

/// Requests screen capture tracks.
///
/// # Errors
///
/// With [`Error`] if the rig rejects the request.
pub async fn get_display_media(
    settings: &DisplayMediaSettings,
) -> Result<Vec<MediaStreamTrack>, Traced<Error>> {
    let rig = rig::current();
    let request =
        MediaRequest::from_screen(settings, rig.live_track_count());
    rig.log_request(request.clone());

    if rig.hangs() {
        future::pending::<()>().await;
    }
    if let Some(failure) = rig.decide(&request) {
        return Err(tracerr::new!(failure.into_error()));
    }

    let mut tracks = vec![MediaStreamTrack::new(
        &rig,
        MediaKind::Video,
        Some(String::from("screen")),
    )];
    if request.audio {
        tracks.push(MediaStreamTrack::new(
            &rig,
            MediaKind::Audio,
            Some(String::from("system-audio")),
        ));
    }
    Ok(tracks)
}

/// Produces a synthesized black-frame video track.
///
/// # Errors
///
/// Never on this platform; the signature matches the browser adapter,
/// where painting the backing canvas may fail.
pub fn synthesized_video_track() -> Result<MediaStreamTrack, Traced<Error>> {
    let rig = rig::current();
    Ok(MediaStreamTrack::new(
        &rig,
        MediaKind::Video,
        Some(String::from("synthetic")),
    ))
}
