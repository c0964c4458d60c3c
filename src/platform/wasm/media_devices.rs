//! [MediaDevices][1] functionality.
//!
//! [1]: https://w3.org/TR/mediacapture-streams#mediadevices

use std::convert::TryFrom as _;

use tracerr::Traced;
use wasm_bindgen::{JsCast as _, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::media::{DisplayMediaSettings, MediaStreamSettings};

use super::{
    error::Error, input_device_info::InputDeviceInfo,
    media_track::MediaStreamTrack, window,
};

/// Collects information about the User Agent's available media input
/// devices.
///
/// Adapter for a [MediaDevices.enumerateDevices()][1] function.
///
/// # Errors
///
/// With [`Error`] if [MediaDevices.enumerateDevices()][1] fails or
/// [MediaDevices][2] cannot be obtained.
///
/// [1]: https://tinyurl.com/w3-streams#dom-mediadevices-enumeratedevices
/// [2]: https://w3.org/TR/mediacapture-streams#mediadevices
pub async fn enumerate_devices() -> Result<Vec<InputDeviceInfo>, Traced<Error>>
{
    let devices = window()
        .navigator()
        .media_devices()
        .map_err(Error::from)
        .map_err(tracerr::wrap!())?;
    let infos = JsFuture::from(
        devices
            .enumerate_devices()
            .map_err(Error::from)
            .map_err(tracerr::wrap!())?,
    )
    .await
    .map_err(Error::from)
    .map_err(tracerr::wrap!())?;

    Ok(js_sys::Array::from(&infos)
        .values()
        .into_iter()
        .filter_map(|info| {
            let info = web_sys::MediaDeviceInfo::from(info.ok()?);
            InputDeviceInfo::try_from(info).ok()
        })
        .collect())
}

/// Prompts the user for a permission to use a media input, producing the
/// requested types of media tracks.
///
/// Adapter for a [MediaDevices.getUserMedia()][1] function.
///
/// # Errors
///
/// With [`Error`] if [MediaDevices.getUserMedia()][1] fails or
/// [MediaDevices][2] cannot be obtained.
///
/// [1]: https://w3.org/TR/mediacapture-streams#dom-mediadevices-getusermedia
/// [2]: https://w3.org/TR/mediacapture-streams#mediadevices
pub async fn get_user_media(
    settings: &MediaStreamSettings,
) -> Result<Vec<MediaStreamTrack>, Traced<Error>> {
    let media_devices = window()
        .navigator()
        .media_devices()
        .map_err(Error::from)
        .map_err(tracerr::wrap!())?;

    let stream = JsFuture::from(
        media_devices
            .get_user_media_with_constraints(&settings.into())
            .map_err(Error::from)
            .map_err(tracerr::wrap!())?,
    )
    .await
    .map(web_sys::MediaStream::from)
    .map_err(Error::from)
    .map_err(tracerr::wrap!())?;

    Ok(stream_tracks(&stream))
}

/// Prompts the user to select and grant a permission to capture the
/// contents of a display (or a portion thereof).
///
/// Adapter for a [MediaDevices.getDisplayMedia()][1] function.
///
/// # Errors
///
/// With [`Error`] if [MediaDevices.getDisplayMedia()][1] fails or
/// [MediaDevices][2] cannot be obtained.
///
/// [1]: https://w3.org/TR/screen-capture#dom-mediadevices-getdisplaymedia
/// [2]: https://w3.org/TR/mediacapture-streams#mediadevices
pub async fn get_display_media(
    settings: &DisplayMediaSettings,
) -> Result<Vec<MediaStreamTrack>, Traced<Error>> {
    let media_devices = window()
        .navigator()
        .media_devices()
        .map_err(Error::from)
        .map_err(tracerr::wrap!())?;

    let stream = JsFuture::from(
        media_devices
            .get_display_media_with_constraints(&settings.into())
            .map_err(Error::from)
            .map_err(tracerr::wrap!())?,
    )
    .await
    .map(web_sys::MediaStream::from)
    .map_err(Error::from)
    .map_err(tracerr::wrap!())?;

    Ok(stream_tracks(&stream))
}

/// Produces a synthesized black-frame video track captured from an
/// off-screen canvas.
///
/// # Errors
///
/// With [`Error`] if the canvas cannot be created or captured.
pub fn synthesized_video_track() -> Result<MediaStreamTrack, Traced<Error>> {
    let document = window().document().ok_or_else(|| {
        tracerr::new!(Error::new("InvalidStateError", "No document object"))
    })?;
    let canvas = document
        .create_element("canvas")
        .map_err(Error::from)
        .map_err(tracerr::wrap!())?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| {
            tracerr::new!(Error::new(
                "InvalidStateError",
                "Failed to create a canvas element",
            ))
        })?;
    canvas.set_width(320);
    canvas.set_height(240);

    if let Some(ctx) = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| {
            ctx.dyn_into::<web_sys::CanvasRenderingContext2d>().ok()
        })
    {
        ctx.set_fill_style(&JsValue::from_str("#000"));
        ctx.fill_rect(0.0, 0.0, 320.0, 240.0);
    }

    // `captureStream()` is missing from the generated bindings, so it is
    // reached through reflection.
    let capture =
        js_sys::Reflect::get(canvas.as_ref(), &JsValue::from_str(
            "captureStream",
        ))
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
        .ok_or_else(|| {
            tracerr::new!(Error::new(
                "NotSupportedError",
                "canvas.captureStream() is not available",
            ))
        })?;
    let stream = capture
        .call1(canvas.as_ref(), &JsValue::from_f64(30.0))
        .map_err(Error::from)
        .map_err(tracerr::wrap!())?;
    let stream = web_sys::MediaStream::from(stream);

    stream_tracks(&stream).into_iter().next().ok_or_else(|| {
        tracerr::new!(Error::new(
            "NotSupportedError",
            "canvas.captureStream() produced no video track",
        ))
    })
}

/// Collects the tracks of the given [`web_sys::MediaStream`].
fn stream_tracks(stream: &web_sys::MediaStream) -> Vec<MediaStreamTrack> {
    js_sys::Array::from(&stream.get_tracks())
        .values()
        .into_iter()
        .filter_map(|track| {
            Some(MediaStreamTrack::from(
                web_sys::MediaStreamTrack::from(track.ok()?),
            ))
        })
        .collect()
}
