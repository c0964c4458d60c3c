//! Wrapper around a [MediaRecorder][1].
//!
//! [1]: https://w3.org/TR/mediastream-recording/#mediarecorder

use std::{cell::RefCell, rc::Rc, time::Duration};

use futures::channel::oneshot;
use tracerr::Traced;
use wasm_bindgen::JsValue;

use super::{
    blob::Blob, error::Error, media_track::MediaStreamTrack,
    utils::EventListener,
};

type RecorderListener<A> = EventListener<web_sys::MediaRecorder, A>;

/// Wrapper around a platform media recorder.
///
/// Handlers are invoked by the browser's `dataavailable`/`error` events.
pub struct Recorder {
    recorder: Rc<web_sys::MediaRecorder>,
    on_data: RefCell<Option<RecorderListener<web_sys::BlobEvent>>>,
    on_error: RefCell<Option<RecorderListener<web_sys::Event>>>,
    on_stop: RefCell<Option<RecorderListener<web_sys::Event>>>,
}

impl Recorder {
    /// Creates a new inactive [`Recorder`] over the given `tracks`.
    ///
    /// Falls back to the User Agent's default container when the
    /// requested `mime_type` is not supported.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the underlying [MediaRecorder][1] cannot be
    /// constructed.
    ///
    /// [1]: https://w3.org/TR/mediastream-recording/#mediarecorder
    pub fn new(
        tracks: &[MediaStreamTrack],
        mime_type: &str,
    ) -> Result<Self, Traced<Error>> {
        let stream = web_sys::MediaStream::new()
            .map_err(Error::from)
            .map_err(tracerr::wrap!())?;
        for track in tracks {
            stream.add_track(track.as_sys());
        }

        let mut options = web_sys::MediaRecorderOptions::new();
        if web_sys::MediaRecorder::is_type_supported(mime_type) {
            options.mime_type(mime_type);
        } else {
            log::warn!(
                "MIME type '{}' is not supported by MediaRecorder, \
                 falling back to the User Agent default",
                mime_type,
            );
        }

        let recorder =
            web_sys::MediaRecorder::new_with_media_stream_and_media_recorder_options(
                &stream, &options,
            )
            .map_err(Error::from)
            .map_err(tracerr::wrap!())?;

        Ok(Self {
            recorder: Rc::new(recorder),
            on_data: RefCell::new(None),
            on_error: RefCell::new(None),
            on_stop: RefCell::new(None),
        })
    }

    /// Sets the handler invoked with every emitted segment.
    ///
    /// Empty flushes are filtered out.
    pub fn set_on_chunk<F: Fn(Blob) + 'static>(&self, f: F) {
        let listener = EventListener::new_mut(
            Rc::clone(&self.recorder),
            "dataavailable",
            move |event: web_sys::BlobEvent| {
                if let Some(data) = event.data() {
                    if data.size() > 0.0 {
                        f(Blob::from(data));
                    }
                }
            },
        );
        match listener {
            Ok(listener) => {
                *self.on_data.borrow_mut() = Some(listener);
            }
            Err(e) => {
                log::error!(
                    "Failed to bind to 'dataavailable': {}",
                    e.as_ref(),
                );
            }
        }
    }

    /// Sets the handler invoked on a fatal recorder failure.
    pub fn set_on_error<F: Fn(Error) + 'static>(&self, f: F) {
        let listener = EventListener::new_mut(
            Rc::clone(&self.recorder),
            "error",
            move |event: web_sys::Event| {
                let cause = super::get_property_by_name(
                    &event,
                    "error",
                    |v: JsValue| Some(Error::from(v)),
                )
                .unwrap_or_else(|| {
                    Error::new("UnknownError", "MediaRecorder error")
                });
                f(cause);
            },
        );
        match listener {
            Ok(listener) => {
                *self.on_error.borrow_mut() = Some(listener);
            }
            Err(e) => {
                log::error!("Failed to bind to 'error': {}", e.as_ref());
            }
        }
    }

    /// Starts recording, flushing a segment every `timeslice`.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the underlying recorder refuses to start.
    #[allow(clippy::cast_possible_truncation)]
    pub fn start(&self, timeslice: Duration) -> Result<(), Traced<Error>> {
        self.recorder
            .start_with_time_slice(timeslice.as_millis() as i32)
            .map_err(Error::from)
            .map_err(tracerr::wrap!())
    }

    /// Pauses the recording, preserving the buffered segments.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the underlying recorder refuses.
    pub fn pause(&self) -> Result<(), Traced<Error>> {
        self.recorder
            .pause()
            .map_err(Error::from)
            .map_err(tracerr::wrap!())
    }

    /// Resumes a paused recording.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the underlying recorder refuses.
    pub fn resume(&self) -> Result<(), Traced<Error>> {
        self.recorder
            .resume()
            .map_err(Error::from)
            .map_err(tracerr::wrap!())
    }

    /// Stops recording.
    ///
    /// Resolves after the recorder fired its `stop` event: the final
    /// `dataavailable` flush has reached the chunk handler by then.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the underlying recorder refuses to stop.
    pub async fn stop(&self) -> Result<(), Traced<Error>> {
        if self.recorder.state() == web_sys::RecordingState::Inactive {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        let tx = RefCell::new(Some(tx));
        let listener = EventListener::new_mut(
            Rc::clone(&self.recorder),
            "stop",
            move |_: web_sys::Event| {
                if let Some(tx) = tx.borrow_mut().take() {
                    drop(tx.send(()));
                }
            },
        )
        .map_err(tracerr::wrap!())?;
        *self.on_stop.borrow_mut() = Some(listener);

        self.recorder
            .stop()
            .map_err(Error::from)
            .map_err(tracerr::wrap!())?;
        drop(rx.await);
        drop(self.on_stop.borrow_mut().take());
        Ok(())
    }
}
