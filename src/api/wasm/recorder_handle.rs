//! Recording session exported to the JS side.

use derive_more::From;
use futures::StreamExt as _;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::{
    media::AcquireSource, platform, recorder::RecordingSession,
};

use super::error::StagehandError;

/// Handle to the recording session of the active record screen.
#[wasm_bindgen]
#[derive(From)]
pub struct RecorderHandle(RecordingSession);

#[wasm_bindgen]
impl RecorderHandle {
    /// Acquires the camera (optionally pinned to the given device) and
    /// starts recording.
    pub fn start(&self, preferred_device_id: Option<String>) -> Promise {
        let session = self.0.clone();
        future_to_promise(async move {
            session
                .start(AcquireSource::Camera, preferred_device_id)
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Starts recording a screen capture instead of the camera.
    ///
    /// An explicit user choice, not an automatic fallback: it changes
    /// what is being recorded.
    pub fn start_screen(&self) -> Promise {
        let session = self.0.clone();
        future_to_promise(async move {
            session
                .start(AcquireSource::Screen, None)
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Suspends the capture, preserving the recorded segments and the
    /// elapsed time.
    ///
    /// # Errors
    ///
    /// If the session is not recording.
    pub fn pause(&self) -> Result<(), JsValue> {
        self.0
            .pause()
            .map_err(StagehandError::from)
            .map_err(JsValue::from)
    }

    /// Resumes a paused capture.
    ///
    /// # Errors
    ///
    /// If the session is not paused.
    pub fn resume(&self) -> Result<(), JsValue> {
        self.0
            .resume()
            .map_err(StagehandError::from)
            .map_err(JsValue::from)
    }

    /// Stops the capture and resolves with the finalized recording
    /// [Blob][1].
    ///
    /// [1]: https://w3.org/TR/FileAPI/#dfn-Blob
    pub fn stop(&self) -> Promise {
        let session = self.0.clone();
        future_to_promise(async move {
            session
                .stop()
                .await
                .map(|blob| blob.to_js())
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Resets a finished session back to idle, releasing the camera and
    /// discarding the result.
    ///
    /// # Errors
    ///
    /// If the session is recording or paused.
    pub fn reset(&self) -> Result<(), JsValue> {
        self.0
            .reset()
            .map_err(StagehandError::from)
            .map_err(JsValue::from)
    }

    /// Returns the current state of the session
    /// (`Idle`/`Initializing`/`Recording`/`Paused`/`Stopped`).
    #[must_use]
    pub fn state(&self) -> String {
        self.0.state().to_string()
    }

    /// Returns the seconds spent recording so far.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.0.elapsed_secs() as u32
    }

    /// Returns the number of segments captured so far.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn segment_count(&self) -> u32 {
        self.0.segment_count() as u32
    }

    /// Subscribes the given `callback` to the session state updates; it
    /// receives the state name as a string.
    pub fn on_state_change(&self, callback: js_sys::Function) {
        let func = platform::Function::<String>::from(callback);
        let mut states = self.0.observe_state();
        platform::spawn(async move {
            while let Some(state) = states.next().await {
                func.call1(state.to_string());
            }
        });
    }

    /// Subscribes the given `callback` to the elapsed seconds updates.
    pub fn on_time(&self, callback: js_sys::Function) {
        let func = platform::Function::<f64>::from(callback);
        let mut ticks = self.0.observe_elapsed();
        platform::spawn(async move {
            while let Some(secs) = ticks.next().await {
                #[allow(clippy::cast_precision_loss)]
                func.call1(secs as f64);
            }
        });
    }
}
