//! Upload pipeline exported to the JS side.

use std::rc::Rc;

use derive_more::From;
use futures::StreamExt as _;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::{
    platform::{self, storage::RecordingMetadata},
    upload::{DestinationContext, UploadJob, UploadRequest, Uploader},
};

use super::error::StagehandError;

/// Factory of upload jobs exported to the JS side.
#[wasm_bindgen]
#[derive(From)]
pub struct UploaderHandle(Rc<Uploader>);

#[wasm_bindgen]
impl UploaderHandle {
    /// Validates the upload parameters and creates an
    /// [`UploadJobHandle`] for them.
    ///
    /// `metadata_json` is the JSON of the recording metadata record
    /// (`title`, `tags`, `duration_secs`).
    ///
    /// # Errors
    ///
    /// If the metadata JSON cannot be parsed, or a required field is
    /// missing.
    pub fn submit(
        &self,
        blob: web_sys::Blob,
        file_name: String,
        performance: String,
        rehearsal: String,
        metadata_json: &str,
    ) -> Result<UploadJobHandle, JsValue> {
        let metadata: RecordingMetadata = serde_json::from_str(metadata_json)
            .map_err(|e| {
                JsValue::from_str(&format!("invalid metadata: {}", e))
            })?;
        let request = UploadRequest {
            blob: platform::Blob::from(blob),
            file_name,
            destination: DestinationContext {
                performance,
                rehearsal,
            },
            metadata,
        };
        self.0
            .submit(request)
            .map(UploadJobHandle::from)
            .map_err(StagehandError::from)
            .map_err(JsValue::from)
    }

    /// Deletes the file with the given `id` from the remote storage.
    ///
    /// Lets the UI clean up a remnant of an abandoned upload.
    pub fn delete_file(&self, id: String) -> Promise {
        let uploader = Rc::clone(&self.0);
        future_to_promise(async move {
            uploader
                .delete_file(&id)
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }
}

/// One submitted recording making its way to the remote storage.
#[wasm_bindgen]
#[derive(From)]
pub struct UploadJobHandle(Rc<UploadJob>);

#[wasm_bindgen]
impl UploadJobHandle {
    /// Runs the whole pipeline and resolves with the uploaded file
    /// metadata (JSON).
    pub fn start(&self) -> Promise {
        let job = Rc::clone(&self.0);
        future_to_promise(async move {
            job.run()
                .await
                .map(|file| {
                    JsValue::from_serde(&file).unwrap_or(JsValue::NULL)
                })
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Reissues the whole pipeline from scratch, counting against the
    /// manual retry budget (3 retries).
    pub fn retry(&self) -> Promise {
        let job = Rc::clone(&self.0);
        future_to_promise(async move {
            job.retry()
                .await
                .map(|file| {
                    JsValue::from_serde(&file).unwrap_or(JsValue::NULL)
                })
                .map_err(StagehandError::from)
                .map_err(JsValue::from)
        })
    }

    /// Cancels this job: no further chunk will be issued.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// Returns the current phase of this job
    /// (`Preparing`/`Uploading`/`Processing`/`Saving`/`Complete`/
    /// `Error`).
    #[must_use]
    pub fn phase(&self) -> String {
        self.0.phase().to_string()
    }

    /// Returns the transfer progress, percent.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.0.progress()
    }

    /// Returns the number of manual retries consumed so far.
    #[must_use]
    pub fn retry_count(&self) -> u8 {
        self.0.retry_count()
    }

    /// Returns the failure message of the last run, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.0.error_message()
    }

    /// Subscribes the given `callback` to the phase updates; it receives
    /// the phase name as a string.
    pub fn on_phase_change(&self, callback: js_sys::Function) {
        let func = platform::Function::<String>::from(callback);
        let mut phases = self.0.observe_phase();
        platform::spawn(async move {
            while let Some(phase) = phases.next().await {
                func.call1(phase.to_string());
            }
        });
    }

    /// Subscribes the given `callback` to the progress updates,
    /// percent.
    pub fn on_progress(&self, callback: js_sys::Function) {
        let func = platform::Function::<f64>::from(callback);
        let mut updates = self.0.observe_progress();
        platform::spawn(async move {
            while let Some(percent) = updates.next().await {
                func.call1(f64::from(percent));
            }
        });
    }
}
