//! Chunked resumable upload pipeline.
//!
//! Takes a finished recording blob, resolves the remote folder hierarchy,
//! transfers the bytes in sequential byte-ranged chunks, settles the
//! remote processing, and persists the recording metadata record.

pub mod folders;

use std::{
    cell::{Cell, RefCell},
    future::Future,
    rc::Rc,
};

use derive_more::Display;
use futures::stream::LocalBoxStream;
use medea_reactive::ObservableCell;
use tracerr::Traced;

use crate::{
    conf,
    platform::{
        self,
        storage::{
            AccessTokenProvider, ByteRange, ChunkOutcome, ObjectStorage,
            RecordingMetadata, RecordingRegistry, RemoteFile, StorageError,
            StorageResult,
        },
    },
    utils::Caused,
};

/// Phase of an [`UploadJob`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum UploadPhase {
    /// Resolving the remote folder hierarchy and opening the upload
    /// session.
    Preparing,

    /// Transferring byte-ranged chunks.
    Uploading,

    /// Client-side settle delay for the remote processing.
    Processing,

    /// Persisting the recording metadata record.
    Saving,

    /// Everything durable; the job is finished.
    Complete,

    /// The job failed; inspect the error message and retry manually.
    Error,
}

/// Errors occurring in the upload pipeline.
#[derive(Clone, Debug, Display)]
pub enum UploadError {
    /// A required metadata field is missing. Corrected synchronously by
    /// the user, never retried.
    #[display(fmt = "Invalid recording metadata: {}", _0)]
    Validation(String),

    /// A remote collaborator call failed.
    #[display(fmt = "{}", _0)]
    Storage(StorageError),

    /// The storage ended the upload session out of step with the byte
    /// ranges sent.
    #[display(fmt = "Upload session ended prematurely")]
    Incomplete,

    /// The job was cancelled by the user.
    #[display(fmt = "Upload cancelled")]
    Cancelled,

    /// Another run of this job is still in flight.
    #[display(fmt = "Upload is already in progress")]
    AlreadyRunning,

    /// The manual retry budget is exhausted.
    #[display(fmt = "Max retries reached: the upload must be restarted \
                     manually")]
    RetriesExceeded,
}

impl From<StorageError> for UploadError {
    #[inline]
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl Caused for UploadError {
    type Error = platform::Error;

    fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "InvalidMetadata",
            Self::Storage(_) => "UploadFailed",
            Self::Incomplete => "UploadIncomplete",
            Self::Cancelled => "UploadCancelled",
            Self::AlreadyRunning => "UploadAlreadyRunning",
            Self::RetriesExceeded => "MaxRetriesReached",
        }
    }

    fn cause(self) -> Option<Self::Error> {
        None
    }
}

/// Result of an upload pipeline step.
pub type Result<T> = std::result::Result<T, Traced<UploadError>>;

/// Destination of an uploaded recording in the remote folder hierarchy:
/// `<app root>/<performance>/<rehearsal>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DestinationContext {
    /// Name of the performance folder.
    pub performance: String,

    /// Name of the rehearsal folder.
    pub rehearsal: String,
}

/// Parameters of a single upload.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// The finished recording.
    pub blob: platform::Blob,

    /// File name to store the recording under.
    pub file_name: String,

    /// Destination in the remote folder hierarchy.
    pub destination: DestinationContext,

    /// Metadata record to persist once the transfer completes.
    pub metadata: RecordingMetadata,
}

/// Calls a storage operation with a bearer token, re-requesting the
/// token and reissuing the call once if it is rejected for the lack of
/// one.
pub(super) async fn with_auth<T, F, Fut>(
    auth: &Rc<dyn AccessTokenProvider>,
    call: F,
) -> Result<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let token = auth
        .access_token()
        .await
        .map_err(tracerr::map_from_and_wrap!(=> UploadError))?;
    match call(token).await {
        Err(e) if matches!(e.as_ref(), StorageError::Auth(_)) => {
            log::info!(
                "Storage call rejected for the lack of a token: refreshing",
            );
            let token = auth
                .refresh()
                .await
                .map_err(tracerr::map_from_and_wrap!(=> UploadError))?;
            call(token)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> UploadError))
        }
        other => {
            other.map_err(tracerr::map_from_and_wrap!(=> UploadError))
        }
    }
}

/// Factory of [`UploadJob`]s over the configured remote collaborators.
pub struct Uploader {
    conf: conf::Upload,
    storage: Rc<dyn ObjectStorage>,
    auth: Rc<dyn AccessTokenProvider>,
    registry: Rc<dyn RecordingRegistry>,
}

impl Uploader {
    /// Creates a new [`Uploader`].
    #[must_use]
    pub fn new(
        conf: conf::Upload,
        storage: Rc<dyn ObjectStorage>,
        auth: Rc<dyn AccessTokenProvider>,
        registry: Rc<dyn RecordingRegistry>,
    ) -> Self {
        Self {
            conf,
            storage,
            auth,
            registry,
        }
    }

    /// Validates the given `request` and creates an [`UploadJob`] for it.
    ///
    /// # Errors
    ///
    /// With [`UploadError::Validation`] if a required metadata field is
    /// missing. Validation failures never consume a retry: the user
    /// corrects the form and submits again.
    pub fn submit(&self, request: UploadRequest) -> Result<Rc<UploadJob>> {
        if request.metadata.title.trim().is_empty() {
            return Err(tracerr::new!(UploadError::Validation(
                String::from("recording title cannot be empty"),
            )));
        }
        if request.blob.size() == 0 {
            return Err(tracerr::new!(UploadError::Validation(
                String::from("recording is empty"),
            )));
        }
        Ok(Rc::new(UploadJob {
            conf: self.conf.clone(),
            storage: Rc::clone(&self.storage),
            auth: Rc::clone(&self.auth),
            registry: Rc::clone(&self.registry),
            request,
            phase: ObservableCell::new(UploadPhase::Preparing),
            progress: ObservableCell::new(0),
            retry_count: ObservableCell::new(0),
            error: RefCell::new(None),
            cancelled: Cell::new(false),
            running: Cell::new(false),
            outcome: RefCell::new(None),
            on_progress: RefCell::new(None),
        }))
    }

    /// Deletes the file with the given `id` from the remote storage.
    ///
    /// Lets the UI clean up a remnant of an abandoned upload.
    ///
    /// # Errors
    ///
    /// With [`UploadError::Storage`] if the storage call fails.
    pub async fn delete_file(&self, id: &str) -> Result<()> {
        let storage = Rc::clone(&self.storage);
        let id = String::from(id);
        with_auth(&self.auth, move |token| {
            let storage = Rc::clone(&storage);
            let id = id.clone();
            async move { storage.delete_file(&token, &id).await }
        })
        .await
    }
}

/// One submitted recording making its way to the remote storage.
pub struct UploadJob {
    conf: conf::Upload,
    storage: Rc<dyn ObjectStorage>,
    auth: Rc<dyn AccessTokenProvider>,
    registry: Rc<dyn RecordingRegistry>,
    request: UploadRequest,

    /// Current phase of the pipeline.
    phase: ObservableCell<UploadPhase>,

    /// Transfer progress, percent. Monotone within one run, exactly 100
    /// only after the last chunk is acknowledged.
    progress: ObservableCell<u8>,

    /// Number of manual retries consumed so far.
    retry_count: ObservableCell<u8>,

    /// Human-readable failure of the last run, if any.
    error: RefCell<Option<String>>,

    /// Cancellation token checked before every chunk.
    cancelled: Cell<bool>,

    /// Guard against overlapping runs of one job.
    running: Cell<bool>,

    /// The uploaded file, once the job completed.
    outcome: RefCell<Option<RemoteFile>>,

    /// Hook invoked with every progress update.
    on_progress: RefCell<Option<Box<dyn Fn(u8)>>>,
}

impl UploadJob {
    /// Runs the whole pipeline: folder resolution, chunked transfer,
    /// processing settle and metadata persistence.
    ///
    /// # Errors
    ///
    /// With [`UploadError`]; the job phase is [`UploadPhase::Error`] and
    /// the message is kept for the UI. Partial remote progress (created
    /// folders, transferred chunks) is retained, not rolled back.
    pub async fn run(&self) -> Result<RemoteFile> {
        if self.running.replace(true) {
            return Err(tracerr::new!(UploadError::AlreadyRunning));
        }
        let result = self.attempt().await;
        self.running.set(false);

        match &result {
            Ok(file) => {
                *self.outcome.borrow_mut() = Some(file.clone());
                *self.error.borrow_mut() = None;
            }
            Err(e) => {
                let message = e.as_ref().to_string();
                log::error!("Upload failed: {}", message);
                *self.error.borrow_mut() = Some(message);
                self.phase.set(UploadPhase::Error);
            }
        }
        result
    }

    /// Reissues the whole pipeline from scratch (from chunk 1), counting
    /// against the manual retry budget.
    ///
    /// # Errors
    ///
    /// With [`UploadError::RetriesExceeded`] once the budget is
    /// exhausted (no remote call is made then), or any error of
    /// [`UploadJob::run()`].
    pub async fn retry(&self) -> Result<RemoteFile> {
        let used = self.retry_count.get();
        if used >= self.conf.max_retries {
            let message = UploadError::RetriesExceeded.to_string();
            *self.error.borrow_mut() = Some(message);
            self.phase.set(UploadPhase::Error);
            return Err(tracerr::new!(UploadError::RetriesExceeded));
        }
        self.retry_count.set(used + 1);
        self.cancelled.set(false);
        self.run().await
    }

    /// Cancels this job: no further chunk will be issued.
    ///
    /// The chunk in flight (if any) completes; the job then fails with
    /// [`UploadError::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Sets the hook invoked with every progress update.
    pub fn set_on_progress<F: Fn(u8) + 'static>(&self, hook: F) {
        *self.on_progress.borrow_mut() = Some(Box::new(hook));
    }

    /// Returns the current phase of this job.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> UploadPhase {
        self.phase.get()
    }

    /// Returns a [`LocalBoxStream`] of the phase updates.
    ///
    /// The current phase is emitted first.
    #[must_use]
    pub fn observe_phase(&self) -> LocalBoxStream<'static, UploadPhase> {
        self.phase.subscribe()
    }

    /// Returns the current transfer progress, percent.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    /// Returns a [`LocalBoxStream`] of the progress updates.
    #[must_use]
    pub fn observe_progress(&self) -> LocalBoxStream<'static, u8> {
        self.progress.subscribe()
    }

    /// Returns the number of manual retries consumed so far.
    #[inline]
    #[must_use]
    pub fn retry_count(&self) -> u8 {
        self.retry_count.get()
    }

    /// Returns the failure message of the last run, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    /// Returns the uploaded file, once this job completed.
    #[must_use]
    pub fn remote_file(&self) -> Option<RemoteFile> {
        self.outcome.borrow().clone()
    }

    /// Fails fast if this job was cancelled.
    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancelled.get() {
            Err(tracerr::new!(UploadError::Cancelled))
        } else {
            Ok(())
        }
    }

    /// One full pass of the pipeline.
    async fn attempt(&self) -> Result<RemoteFile> {
        self.progress.set(0);
        self.phase.set(UploadPhase::Preparing);
        self.ensure_not_cancelled()?;

        let destination = &self.request.destination;
        let folder = folders::ensure_folder_structure(
            &self.storage,
            &self.auth,
            &self.conf.root_folder,
            &destination.performance,
            &destination.rehearsal,
        )
        .await
        .map_err(tracerr::wrap!())?;

        let blob = &self.request.blob;
        let total = blob.size();
        let mime_type = blob.mime_type();
        let session = {
            let storage = Rc::clone(&self.storage);
            let folder_id = folder.id.clone();
            let file_name = self.request.file_name.clone();
            let mime_type = mime_type.clone();
            with_auth(&self.auth, move |token| {
                let storage = Rc::clone(&storage);
                let folder_id = folder_id.clone();
                let file_name = file_name.clone();
                let mime_type = mime_type.clone();
                async move {
                    storage
                        .initiate_upload(
                            &token, &folder_id, &file_name, total,
                            &mime_type,
                        )
                        .await
                }
            })
            .await?
        };

        self.phase.set(UploadPhase::Uploading);
        let chunk_size = self.conf.chunk_size.max(1);
        let total_chunks = (total + chunk_size - 1) / chunk_size;
        let mut uploaded_file = None;

        for index in 0..total_chunks {
            self.ensure_not_cancelled()?;

            let start = index * chunk_size;
            let end = (start + chunk_size).min(total);
            let range = ByteRange { start, end, total };
            let chunk = blob.slice(start, end);
            let is_last = index + 1 == total_chunks;

            log::debug!(
                "Uploading chunk {}/{} ({})",
                index + 1,
                total_chunks,
                range.to_content_range(),
            );
            let outcome = {
                let storage = Rc::clone(&self.storage);
                let session = session.clone();
                with_auth(&self.auth, move |token| {
                    let storage = Rc::clone(&storage);
                    let session = session.clone();
                    let chunk = chunk.clone();
                    async move {
                        storage
                            .put_chunk(&token, &session, range, chunk)
                            .await
                    }
                })
                .await?
            };

            let percent = (((index + 1) * 100 + total_chunks / 2)
                / total_chunks) as u8;
            self.progress.set(percent);
            if let Some(hook) = self.on_progress.borrow().as_ref() {
                hook(percent);
            }

            match outcome {
                ChunkOutcome::InProgress if !is_last => {}
                ChunkOutcome::Complete(file) if is_last => {
                    uploaded_file = Some(file);
                }
                ChunkOutcome::InProgress => {
                    return Err(tracerr::new!(UploadError::Incomplete));
                }
                ChunkOutcome::Complete(_) => {
                    log::warn!(
                        "Storage assembled the file before the last chunk \
                         was sent",
                    );
                    return Err(tracerr::new!(UploadError::Incomplete));
                }
            }
        }
        let file = match uploaded_file {
            Some(file) => file,
            None => return Err(tracerr::new!(UploadError::Incomplete)),
        };

        self.phase.set(UploadPhase::Processing);
        platform::delay_for(self.conf.processing_settle).await;
        let file = {
            let storage = Rc::clone(&self.storage);
            let id = file.id.clone();
            match with_auth(&self.auth, move |token| {
                let storage = Rc::clone(&storage);
                let id = id.clone();
                async move { storage.get_file(&token, &id).await }
            })
            .await
            {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    log::warn!(
                        "Keeping the transfer-time file metadata: {}",
                        e.as_ref(),
                    );
                    file
                }
            }
        };

        self.phase.set(UploadPhase::Saving);
        let mut metadata = self.request.metadata.clone();
        metadata.file = Some(file.clone());
        let record_id = self
            .registry
            .save_recording(metadata)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> UploadError))?;
        log::info!(
            "Recording '{}' saved as {} referencing remote file {}",
            self.request.metadata.title,
            record_id,
            file.id,
        );

        self.phase.set(UploadPhase::Complete);
        Ok(file)
    }
}
