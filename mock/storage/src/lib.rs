//! In-memory implementations of the remote collaborators consumed by the
//! Stagehand upload pipeline: the object storage, the auth/session
//! collaborator and the recording metadata registry.
//!
//! One [`MemoryBackend`] holds the shared state; the trait objects it
//! hands out all point into it, so a test can program failures and then
//! inspect every call the pipeline issued.

#![cfg(not(target_arch = "wasm32"))]
#![allow(clippy::module_name_repetitions)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use async_trait::async_trait;
use stagehand::platform::{
    storage::{
        AccessTokenProvider, ByteRange, ChunkOutcome, ObjectStorage,
        RecordId, RecordingMetadata, RecordingRegistry, RemoteFile,
        RemoteFolder, StorageError, StorageResult, UploadSessionUrl,
    },
    Blob,
};

#[derive(Clone, Debug)]
struct FolderRec {
    id: String,
    parent: Option<String>,
    name: String,
}

#[derive(Debug)]
struct SessionRec {
    folder: String,
    name: String,
    total: u64,
    received: u64,
    data: Vec<u8>,
    chunks_received: u32,
}

#[derive(Clone, Copy, Debug)]
struct ChunkFailure {
    index: u32,
    times_left: u32,
}

#[derive(Default)]
struct BackendState {
    next_id: Cell<u32>,
    folders: RefCell<Vec<FolderRec>>,
    folder_creates: Cell<u32>,
    sessions: RefCell<HashMap<String, SessionRec>>,
    files: RefCell<HashMap<String, RemoteFile>>,
    file_bytes: RefCell<HashMap<String, Vec<u8>>>,
    put_log: RefCell<Vec<ByteRange>>,
    chunk_failure: Cell<Option<ChunkFailure>>,
    valid_token: RefCell<String>,
    issued_token: RefCell<String>,
    refresh_count: Cell<u32>,
    saved: RefCell<Vec<RecordingMetadata>>,
}

impl BackendState {
    fn next_id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn check_token(&self, token: &str) -> StorageResult<()> {
        if token == self.valid_token.borrow().as_str() {
            Ok(())
        } else {
            Err(tracerr::new!(StorageError::Auth(String::from(
                "stale access token",
            ))))
        }
    }
}

/// Shared in-memory backend behind the mock collaborators.
pub struct MemoryBackend(Rc<BackendState>);

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates a new empty [`MemoryBackend`].
    #[must_use]
    pub fn new() -> Self {
        let state = BackendState::default();
        *state.valid_token.borrow_mut() = String::from("token-0");
        *state.issued_token.borrow_mut() = String::from("token-0");
        Self(Rc::new(state))
    }

    /// Returns the [`ObjectStorage`] view of this backend.
    #[must_use]
    pub fn storage(&self) -> Rc<dyn ObjectStorage> {
        Rc::new(MemoryStorage(Rc::clone(&self.0)))
    }

    /// Returns the [`AccessTokenProvider`] view of this backend.
    #[must_use]
    pub fn auth(&self) -> Rc<dyn AccessTokenProvider> {
        Rc::new(MemoryAuth(Rc::clone(&self.0)))
    }

    /// Returns the [`RecordingRegistry`] view of this backend.
    #[must_use]
    pub fn registry(&self) -> Rc<dyn RecordingRegistry> {
        Rc::new(MemoryRegistry(Rc::clone(&self.0)))
    }

    /// Invalidates the currently issued access token: storage calls
    /// fail with an auth error until the provider refreshes.
    pub fn expire_token(&self) {
        let next = format!("token-{}", self.0.next_id());
        *self.0.valid_token.borrow_mut() = next;
    }

    /// Programs the `index`-th (0-based, per upload session) chunk PUT
    /// to fail with a network error `times` times.
    pub fn fail_chunk(&self, index: u32, times: u32) {
        self.0.chunk_failure.set(Some(ChunkFailure {
            index,
            times_left: times,
        }));
    }

    /// Returns how many folders were actually created (not found and
    /// reused).
    #[must_use]
    pub fn folder_create_count(&self) -> u32 {
        self.0.folder_creates.get()
    }

    /// Returns every chunk PUT observed, in issue order.
    #[must_use]
    pub fn put_ranges(&self) -> Vec<ByteRange> {
        self.0.put_log.borrow().clone()
    }

    /// Returns how many times the token was refreshed.
    #[must_use]
    pub fn refresh_count(&self) -> u32 {
        self.0.refresh_count.get()
    }

    /// Returns the assembled bytes of the file with the given `id`.
    #[must_use]
    pub fn file_bytes(&self, id: &str) -> Option<Vec<u8>> {
        self.0.file_bytes.borrow().get(id).cloned()
    }

    /// Returns every persisted recording metadata record.
    #[must_use]
    pub fn saved_recordings(&self) -> Vec<RecordingMetadata> {
        self.0.saved.borrow().clone()
    }
}

/// [`ObjectStorage`] view of a [`MemoryBackend`].
struct MemoryStorage(Rc<BackendState>);

#[async_trait(?Send)]
impl ObjectStorage for MemoryStorage {
    async fn find_folder(
        &self,
        token: &str,
        parent: Option<&str>,
        name: &str,
    ) -> StorageResult<Option<RemoteFolder>> {
        self.0.check_token(token)?;
        Ok(self
            .0
            .folders
            .borrow()
            .iter()
            .find(|f| f.parent.as_deref() == parent && f.name == name)
            .map(|f| RemoteFolder {
                id: f.id.clone(),
                name: f.name.clone(),
            }))
    }

    async fn create_folder(
        &self,
        token: &str,
        parent: Option<&str>,
        name: &str,
    ) -> StorageResult<RemoteFolder> {
        self.0.check_token(token)?;
        let id = format!("folder-{}", self.0.next_id());
        self.0.folders.borrow_mut().push(FolderRec {
            id: id.clone(),
            parent: parent.map(String::from),
            name: String::from(name),
        });
        self.0.folder_creates.set(self.0.folder_creates.get() + 1);
        Ok(RemoteFolder {
            id,
            name: String::from(name),
        })
    }

    async fn initiate_upload(
        &self,
        token: &str,
        folder: &str,
        file_name: &str,
        size: u64,
        _mime_type: &str,
    ) -> StorageResult<UploadSessionUrl> {
        self.0.check_token(token)?;
        let url = format!("mem://upload/{}", self.0.next_id());
        self.0.sessions.borrow_mut().insert(
            url.clone(),
            SessionRec {
                folder: String::from(folder),
                name: String::from(file_name),
                total: size,
                received: 0,
                data: Vec::new(),
                chunks_received: 0,
            },
        );
        Ok(UploadSessionUrl(url))
    }

    async fn put_chunk(
        &self,
        token: &str,
        session: &UploadSessionUrl,
        range: ByteRange,
        chunk: Blob,
    ) -> StorageResult<ChunkOutcome> {
        self.0.check_token(token)?;
        self.0.put_log.borrow_mut().push(range);

        let mut sessions = self.0.sessions.borrow_mut();
        let rec = sessions.get_mut(&session.0).ok_or_else(|| {
            tracerr::new!(StorageError::NotFound(session.0.clone()))
        })?;

        if let Some(failure) = self.0.chunk_failure.get() {
            if rec.chunks_received == failure.index
                && failure.times_left > 0
            {
                self.0.chunk_failure.set(if failure.times_left > 1 {
                    Some(ChunkFailure {
                        index: failure.index,
                        times_left: failure.times_left - 1,
                    })
                } else {
                    None
                });
                return Err(tracerr::new!(StorageError::Network(
                    String::from("injected chunk failure"),
                )));
            }
        }

        if range.start != rec.received {
            return Err(tracerr::new!(StorageError::Protocol(format!(
                "out-of-order chunk: expected offset {}, got {}",
                rec.received, range.start,
            ))));
        }
        let bytes = chunk.as_bytes();
        if bytes.len() as u64 != range.len() {
            return Err(tracerr::new!(StorageError::Protocol(format!(
                "range {} does not match the body of {} byte(s)",
                range.to_content_range(),
                bytes.len(),
            ))));
        }
        rec.data.extend_from_slice(bytes);
        rec.received = range.end;
        rec.chunks_received += 1;

        if rec.received < rec.total {
            return Ok(ChunkOutcome::InProgress);
        }

        let id = format!("file-{}", self.0.next_id());
        let file = RemoteFile {
            id: id.clone(),
            name: rec.name.clone(),
            view_url: Some(format!("mem://view/{}", id)),
            thumbnail_url: None,
        };
        log::debug!(
            "Assembled '{}' ({} bytes) in folder {}",
            rec.name,
            rec.data.len(),
            rec.folder,
        );
        drop(self.0.file_bytes.borrow_mut().insert(
            id.clone(),
            std::mem::take(&mut rec.data),
        ));
        drop(self.0.files.borrow_mut().insert(id, file.clone()));
        Ok(ChunkOutcome::Complete(file))
    }

    async fn get_file(
        &self,
        token: &str,
        id: &str,
    ) -> StorageResult<RemoteFile> {
        self.0.check_token(token)?;
        let mut files = self.0.files.borrow_mut();
        let file = files.get_mut(id).ok_or_else(|| {
            tracerr::new!(StorageError::NotFound(String::from(id)))
        })?;
        if file.thumbnail_url.is_none() {
            file.thumbnail_url = Some(format!("mem://thumb/{}", id));
        }
        Ok(file.clone())
    }

    async fn delete_file(&self, token: &str, id: &str) -> StorageResult<()> {
        self.0.check_token(token)?;
        drop(self.0.file_bytes.borrow_mut().remove(id));
        self.0.files.borrow_mut().remove(id).map(drop).ok_or_else(
            || tracerr::new!(StorageError::NotFound(String::from(id))),
        )
    }
}

/// [`AccessTokenProvider`] view of a [`MemoryBackend`].
struct MemoryAuth(Rc<BackendState>);

#[async_trait(?Send)]
impl AccessTokenProvider for MemoryAuth {
    async fn access_token(&self) -> StorageResult<String> {
        Ok(self.0.issued_token.borrow().clone())
    }

    async fn refresh(&self) -> StorageResult<String> {
        self.0.refresh_count.set(self.0.refresh_count.get() + 1);
        let valid = self.0.valid_token.borrow().clone();
        *self.0.issued_token.borrow_mut() = valid.clone();
        Ok(valid)
    }
}

/// [`RecordingRegistry`] view of a [`MemoryBackend`].
struct MemoryRegistry(Rc<BackendState>);

#[async_trait(?Send)]
impl RecordingRegistry for MemoryRegistry {
    async fn save_recording(
        &self,
        meta: RecordingMetadata,
    ) -> StorageResult<RecordId> {
        self.0.saved.borrow_mut().push(meta);
        Ok(RecordId(format!("record-{}", self.0.next_id())))
    }
}
