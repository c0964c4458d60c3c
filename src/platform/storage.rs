//! Contracts of the remote collaborators consumed by the upload pipeline.
//!
//! The remote object storage, the auth/session collaborator and the
//! application data store are external services: this module only fixes
//! their shapes. The `wasm32` platform ships `fetch`-based glue for the
//! object storage; the other two are supplied by the embedder.

use async_trait::async_trait;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tracerr::Traced;

use crate::platform::Blob;

/// File stored in the remote object storage.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Unique identifier of the file.
    pub id: String,

    /// Name of the file.
    pub name: String,

    /// URL to view the file at.
    #[serde(default)]
    pub view_url: Option<String>,

    /// URL of the file's thumbnail.
    ///
    /// Generated by the storage asynchronously, so may be absent right
    /// after the transfer completes.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Folder in the remote object storage.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RemoteFolder {
    /// Unique identifier of the folder.
    pub id: String,

    /// Name of the folder.
    pub name: String,
}

/// URL of a resumable upload session opened in the remote storage.
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
pub struct UploadSessionUrl(pub String);

/// Byte range of a single chunk of a resumable transfer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange {
    /// Offset of the first byte of the chunk.
    pub start: u64,

    /// Offset right after the last byte of the chunk.
    pub end: u64,

    /// Total size of the transferred file.
    pub total: u64,
}

impl ByteRange {
    /// Returns the length of this range in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Indicates whether this range is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Renders this range as a `Content-Range` HTTP header value.
    #[must_use]
    pub fn to_content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end - 1, self.total)
    }
}

/// Outcome of a single chunk transfer reported by the storage.
#[derive(Clone, Debug)]
pub enum ChunkOutcome {
    /// Storage expects more chunks.
    InProgress,

    /// The last chunk was acknowledged and the file is assembled.
    Complete(RemoteFile),
}

/// Metadata record of a finished recording, persisted to the application
/// data store.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordingMetadata {
    /// Title of the recording given by the user.
    pub title: String,

    /// Free-form tags of the recording.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Duration of the recording in seconds.
    pub duration_secs: u64,

    /// Reference to the uploaded file.
    ///
    /// Filled by the upload pipeline before saving.
    #[serde(default)]
    pub file: Option<RemoteFile>,
}

/// Identifier of a persisted recording metadata record.
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
pub struct RecordId(pub String);

/// Errors occurring when talking to a remote collaborator.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum StorageError {
    /// The call was rejected for the lack of a valid access token.
    #[display(fmt = "authorization rejected: {}", _0)]
    Auth(String),

    /// Transport-level failure.
    #[display(fmt = "network failure: {}", _0)]
    Network(String),

    /// The service answered with something the client cannot interpret.
    #[display(fmt = "malformed service response: {}", _0)]
    Protocol(String),

    /// The referenced entity does not exist.
    #[display(fmt = "not found: {}", _0)]
    NotFound(String),
}

/// Result of a remote collaborator call.
pub type StorageResult<T> = Result<T, Traced<StorageError>>;

/// Remote object storage, consumed as plain HTTP calls with a bearer
/// token.
#[cfg_attr(feature = "mockable", mockall::automock)]
#[async_trait(?Send)]
pub trait ObjectStorage {
    /// Searches for a folder with the given `name` under the `parent`
    /// folder (a root-level folder when `parent` is [`None`]).
    async fn find_folder(
        &self,
        token: &str,
        parent: Option<&str>,
        name: &str,
    ) -> StorageResult<Option<RemoteFolder>>;

    /// Creates a folder with the given `name` under the `parent` folder.
    async fn create_folder(
        &self,
        token: &str,
        parent: Option<&str>,
        name: &str,
    ) -> StorageResult<RemoteFolder>;

    /// Opens a resumable upload session for a file in the given folder.
    async fn initiate_upload(
        &self,
        token: &str,
        folder: &str,
        file_name: &str,
        size: u64,
        mime_type: &str,
    ) -> StorageResult<UploadSessionUrl>;

    /// Transfers one byte-ranged chunk into the given upload session.
    async fn put_chunk(
        &self,
        token: &str,
        session: &UploadSessionUrl,
        range: ByteRange,
        chunk: Blob,
    ) -> StorageResult<ChunkOutcome>;

    /// Fetches metadata of the file with the given `id`.
    async fn get_file(&self, token: &str, id: &str) -> StorageResult<RemoteFile>;

    /// Deletes the file with the given `id`.
    async fn delete_file(&self, token: &str, id: &str) -> StorageResult<()>;
}

/// Auth/session collaborator supplying bearer access tokens.
///
/// The refresh protocol itself is out of this crate's hands: the pipeline
/// only re-requests a token when a call fails for the lack of one.
#[cfg_attr(feature = "mockable", mockall::automock)]
#[async_trait(?Send)]
pub trait AccessTokenProvider {
    /// Returns the current access token.
    async fn access_token(&self) -> StorageResult<String>;

    /// Forces a token refresh and returns the new token.
    async fn refresh(&self) -> StorageResult<String>;
}

/// Application data store persisting recording metadata records.
#[cfg_attr(feature = "mockable", mockall::automock)]
#[async_trait(?Send)]
pub trait RecordingRegistry {
    /// Persists the given recording metadata record.
    async fn save_recording(
        &self,
        meta: RecordingMetadata,
    ) -> StorageResult<RecordId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_is_inclusive() {
        let range = ByteRange {
            start: 0,
            end: 5 * 1024 * 1024,
            total: 12 * 1024 * 1024,
        };

        assert_eq!(range.len(), 5 * 1024 * 1024);
        assert_eq!(range.to_content_range(), "bytes 0-5242879/12582912");
    }

    #[test]
    fn remote_file_parses_camel_case() {
        let file: RemoteFile = serde_json::from_str(
            r#"{"id": "f1", "name": "take-1.webm",
                "viewUrl": "https://storage/view/f1"}"#,
        )
        .unwrap();

        assert_eq!(file.id, "f1");
        assert_eq!(file.view_url.as_deref(), Some("https://storage/view/f1"));
        assert_eq!(file.thumbnail_url, None);
    }
}
