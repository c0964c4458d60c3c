//! `fetch`-based glue to the remote object storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracerr::Traced;
use url::Url;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::platform::storage::{
    ByteRange, ChunkOutcome, ObjectStorage, RemoteFile, RemoteFolder,
    StorageError, StorageResult, UploadSessionUrl,
};

use super::{blob::Blob, window};

/// Body of a folder creation request.
#[derive(Debug, Serialize)]
struct CreateFolderBody<'a> {
    parent: Option<&'a str>,
    name: &'a str,
}

/// Body of an upload initiation request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiateUploadBody<'a> {
    folder_id: &'a str,
    name: &'a str,
    size: u64,
    mime_type: &'a str,
}

/// Answer of an upload initiation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateUploadAnswer {
    upload_url: String,
}

/// [`ObjectStorage`] talking to the storage gateway over `fetch`.
pub struct FetchObjectStorage {
    base: Url,
}

impl FetchObjectStorage {
    /// Creates a new [`FetchObjectStorage`] rooted at the given base URL.
    ///
    /// # Errors
    ///
    /// With [`StorageError::Protocol`] if the URL cannot be parsed.
    pub fn new(base_url: &str) -> StorageResult<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            tracerr::new!(StorageError::Protocol(format!(
                "invalid storage base URL: {}",
                e,
            )))
        })?;
        Ok(Self { base })
    }

    /// Joins the given `path` onto the base URL.
    fn endpoint(&self, path: &str) -> StorageResult<Url> {
        self.base.join(path).map_err(|e| {
            tracerr::new!(StorageError::Protocol(format!(
                "invalid storage endpoint '{}': {}",
                path, e,
            )))
        })
    }

    /// Performs one `fetch` call, classifying transport and status
    /// failures.
    async fn request(
        &self,
        method: &str,
        url: &str,
        token: &str,
        content_range: Option<String>,
        body: Option<&JsValue>,
    ) -> StorageResult<web_sys::Response> {
        let headers = web_sys::Headers::new()
            .map_err(|_| js_failure("Headers are not constructible"))?;
        headers
            .set("Authorization", &format!("Bearer {}", token))
            .map_err(|_| js_failure("failed to set Authorization"))?;
        if let Some(range) = content_range {
            headers
                .set("Content-Range", &range)
                .map_err(|_| js_failure("failed to set Content-Range"))?;
        }

        let mut init = web_sys::RequestInit::new();
        init.method(method);
        init.headers(headers.as_ref());
        if let Some(body) = body {
            init.body(Some(body));
        }

        let request = web_sys::Request::new_with_str_and_init(url, &init)
            .map_err(|_| js_failure("failed to build a request"))?;

        let response =
            JsFuture::from(window().fetch_with_request(&request))
                .await
                .map_err(|e| {
                    tracerr::new!(StorageError::Network(
                        super::Error::from(e).to_string(),
                    ))
                })?;
        let response = web_sys::Response::from(response);

        match response.status() {
            200..=299 | 308 => Ok(response),
            401 | 403 => Err(tracerr::new!(StorageError::Auth(format!(
                "storage answered HTTP {}",
                response.status(),
            )))),
            404 => Err(tracerr::new!(StorageError::NotFound(
                String::from(url),
            ))),
            status => Err(tracerr::new!(StorageError::Network(format!(
                "storage answered HTTP {}",
                status,
            )))),
        }
    }

    /// Parses the JSON body of the given `response`.
    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: &web_sys::Response,
    ) -> StorageResult<T> {
        let json = JsFuture::from(
            response
                .json()
                .map_err(|_| js_failure("response body is not JSON"))?,
        )
        .await
        .map_err(|_| js_failure("failed to read the response body"))?;
        json.into_serde().map_err(|e| {
            tracerr::new!(StorageError::Protocol(format!(
                "unexpected response shape: {}",
                e,
            )))
        })
    }
}

/// Shorthand for a [`StorageError::Protocol`] born on the JS side.
fn js_failure(message: &str) -> Traced<StorageError> {
    tracerr::new!(StorageError::Protocol(String::from(message)))
}

#[async_trait(?Send)]
impl ObjectStorage for FetchObjectStorage {
    async fn find_folder(
        &self,
        token: &str,
        parent: Option<&str>,
        name: &str,
    ) -> StorageResult<Option<RemoteFolder>> {
        let mut url = self.endpoint("folders")?;
        url.query_pairs_mut()
            .append_pair("parent", parent.unwrap_or("root"))
            .append_pair("name", name);

        let response = match self
            .request("GET", url.as_str(), token, None, None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if matches!(e.as_ref(), StorageError::NotFound(_)) {
                    return Ok(None);
                }
                return Err(e);
            }
        };
        let folders: Vec<RemoteFolder> =
            Self::parse_json(&response).await?;
        Ok(folders.into_iter().next())
    }

    async fn create_folder(
        &self,
        token: &str,
        parent: Option<&str>,
        name: &str,
    ) -> StorageResult<RemoteFolder> {
        let url = self.endpoint("folders")?;
        let body = JsValue::from_serde(&CreateFolderBody { parent, name })
            .map_err(|e| {
                tracerr::new!(StorageError::Protocol(e.to_string()))
            })?;

        let response = self
            .request("POST", url.as_str(), token, None, Some(&body))
            .await?;
        Self::parse_json(&response).await
    }

    async fn initiate_upload(
        &self,
        token: &str,
        folder: &str,
        file_name: &str,
        size: u64,
        mime_type: &str,
    ) -> StorageResult<UploadSessionUrl> {
        let url = self.endpoint("uploads")?;
        let body = JsValue::from_serde(&InitiateUploadBody {
            folder_id: folder,
            name: file_name,
            size,
            mime_type,
        })
        .map_err(|e| {
            tracerr::new!(StorageError::Protocol(e.to_string()))
        })?;

        let response = self
            .request("POST", url.as_str(), token, None, Some(&body))
            .await?;
        let answer: InitiateUploadAnswer =
            Self::parse_json(&response).await?;
        Ok(UploadSessionUrl(answer.upload_url))
    }

    async fn put_chunk(
        &self,
        token: &str,
        session: &UploadSessionUrl,
        range: ByteRange,
        chunk: Blob,
    ) -> StorageResult<ChunkOutcome> {
        let response = self
            .request(
                "PUT",
                &session.0,
                token,
                Some(range.to_content_range()),
                Some(&chunk.to_js()),
            )
            .await?;

        if response.status() == 308 {
            Ok(ChunkOutcome::InProgress)
        } else {
            let file: RemoteFile = Self::parse_json(&response).await?;
            Ok(ChunkOutcome::Complete(file))
        }
    }

    async fn get_file(
        &self,
        token: &str,
        id: &str,
    ) -> StorageResult<RemoteFile> {
        let url = self.endpoint(&format!("files/{}", id))?;
        let response = self
            .request("GET", url.as_str(), token, None, None)
            .await?;
        Self::parse_json(&response).await
    }

    async fn delete_file(&self, token: &str, id: &str) -> StorageResult<()> {
        let url = self.endpoint(&format!("files/{}", id))?;
        drop(
            self.request("DELETE", url.as_str(), token, None, None)
                .await?,
        );
        Ok(())
    }
}

/// Access token provider delegating to a JS callback returning a
/// `Promise<string>`.
///
/// The refresh protocol lives entirely in the embedder: the callback
/// receives `true` when a forced refresh is requested.
pub struct CallbackTokenProvider {
    callback: js_sys::Function,
}

impl CallbackTokenProvider {
    /// Creates a new [`CallbackTokenProvider`] over the given JS
    /// `callback`.
    #[must_use]
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }

    async fn invoke(&self, force_refresh: bool) -> StorageResult<String> {
        let promise = self
            .callback
            .call1(&JsValue::NULL, &JsValue::from_bool(force_refresh))
            .map_err(|e| auth_failure(&e))?;
        let token =
            JsFuture::from(js_sys::Promise::resolve(&promise))
                .await
                .map_err(|e| auth_failure(&e))?;
        token.as_string().ok_or_else(|| {
            tracerr::new!(StorageError::Auth(String::from(
                "token callback resolved to a non-string",
            )))
        })
    }
}

/// Shorthand for a [`StorageError::Auth`] born on the JS side.
fn auth_failure(cause: &JsValue) -> Traced<StorageError> {
    tracerr::new!(StorageError::Auth(
        super::Error::from(cause.clone()).to_string(),
    ))
}

#[async_trait(?Send)]
impl crate::platform::storage::AccessTokenProvider
    for CallbackTokenProvider
{
    async fn access_token(&self) -> StorageResult<String> {
        self.invoke(false).await
    }

    async fn refresh(&self) -> StorageResult<String> {
        self.invoke(true).await
    }
}

/// Recording registry delegating to a JS callback receiving the metadata
/// record as JSON and returning a `Promise<string>` of the persisted
/// record id.
pub struct CallbackRecordingRegistry {
    callback: js_sys::Function,
}

impl CallbackRecordingRegistry {
    /// Creates a new [`CallbackRecordingRegistry`] over the given JS
    /// `callback`.
    #[must_use]
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }
}

#[async_trait(?Send)]
impl crate::platform::storage::RecordingRegistry
    for CallbackRecordingRegistry
{
    async fn save_recording(
        &self,
        meta: crate::platform::storage::RecordingMetadata,
    ) -> StorageResult<crate::platform::storage::RecordId> {
        let json = serde_json::to_string(&meta).map_err(|e| {
            tracerr::new!(StorageError::Protocol(e.to_string()))
        })?;
        let promise = self
            .callback
            .call1(&JsValue::NULL, &JsValue::from_str(&json))
            .map_err(|e| {
                tracerr::new!(StorageError::Network(
                    super::Error::from(e).to_string(),
                ))
            })?;
        let id = JsFuture::from(js_sys::Promise::resolve(&promise))
            .await
            .map_err(|e| {
                tracerr::new!(StorageError::Network(
                    super::Error::from(e).to_string(),
                ))
            })?;
        let id = id.as_string().ok_or_else(|| {
            tracerr::new!(StorageError::Protocol(String::from(
                "registry callback resolved to a non-string",
            )))
        })?;
        Ok(crate::platform::storage::RecordId(id))
    }
}
