//! General library interface.

use std::{cell::RefCell, rc::Rc};

use wasm_bindgen::prelude::*;

use crate::{
    conf::Conf,
    media::{self, MediaManager},
    platform::{
        self,
        http::{
            CallbackRecordingRegistry, CallbackTokenProvider,
            FetchObjectStorage,
        },
    },
    recorder::RecordingSession,
    upload::Uploader,
};

use super::{
    error::StagehandError, media_manager_handle::MediaManagerHandle,
    recorder_handle::RecorderHandle, uploader_handle::UploaderHandle,
};

struct Inner {
    conf: Conf,
    manager: Rc<MediaManager>,
    session: RecordingSession,
    uploader: RefCell<Option<Rc<Uploader>>>,
}

/// General library interface.
///
/// Responsible for the internal state of the media manager, the
/// recording session and the upload pipeline.
#[wasm_bindgen]
pub struct Stagehand(Rc<Inner>);

#[wasm_bindgen]
impl Stagehand {
    /// Instantiates a new [`Stagehand`] interface with the default
    /// configuration.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        Self::create(Conf::default())
    }

    /// Instantiates a new [`Stagehand`] interface, layering the given
    /// configuration JSON over the defaults.
    ///
    /// # Errors
    ///
    /// If the given string is not a valid configuration JSON.
    pub fn with_config(config_json: &str) -> Result<Stagehand, JsValue> {
        let conf = Conf::from_json(config_json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::create(conf))
    }

    /// Synchronously inspects the host environment, returning the
    /// compatibility report as a JS object.
    ///
    /// Must be consulted before any acquisition attempt: a report with a
    /// blocking defect (insecure context, missing media APIs) means the
    /// whole subsystem is unavailable.
    #[must_use]
    pub fn check_compatibility(&self) -> JsValue {
        JsValue::from_serde(&media::check_compatibility())
            .unwrap_or(JsValue::NULL)
    }

    /// Returns a [`MediaManagerHandle`] for device enumeration, camera
    /// switching and permission state.
    #[must_use]
    pub fn media_manager(&self) -> MediaManagerHandle {
        MediaManagerHandle::from(self.0.manager.new_handle())
    }

    /// Returns a [`RecorderHandle`] driving the recording session.
    #[must_use]
    pub fn recorder(&self) -> RecorderHandle {
        RecorderHandle::from(self.0.session.clone())
    }

    /// Wires the upload pipeline to the storage gateway at the given
    /// base URL.
    ///
    /// `token_provider` is invoked as `(forceRefresh: boolean) =>
    /// Promise<string>`; `recording_registry` as `(metadataJson:
    /// string) => Promise<string>` resolving to the persisted record
    /// id.
    ///
    /// # Errors
    ///
    /// If the base URL cannot be parsed.
    pub fn init_uploader(
        &self,
        storage_base_url: &str,
        token_provider: js_sys::Function,
        recording_registry: js_sys::Function,
    ) -> Result<UploaderHandle, JsValue> {
        let storage = FetchObjectStorage::new(storage_base_url)
            .map_err(StagehandError::from)
            .map_err(JsValue::from)?;
        let uploader = Rc::new(Uploader::new(
            self.0.conf.upload.clone(),
            Rc::new(storage),
            Rc::new(CallbackTokenProvider::new(token_provider)),
            Rc::new(CallbackRecordingRegistry::new(recording_registry)),
        ));
        *self.0.uploader.borrow_mut() = Some(Rc::clone(&uploader));
        Ok(UploaderHandle::from(uploader))
    }

    /// Subscribes the given `callback` to every newly acquired local
    /// stream, including the automatic re-acquisition after the camera
    /// permission is granted via the browser chrome.
    pub fn on_local_stream(&self, callback: js_sys::Function) {
        let func = platform::Function::<()>::from(callback);
        self.0.manager.on_stream(move |_| func.call0());
    }

    /// Subscribes the given `callback` to failures of the automatic
    /// re-acquisition.
    pub fn on_acquire_failure(&self, callback: js_sys::Function) {
        let func = platform::Function::<StagehandError>::from(callback);
        self.0.manager.on_failure(move |e| {
            func.call1(StagehandError::from(e));
        });
    }

    /// Drops the interface, releasing the camera and every handle.
    pub fn dispose(self) {
        self.0.manager.release();
    }
}

impl Stagehand {
    /// Instantiates the interface over the given configuration.
    fn create(conf: Conf) -> Self {
        platform::set_panic_hook();
        platform::init_logger();

        let manager = Rc::new(MediaManager::new(conf.acquire.clone()));
        let session =
            RecordingSession::new(conf.recorder.clone(), Rc::clone(&manager));
        Self(Rc::new(Inner {
            conf,
            manager,
            session,
            uploader: RefCell::new(None),
        }))
    }
}

impl Default for Stagehand {
    fn default() -> Self {
        Self::new()
    }
}
