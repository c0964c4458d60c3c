//! Acquiring and owning capture streams.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use futures::StreamExt as _;
use tracerr::Traced;

use crate::{conf, platform, utils::HandlerDetachedError};

use super::{
    capability::{self, InputDeviceInfo},
    ladder::{self, AcquireError, AcquireSource},
    permission::PermissionTracker,
    stream::StreamHandle,
};

/// Parameters of the last requested acquisition, kept for automatic
/// retries.
#[derive(Clone, Debug)]
struct AcquireRequest {
    source: AcquireSource,
    preferred_device: Option<String>,
}

/// Actual data of a [`MediaManager`].
struct InnerMediaManager {
    /// Acquisition settings.
    conf: conf::Acquire,

    /// Tracker of the camera permission state.
    permission: Rc<PermissionTracker>,

    /// The at-most-one live capture stream owned by this manager.
    stream: RefCell<Option<Rc<StreamHandle>>>,

    /// Last requested acquisition, retried automatically when the
    /// permission is granted via the browser chrome.
    last_request: RefCell<Option<AcquireRequest>>,

    /// Hook invoked with every newly acquired stream.
    on_stream: RefCell<Option<Box<dyn Fn(Rc<StreamHandle>)>>>,

    /// Hook invoked when an automatic re-acquisition fails.
    on_failure: RefCell<Option<Box<dyn Fn(Traced<AcquireError>)>>>,
}

impl InnerMediaManager {
    /// Acquires a capture stream via the strategy ladder.
    ///
    /// Stops and releases the previously owned stream (if any) before
    /// issuing any platform request: the hardware handle is exclusive.
    async fn acquire(
        &self,
        source: AcquireSource,
        preferred_device: Option<String>,
    ) -> Result<Rc<StreamHandle>, Traced<AcquireError>> {
        let report = capability::check_compatibility();
        if let Some(defect) = report.blocking_defect() {
            return Err(tracerr::new!(defect));
        }

        if let Some(previous) = self.stream.borrow_mut().take() {
            previous.stop();
        }

        *self.last_request.borrow_mut() = Some(AcquireRequest {
            source,
            preferred_device: preferred_device.clone(),
        });

        let strategies = match source {
            AcquireSource::Camera => ladder::camera_ladder(
                &self.conf,
                preferred_device.as_deref(),
            ),
            AcquireSource::Screen => ladder::screen_ladder(),
        };

        let stream = Rc::new(
            ladder::run_ladder(&strategies, self.conf.attempt_timeout)
                .await
                .map_err(tracerr::wrap!())?,
        );
        *self.stream.borrow_mut() = Some(Rc::clone(&stream));

        if let Some(hook) = self.on_stream.borrow().as_ref() {
            hook(Rc::clone(&stream));
        }
        Ok(stream)
    }

    /// Stops and releases the owned stream, if any.
    fn release(&self) {
        if let Some(stream) = self.stream.borrow_mut().take() {
            stream.stop();
        }
    }

    /// Re-runs the last requested acquisition after the permission was
    /// granted via the browser chrome.
    ///
    /// No-op while a live stream is owned: an established capture is not
    /// torn down by a permission event.
    async fn reacquire_on_grant(&self) {
        let request = match self.last_request.borrow().clone() {
            Some(request) => request,
            None => return,
        };
        if self.stream.borrow().is_some() {
            return;
        }

        log::info!(
            "Camera permission granted externally: retrying acquisition",
        );
        if let Err(e) =
            self.acquire(request.source, request.preferred_device).await
        {
            log::warn!("Automatic re-acquisition failed: {}", e.as_ref());
            if let Some(hook) = self.on_failure.borrow().as_ref() {
                hook(e);
            }
        }
    }
}

/// Manager responsible for acquiring and owning capture streams.
///
/// There is at most one live [`StreamHandle`] per manager at any moment:
/// acquiring a new stream stops the previous one first.
pub struct MediaManager(Rc<InnerMediaManager>);

impl MediaManager {
    /// Creates a new [`MediaManager`] with the given acquisition
    /// settings, spawning the permission watcher.
    #[must_use]
    pub fn new(conf: conf::Acquire) -> Self {
        let permission = PermissionTracker::new();
        let inner = Rc::new(InnerMediaManager {
            conf,
            permission: Rc::clone(&permission),
            stream: RefCell::new(None),
            last_request: RefCell::new(None),
            on_stream: RefCell::new(None),
            on_failure: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let mut regrants = permission.on_regrant();
        platform::spawn(async move {
            while regrants.next().await.is_some() {
                match weak.upgrade() {
                    Some(inner) => inner.reacquire_on_grant().await,
                    None => break,
                }
            }
        });

        Self(inner)
    }

    /// Acquires a capture stream from the given `source` via the
    /// strategy ladder, releasing the previously owned stream first.
    ///
    /// # Errors
    ///
    /// With [`AcquireError`] of the most significant failure when every
    /// ladder tier fails, or with the blocking environment defect.
    pub async fn acquire(
        &self,
        source: AcquireSource,
        preferred_device: Option<String>,
    ) -> Result<Rc<StreamHandle>, Traced<AcquireError>> {
        self.0
            .acquire(source, preferred_device)
            .await
            .map_err(tracerr::wrap!())
    }

    /// Re-acquires the camera pinned to the given device.
    ///
    /// # Errors
    ///
    /// Same as [`MediaManager::acquire()`].
    pub async fn switch_camera(
        &self,
        device_id: String,
    ) -> Result<Rc<StreamHandle>, Traced<AcquireError>> {
        self.0
            .acquire(AcquireSource::Camera, Some(device_id))
            .await
            .map_err(tracerr::wrap!())
    }

    /// Enumerates connected video input devices, failing soft to an
    /// empty list.
    pub async fn enumerate_devices(&self) -> Vec<InputDeviceInfo> {
        capability::enumerate_devices().await
    }

    /// Stops and releases the owned stream, if any.
    pub fn release(&self) {
        self.0.release();
    }

    /// Returns the currently owned live stream, if any.
    #[must_use]
    pub fn current_stream(&self) -> Option<Rc<StreamHandle>> {
        self.0.stream.borrow().clone()
    }

    /// Returns the tracker of the camera permission state.
    #[must_use]
    pub fn permission(&self) -> Rc<PermissionTracker> {
        Rc::clone(&self.0.permission)
    }

    /// Sets the hook invoked with every newly acquired stream (including
    /// the automatically re-acquired ones).
    pub fn on_stream<F: Fn(Rc<StreamHandle>) + 'static>(&self, hook: F) {
        *self.0.on_stream.borrow_mut() = Some(Box::new(hook));
    }

    /// Sets the hook invoked when an automatic re-acquisition fails.
    pub fn on_failure<F: Fn(Traced<AcquireError>) + 'static>(&self, hook: F) {
        *self.0.on_failure.borrow_mut() = Some(Box::new(hook));
    }

    /// Instantiates a new [`MediaManagerHandle`] for external use.
    #[must_use]
    pub fn new_handle(&self) -> MediaManagerHandle {
        MediaManagerHandle(Rc::downgrade(&self.0))
    }
}

/// Weak reference to a [`MediaManager`].
///
/// Its methods fail with [`HandlerDetachedError`] once the manager is
/// dropped.
#[derive(Clone)]
pub struct MediaManagerHandle(Weak<InnerMediaManager>);

impl MediaManagerHandle {
    /// Enumerates connected video input devices, failing soft to an
    /// empty list.
    ///
    /// # Errors
    ///
    /// With [`HandlerDetachedError`] if the manager was dropped.
    pub async fn enumerate_devices(
        &self,
    ) -> Result<Vec<InputDeviceInfo>, Traced<HandlerDetachedError>> {
        drop(upgrade_or_detached!(self.0)?);
        Ok(capability::enumerate_devices().await)
    }

    /// Re-acquires the camera pinned to the given device.
    ///
    /// # Errors
    ///
    /// With [`AcquireError`] if the acquisition fails, or
    /// [`HandlerDetachedError`] if the manager was dropped.
    pub async fn switch_camera(
        &self,
        device_id: String,
    ) -> Result<Rc<StreamHandle>, Traced<AcquireError>> {
        let inner = upgrade_or_detached!(self.0).map_err(|_| {
            tracerr::new!(AcquireError::UnsupportedPlatform(String::from(
                "media manager was disposed",
            )))
        })?;
        inner
            .acquire(AcquireSource::Camera, Some(device_id))
            .await
            .map_err(tracerr::wrap!())
    }

    /// Returns the current camera permission state.
    ///
    /// # Errors
    ///
    /// With [`HandlerDetachedError`] if the manager was dropped.
    pub fn permission_state(
        &self,
    ) -> Result<super::PermissionState, Traced<HandlerDetachedError>> {
        Ok(upgrade_or_detached!(self.0)?.permission.state())
    }

    /// Indicates whether the camera permission is permanently denied.
    ///
    /// # Errors
    ///
    /// With [`HandlerDetachedError`] if the manager was dropped.
    pub fn is_permanently_denied(
        &self,
    ) -> Result<bool, Traced<HandlerDetachedError>> {
        Ok(upgrade_or_detached!(self.0)?.permission.is_permanently_denied())
    }
}
