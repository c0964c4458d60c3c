//! Tracking of the camera permission state.

use std::{cell::RefCell, rc::Rc};

use derive_more::Display;
use futures::{future, stream::LocalBoxStream, StreamExt as _};
use medea_reactive::ObservableCell;

use crate::platform;

/// State of the camera permission, as reported by the platform.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PermissionState {
    /// The platform cannot report permission state (no Permissions API).
    Unknown,

    /// The user was not asked yet, or dismissed the prompt without an
    /// explicit decision.
    Prompt,

    /// Access granted.
    Granted,

    /// Access explicitly denied. Recovering requires the user to change
    /// the browser settings.
    Denied,
}

/// Tracker of the camera permission state.
///
/// Holds the latest reported state in an [`ObservableCell`] and keeps the
/// platform subscription alive, so grants performed via the browser
/// chrome (without reloading the page) are observed.
pub struct PermissionTracker {
    state: Rc<ObservableCell<PermissionState>>,
    subscription: RefCell<Option<platform::PermissionSubscription>>,
}

impl PermissionTracker {
    /// Creates a new [`PermissionTracker`] and spawns its platform query.
    ///
    /// The state is [`PermissionState::Unknown`] until the query settles;
    /// platforms without the Permissions API stay that way, which is not
    /// an error.
    #[must_use]
    pub fn new() -> Rc<Self> {
        let tracker = Rc::new(Self {
            state: Rc::new(ObservableCell::new(PermissionState::Unknown)),
            subscription: RefCell::new(None),
        });

        let this = Rc::clone(&tracker);
        platform::spawn(async move {
            let cell = Rc::clone(&this.state);
            let on_change: Rc<dyn Fn(PermissionState)> =
                Rc::new(move |state| {
                    log::debug!("Camera permission changed to {}", state);
                    cell.set(state);
                });
            match platform::query_permission(on_change).await {
                Ok((initial, subscription)) => {
                    this.state.set(initial);
                    *this.subscription.borrow_mut() = subscription;
                }
                Err(e) => {
                    log::warn!("Camera permission query failed: {}", e);
                }
            }
        });

        tracker
    }

    /// Returns the latest reported [`PermissionState`].
    #[inline]
    #[must_use]
    pub fn state(&self) -> PermissionState {
        self.state.get()
    }

    /// Indicates whether the permission is permanently denied.
    ///
    /// `true` only when the platform explicitly reported
    /// [`PermissionState::Denied`]: a dismissed prompt is not permanent.
    #[inline]
    #[must_use]
    pub fn is_permanently_denied(&self) -> bool {
        self.state.get() == PermissionState::Denied
    }

    /// Returns a [`LocalBoxStream`] of all the permission state updates.
    ///
    /// The current state is emitted first.
    #[must_use]
    pub fn observe(&self) -> LocalBoxStream<'static, PermissionState> {
        self.state.subscribe()
    }

    /// Returns a [`LocalBoxStream`] firing on every transition from
    /// [`PermissionState::Prompt`] or [`PermissionState::Denied`] into
    /// [`PermissionState::Granted`].
    #[must_use]
    pub fn on_regrant(&self) -> LocalBoxStream<'static, ()> {
        let mut previous: Option<PermissionState> = None;
        self.state
            .subscribe()
            .filter_map(move |state| {
                let fires = matches!(
                    previous,
                    Some(PermissionState::Prompt)
                        | Some(PermissionState::Denied)
                ) && state == PermissionState::Granted;
                previous = Some(state);
                future::ready(if fires { Some(()) } else { None })
            })
            .boxed_local()
    }
}
