//! Camera permission store of the browser adapter.
//!
//! Backed by the [Permissions API][1] where available; its absence is
//! not an error, the state just stays unknown.
//!
//! [1]: https://w3.org/TR/permissions

use std::rc::Rc;

use tracerr::Traced;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::media::PermissionState;

use super::{error::Error, utils::EventListener, window};

/// Subscription to camera permission changes.
///
/// Dropping it removes the underlying `change` listener.
pub struct PermissionSubscription {
    _listener: EventListener<web_sys::PermissionStatus, web_sys::Event>,
}

fn convert(state: web_sys::PermissionState) -> PermissionState {
    match state {
        web_sys::PermissionState::Granted => PermissionState::Granted,
        web_sys::PermissionState::Denied => PermissionState::Denied,
        web_sys::PermissionState::Prompt => PermissionState::Prompt,
        _ => PermissionState::Unknown,
    }
}

/// Queries the current camera permission state and subscribes the given
/// `on_change` callback to its future transitions.
///
/// # Errors
///
/// Never: a missing or refusing Permissions API degrades to
/// [`PermissionState::Unknown`] without a subscription. The [`Result`]
/// in the signature is shared with platforms where the query can fail
/// for other reasons.
pub async fn query_permission(
    on_change: Rc<dyn Fn(PermissionState)>,
) -> Result<(PermissionState, Option<PermissionSubscription>), Traced<Error>>
{
    let permissions = window().navigator().permissions();
    let permissions = match permissions {
        Ok(permissions) => permissions,
        Err(_) => return Ok((PermissionState::Unknown, None)),
    };

    let descriptor = js_sys::Object::new();
    drop(js_sys::Reflect::set(
        &descriptor,
        &JsValue::from_str("name"),
        &JsValue::from_str("camera"),
    ));

    let status = match permissions.query(&descriptor) {
        Ok(promise) => match JsFuture::from(promise).await {
            Ok(status) => web_sys::PermissionStatus::from(status),
            Err(e) => {
                log::debug!(
                    "Permissions API refused the camera query: {}",
                    Error::from(e),
                );
                return Ok((PermissionState::Unknown, None));
            }
        },
        Err(_) => return Ok((PermissionState::Unknown, None)),
    };

    let state = convert(status.state());
    let status = Rc::new(status);

    let watched = Rc::clone(&status);
    let subscription = EventListener::new_mut(
        Rc::clone(&status),
        "change",
        move |_: web_sys::Event| {
            on_change(convert(watched.state()));
        },
    )
    .map(|listener| PermissionSubscription {
        _listener: listener,
    });
    match subscription {
        Ok(subscription) => Ok((state, Some(subscription))),
        Err(e) => {
            log::warn!(
                "Failed to subscribe to permission changes: {}",
                e.as_ref(),
            );
            Ok((state, None))
        }
    }
}
