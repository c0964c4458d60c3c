//! Camera permission store of the native adapter.

use std::rc::{Rc, Weak};

use tracerr::Traced;

use crate::media::PermissionState;

use super::{
    error::Error,
    rig::{self, RigState},
};

/// Subscription to camera permission changes.
///
/// Dropping it unsubscribes the underlying watcher.
pub struct PermissionSubscription {
    id: u64,
    rig: Weak<RigState>,
}

impl Drop for PermissionSubscription {
    fn drop(&mut self) {
        if let Some(rig) = self.rig.upgrade() {
            rig.unwatch_permission(self.id);
        }
    }
}

/// Queries the current camera permission state and subscribes the given
/// `on_change` callback to its future transitions.
///
/// # Errors
///
/// Never on this platform; the signature matches the browser adapter,
/// where the permissions query may reject.
pub async fn query_permission(
    on_change: Rc<dyn Fn(PermissionState)>,
) -> Result<(PermissionState, Option<PermissionSubscription>), Traced<Error>>
{
    let rig = rig::current();
    let id = rig.watch_permission(on_change);
    Ok((
        rig.permission(),
        Some(PermissionSubscription {
            id,
            rig: Rc::downgrade(&rig),
        }),
    ))
}
