//! Find-or-create resolution of the remote folder hierarchy.

use std::rc::Rc;

use tracerr::Traced;

use crate::platform::storage::{
    AccessTokenProvider, ObjectStorage, RemoteFolder,
};

use super::{with_auth, Result};

/// Resolves the `<root>/<performance>/<rehearsal>` folder chain in the
/// remote storage, creating the missing levels.
///
/// Idempotent: every level is searched before being created, so repeated
/// calls with the same names resolve to the same folders and never
/// produce duplicates.
///
/// # Errors
///
/// With [`UploadError::Storage`] if a storage call fails.
///
/// [`UploadError::Storage`]: super::UploadError::Storage
pub async fn ensure_folder_structure(
    storage: &Rc<dyn ObjectStorage>,
    auth: &Rc<dyn AccessTokenProvider>,
    root: &str,
    performance: &str,
    rehearsal: &str,
) -> Result<RemoteFolder> {
    let root_folder = find_or_create(storage, auth, None, root).await?;
    let performance_folder =
        find_or_create(storage, auth, Some(&root_folder.id), performance)
            .await?;
    find_or_create(
        storage,
        auth,
        Some(&performance_folder.id),
        rehearsal,
    )
    .await
}

/// Returns the folder named `name` under `parent`, creating it only when
/// the search finds nothing.
async fn find_or_create(
    storage: &Rc<dyn ObjectStorage>,
    auth: &Rc<dyn AccessTokenProvider>,
    parent: Option<&str>,
    name: &str,
) -> Result<RemoteFolder> {
    let existing = {
        let storage = Rc::clone(storage);
        let parent = parent.map(String::from);
        let name = String::from(name);
        with_auth(auth, move |token| {
            let storage = Rc::clone(&storage);
            let parent = parent.clone();
            let name = name.clone();
            async move {
                storage.find_folder(&token, parent.as_deref(), &name).await
            }
        })
        .await?
    };
    if let Some(folder) = existing {
        log::debug!("Reusing remote folder '{}' ({})", name, folder.id);
        return Ok(folder);
    }

    log::debug!("Creating remote folder '{}'", name);
    let storage_cl = Rc::clone(storage);
    let parent = parent.map(String::from);
    let name = String::from(name);
    with_auth(auth, move |token| {
        let storage = Rc::clone(&storage_cl);
        let parent = parent.clone();
        let name = name.clone();
        async move {
            storage.create_folder(&token, parent.as_deref(), &name).await
        }
    })
    .await
}
