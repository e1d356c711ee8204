//! Guarded project operations.
//!
//! Projects carry no authorization state of their own: every check delegates
//! to the space guard through the project's owning `space_id`.

use spacedeck_auth::{AccessError, require_authenticated};
use spacedeck_core::{NewProject, Project, ProjectId, ProjectPatch, SpaceId, UserId};
use spacedeck_infra::MembershipStore;

use crate::resolver::{resolve_space_access, store_failure};

/// Create a project. Requires an ADMIN space membership on the target space.
pub async fn create_project<S>(
    store: &S,
    actor: Option<UserId>,
    space_id: SpaceId,
    new_project: NewProject,
) -> Result<Project, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    resolve_space_access(store, user_id, space_id, true).await?;
    store
        .create_project(space_id, new_project)
        .await
        .map_err(store_failure)
}

/// List a space's projects. Requires space membership.
pub async fn list_projects<S>(
    store: &S,
    actor: Option<UserId>,
    space_id: SpaceId,
) -> Result<Vec<Project>, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    resolve_space_access(store, user_id, space_id, false).await?;
    store.list_projects(space_id).await.map_err(store_failure)
}

/// Fetch one project, resolving access through its own space.
pub async fn get_project<S>(
    store: &S,
    actor: Option<UserId>,
    project_id: ProjectId,
) -> Result<Project, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    let project = store
        .get_project(project_id)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)?;
    resolve_space_access(store, user_id, project.space_id, false).await?;
    Ok(project)
}

/// Update a project. Requires an ADMIN space membership on its space.
pub async fn update_project<S>(
    store: &S,
    actor: Option<UserId>,
    project_id: ProjectId,
    patch: ProjectPatch,
) -> Result<Project, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    let project = store
        .get_project(project_id)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)?;
    resolve_space_access(store, user_id, project.space_id, true).await?;
    store
        .update_project(project_id, patch)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)
}

/// Delete a project. Requires an ADMIN space membership on its space.
pub async fn delete_project<S>(
    store: &S,
    actor: Option<UserId>,
    project_id: ProjectId,
) -> Result<(), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    let project = store
        .get_project(project_id)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)?;
    resolve_space_access(store, user_id, project.space_id, true).await?;
    if store
        .delete_project(project_id)
        .await
        .map_err(store_failure)?
    {
        Ok(())
    } else {
        Err(AccessError::NotFound)
    }
}
