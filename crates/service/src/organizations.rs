//! Guarded organization operations.

use spacedeck_auth::{AccessError, require_authenticated};
use spacedeck_core::{
    Member, NewOrganization, Organization, OrganizationId, OrganizationPatch, UserId,
};
use spacedeck_infra::MembershipStore;

use crate::guard::{require_org_admin, require_org_member};
use crate::resolver::store_failure;

/// Create an organization. Any authenticated user may do this; the creator
/// becomes the organization's first ADMIN member in the same write.
pub async fn create_organization<S>(
    store: &S,
    actor: Option<UserId>,
    new_organization: NewOrganization,
) -> Result<(Organization, Member), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    store
        .create_organization(new_organization, user_id)
        .await
        .map_err(store_failure)
}

/// List the organizations the caller belongs to, newest first.
///
/// A caller with no memberships gets an empty list, not an error.
pub async fn list_organizations<S>(
    store: &S,
    actor: Option<UserId>,
) -> Result<Vec<Organization>, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    store
        .list_organizations_for_user(user_id)
        .await
        .map_err(store_failure)
}

/// Fetch one organization. Requires membership.
pub async fn get_organization<S>(
    store: &S,
    actor: Option<UserId>,
    organization_id: OrganizationId,
) -> Result<Organization, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    let (organization, _) = require_org_member(store, user_id, organization_id).await?;
    Ok(organization)
}

/// Update an organization. Requires an ADMIN membership.
pub async fn update_organization<S>(
    store: &S,
    actor: Option<UserId>,
    organization_id: OrganizationId,
    patch: OrganizationPatch,
) -> Result<Organization, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    require_org_admin(store, user_id, organization_id).await?;
    store
        .update_organization(organization_id, patch)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)
}

/// Delete an organization, cascading to its spaces and projects. Requires an
/// ADMIN membership.
pub async fn delete_organization<S>(
    store: &S,
    actor: Option<UserId>,
    organization_id: OrganizationId,
) -> Result<(), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    require_org_admin(store, user_id, organization_id).await?;
    if store
        .delete_organization(organization_id)
        .await
        .map_err(store_failure)?
    {
        Ok(())
    } else {
        Err(AccessError::NotFound)
    }
}
