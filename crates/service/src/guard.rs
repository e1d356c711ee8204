//! Organization-scope guards.
//!
//! Space- and project-scope checks go through the resolver; organization
//! reads/writes only need the organization row and the caller's membership.

use spacedeck_auth::{AccessError, DENIED_ADMIN_REQUIRED, DENIED_NOT_ORG_MEMBER};
use spacedeck_core::{Member, MemberRole, Organization, OrganizationId, UserId};
use spacedeck_infra::MembershipStore;

use crate::resolver::store_failure;

/// Require any membership in the organization.
///
/// Unknown organization ids fail with `NotFound` before membership is
/// considered.
pub async fn require_org_member<S>(
    store: &S,
    user_id: UserId,
    organization_id: OrganizationId,
) -> Result<(Organization, Member), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let organization = store
        .get_organization(organization_id)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)?;

    let member = store
        .get_member(user_id, organization_id)
        .await
        .map_err(store_failure)?
        .ok_or_else(|| AccessError::forbidden(DENIED_NOT_ORG_MEMBER))?;

    Ok((organization, member))
}

/// Require an ADMIN membership in the organization.
pub async fn require_org_admin<S>(
    store: &S,
    user_id: UserId,
    organization_id: OrganizationId,
) -> Result<(Organization, Member), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let (organization, member) = require_org_member(store, user_id, organization_id).await?;
    if !member.role.satisfies(MemberRole::Admin) {
        return Err(AccessError::forbidden(DENIED_ADMIN_REQUIRED));
    }
    Ok((organization, member))
}
