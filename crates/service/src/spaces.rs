//! Guarded space operations.

use spacedeck_auth::{AccessError, SpaceAccess, require_authenticated};
use spacedeck_core::{NewSpace, OrganizationId, Space, SpaceId, SpaceMember, SpacePatch, UserId};
use spacedeck_infra::MembershipStore;

use crate::guard::{require_org_admin, require_org_member};
use crate::resolver::{resolve_space_access, resolve_space_in_org, store_failure};

/// Resolve with or without the optional parent-organization check.
async fn resolve<S>(
    store: &S,
    user_id: UserId,
    space_id: SpaceId,
    expected_org: Option<OrganizationId>,
    require_admin: bool,
) -> Result<SpaceAccess, AccessError>
where
    S: MembershipStore + ?Sized,
{
    match expected_org {
        Some(organization_id) => {
            resolve_space_in_org(store, user_id, space_id, organization_id, require_admin).await
        }
        None => resolve_space_access(store, user_id, space_id, require_admin).await,
    }
}

/// Create a space. Requires an ADMIN membership in the organization; the
/// creating member is auto-enrolled with the role they hold there.
pub async fn create_space<S>(
    store: &S,
    actor: Option<UserId>,
    organization_id: OrganizationId,
    new_space: NewSpace,
) -> Result<(Space, SpaceMember), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    let (_, member) = require_org_admin(store, user_id, organization_id).await?;
    store
        .create_space(new_space, member)
        .await
        .map_err(store_failure)
}

/// List an organization's spaces. Requires organization membership.
pub async fn list_spaces<S>(
    store: &S,
    actor: Option<UserId>,
    organization_id: OrganizationId,
) -> Result<Vec<Space>, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    require_org_member(store, user_id, organization_id).await?;
    store
        .list_spaces(organization_id)
        .await
        .map_err(store_failure)
}

/// Fetch one space. Requires space membership; `expected_org`, when
/// supplied, additionally asserts the space belongs to that organization.
pub async fn get_space<S>(
    store: &S,
    actor: Option<UserId>,
    space_id: SpaceId,
    expected_org: Option<OrganizationId>,
) -> Result<Space, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    let access = resolve(store, user_id, space_id, expected_org, false).await?;
    Ok(access.space)
}

/// Update a space. Requires an ADMIN space membership.
pub async fn update_space<S>(
    store: &S,
    actor: Option<UserId>,
    space_id: SpaceId,
    expected_org: Option<OrganizationId>,
    patch: SpacePatch,
) -> Result<Space, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    resolve(store, user_id, space_id, expected_org, true).await?;
    store
        .update_space(space_id, patch)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)
}

/// Delete a space, cascading to its projects and enrollments. Requires an
/// ADMIN space membership.
pub async fn delete_space<S>(
    store: &S,
    actor: Option<UserId>,
    space_id: SpaceId,
    expected_org: Option<OrganizationId>,
) -> Result<(), AccessError>
where
    S: MembershipStore + ?Sized,
{
    let user_id = require_authenticated(actor)?;
    resolve(store, user_id, space_id, expected_org, true).await?;
    if store.delete_space(space_id).await.map_err(store_failure)? {
        Ok(())
    } else {
        Err(AccessError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacedeck_auth::{DENIED_ADMIN_REQUIRED, DENIED_NOT_ORG_MEMBER};
    use spacedeck_core::{MemberRole, NewOrganization};
    use spacedeck_infra::InMemoryMembershipStore;

    async fn acme(store: &InMemoryMembershipStore) -> (OrganizationId, UserId) {
        let creator = UserId::new();
        let (organization, _) = store
            .create_organization(NewOrganization::new("Acme", None).unwrap(), creator)
            .await
            .unwrap();
        (organization.id, creator)
    }

    fn eng() -> NewSpace {
        NewSpace::new("Engineering", None, None).unwrap()
    }

    #[tokio::test]
    async fn every_operation_rejects_missing_identity() {
        let store = InMemoryMembershipStore::new();
        let organization_id = OrganizationId::new();
        let space_id = SpaceId::new();

        assert_eq!(
            create_space(&store, None, organization_id, eng()).await.unwrap_err(),
            AccessError::Unauthenticated
        );
        assert_eq!(
            list_spaces(&store, None, organization_id).await.unwrap_err(),
            AccessError::Unauthenticated
        );
        assert_eq!(
            get_space(&store, None, space_id, None).await.unwrap_err(),
            AccessError::Unauthenticated
        );
        assert_eq!(
            update_space(&store, None, space_id, None, SpacePatch::default())
                .await
                .unwrap_err(),
            AccessError::Unauthenticated
        );
        assert_eq!(
            delete_space(&store, None, space_id, None).await.unwrap_err(),
            AccessError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn creation_requires_org_admin_and_enrolls_creator() {
        let store = InMemoryMembershipStore::new();
        let (organization_id, creator) = acme(&store).await;

        let plain_user = UserId::new();
        store
            .add_member(organization_id, plain_user, MemberRole::Member)
            .await
            .unwrap();
        let err = create_space(&store, Some(plain_user), organization_id, eng())
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_ADMIN_REQUIRED));

        let (space, space_member) = create_space(&store, Some(creator), organization_id, eng())
            .await
            .unwrap();
        assert_eq!(space.organization_id, organization_id);
        assert_eq!(space_member.role, MemberRole::Admin);

        // The creator can immediately act as a space admin.
        let fetched = get_space(&store, Some(creator), space.id, Some(organization_id))
            .await
            .unwrap();
        assert_eq!(fetched, space);
    }

    #[tokio::test]
    async fn listing_requires_org_membership() {
        let store = InMemoryMembershipStore::new();
        let (organization_id, creator) = acme(&store).await;
        create_space(&store, Some(creator), organization_id, eng())
            .await
            .unwrap();

        let err = list_spaces(&store, Some(UserId::new()), organization_id)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_NOT_ORG_MEMBER));

        let listed = list_spaces(&store, Some(creator), organization_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn parent_mismatch_is_not_found() {
        let store = InMemoryMembershipStore::new();
        let (organization_id, creator) = acme(&store).await;
        let (space, _) = create_space(&store, Some(creator), organization_id, eng())
            .await
            .unwrap();

        let err = get_space(&store, Some(creator), space.id, Some(OrganizationId::new()))
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::NotFound);
    }

    #[tokio::test]
    async fn member_enrollment_grants_reads_not_writes() {
        let store = InMemoryMembershipStore::new();
        let (organization_id, creator) = acme(&store).await;
        let (space, _) = create_space(&store, Some(creator), organization_id, eng())
            .await
            .unwrap();

        let user = UserId::new();
        let member = store
            .add_member(organization_id, user, MemberRole::Member)
            .await
            .unwrap();
        store
            .add_space_member(space.id, member.id, MemberRole::Member)
            .await
            .unwrap();

        assert!(get_space(&store, Some(user), space.id, None).await.is_ok());

        let patch = SpacePatch::new(Some("Platform".to_string()), None, None).unwrap();
        let err = update_space(&store, Some(user), space.id, None, patch)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_ADMIN_REQUIRED));

        let err = delete_space(&store, Some(user), space.id, None).await.unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_ADMIN_REQUIRED));
    }

    #[tokio::test]
    async fn admin_updates_and_deletes() {
        let store = InMemoryMembershipStore::new();
        let (organization_id, creator) = acme(&store).await;
        let (space, _) = create_space(&store, Some(creator), organization_id, eng())
            .await
            .unwrap();

        let patch = SpacePatch::new(Some("Platform".to_string()), None, None).unwrap();
        let updated = update_space(&store, Some(creator), space.id, Some(organization_id), patch)
            .await
            .unwrap();
        assert_eq!(updated.name, "Platform");

        delete_space(&store, Some(creator), space.id, Some(organization_id))
            .await
            .unwrap();
        let err = get_space(&store, Some(creator), space.id, None).await.unwrap_err();
        assert_eq!(err, AccessError::NotFound);
    }
}
