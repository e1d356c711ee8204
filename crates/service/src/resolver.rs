//! The access resolver: one store read, then the pure cascading evaluation.

use tracing::{debug, instrument};

use spacedeck_auth::{AccessError, SpaceAccess, evaluate_space_access};
use spacedeck_core::{OrganizationId, SpaceId, UserId};
use spacedeck_infra::{MembershipStore, StoreError};

/// Translate a store failure into the retriable kind.
///
/// Infrastructure failures must never surface as a denial.
pub(crate) fn store_failure(err: StoreError) -> AccessError {
    AccessError::store_unavailable(err.to_string())
}

/// Resolve the caller's access to a space.
///
/// Loads the space together with the caller's organization membership and
/// space enrollment in one logical read, then evaluates the cascading rule:
/// organization membership first, space membership second, role last. The
/// result is valid only for the instant it was produced and must not be
/// cached across requests.
#[instrument(
    skip(store),
    fields(user_id = %user_id, space_id = %space_id)
)]
pub async fn resolve_space_access<S>(
    store: &S,
    user_id: UserId,
    space_id: SpaceId,
    require_admin: bool,
) -> Result<SpaceAccess, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let view = store
        .get_space_with_membership(space_id, user_id)
        .await
        .map_err(store_failure)?
        .ok_or(AccessError::NotFound)?;

    match evaluate_space_access(view, require_admin) {
        Ok(access) => Ok(access),
        Err(denial) => {
            debug!(%denial, "space access denied");
            Err(denial)
        }
    }
}

/// [`resolve_space_access`], plus a defense-in-depth parent check.
///
/// Callers that received an organization id alongside the space id (e.g. as
/// a query-scoped parameter) can assert the space actually belongs to it. A
/// space paired with the wrong parent is indistinguishable from a missing
/// space.
pub async fn resolve_space_in_org<S>(
    store: &S,
    user_id: UserId,
    space_id: SpaceId,
    organization_id: OrganizationId,
    require_admin: bool,
) -> Result<SpaceAccess, AccessError>
where
    S: MembershipStore + ?Sized,
{
    let access = resolve_space_access(store, user_id, space_id, require_admin).await?;
    if access.space.organization_id != organization_id {
        debug!(%space_id, %organization_id, "space does not belong to the supplied organization");
        return Err(AccessError::NotFound);
    }
    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacedeck_auth::{DENIED_ADMIN_REQUIRED, DENIED_NOT_ORG_MEMBER, DENIED_NOT_SPACE_MEMBER};
    use spacedeck_core::{MemberRole, NewOrganization, NewSpace};
    use spacedeck_infra::InMemoryMembershipStore;

    async fn seeded_store() -> (InMemoryMembershipStore, UserId, SpaceId, OrganizationId) {
        let store = InMemoryMembershipStore::new();
        let creator = UserId::new();
        let (organization, admin) = store
            .create_organization(NewOrganization::new("Acme", None).unwrap(), creator)
            .await
            .unwrap();
        let (space, _) = store
            .create_space(NewSpace::new("Engineering", None, None).unwrap(), admin)
            .await
            .unwrap();
        (store, creator, space.id, organization.id)
    }

    #[tokio::test]
    async fn creator_resolves_with_admin_requirement() {
        let (store, creator, space_id, _) = seeded_store().await;
        let access = resolve_space_access(&store, creator, space_id, true)
            .await
            .unwrap();
        assert_eq!(access.role(), MemberRole::Admin);
        assert_eq!(access.space.id, space_id);
    }

    #[tokio::test]
    async fn unknown_space_is_not_found() {
        let (store, creator, _, _) = seeded_store().await;
        let err = resolve_space_access(&store, creator, SpaceId::new(), false)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::NotFound);
    }

    #[tokio::test]
    async fn outsider_is_denied_at_organization_scope() {
        let (store, _, space_id, _) = seeded_store().await;
        let err = resolve_space_access(&store, UserId::new(), space_id, false)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_NOT_ORG_MEMBER));
    }

    #[tokio::test]
    async fn org_member_without_enrollment_is_denied_at_space_scope() {
        let (store, _, space_id, organization_id) = seeded_store().await;
        let user = UserId::new();
        store
            .add_member(organization_id, user, MemberRole::Member)
            .await
            .unwrap();

        let err = resolve_space_access(&store, user, space_id, false)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_NOT_SPACE_MEMBER));
    }

    #[tokio::test]
    async fn enrolled_member_is_denied_admin_operations() {
        let (store, _, space_id, organization_id) = seeded_store().await;
        let user = UserId::new();
        let member = store
            .add_member(organization_id, user, MemberRole::Member)
            .await
            .unwrap();
        store
            .add_space_member(space_id, member.id, MemberRole::Member)
            .await
            .unwrap();

        assert!(resolve_space_access(&store, user, space_id, false).await.is_ok());
        let err = resolve_space_access(&store, user, space_id, true)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_ADMIN_REQUIRED));
    }

    #[tokio::test]
    async fn revoked_org_membership_defeats_stale_enrollment() {
        let (store, creator, space_id, organization_id) = seeded_store().await;
        let member = store
            .get_member(creator, organization_id)
            .await
            .unwrap()
            .unwrap();
        store.remove_member(member.id).await.unwrap();

        let err = resolve_space_access(&store, creator, space_id, false)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::forbidden(DENIED_NOT_ORG_MEMBER));
    }

    #[tokio::test]
    async fn parent_mismatch_reads_as_missing_space() {
        let (store, creator, space_id, organization_id) = seeded_store().await;

        let ok = resolve_space_in_org(&store, creator, space_id, organization_id, false).await;
        assert!(ok.is_ok());

        let err = resolve_space_in_org(&store, creator, space_id, OrganizationId::new(), false)
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::NotFound);
    }

    #[tokio::test]
    async fn resolution_is_repeatable_under_unchanged_state() {
        let (store, creator, space_id, _) = seeded_store().await;
        let first = resolve_space_access(&store, creator, space_id, true).await;
        let second = resolve_space_access(&store, creator, space_id, true).await;
        assert_eq!(first, second);

        let outsider = UserId::new();
        let first = resolve_space_access(&store, outsider, space_id, false).await;
        let second = resolve_space_access(&store, outsider, space_id, false).await;
        assert_eq!(first, second);
    }
}
