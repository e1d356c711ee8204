use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use spacedeck_auth::SpaceMembershipView;
use spacedeck_core::{
    Member, MemberId, MemberRole, NewOrganization, NewProject, NewSpace, Organization,
    OrganizationId, OrganizationPatch, Project, ProjectId, ProjectPatch, Space, SpaceId,
    SpaceMember, SpacePatch, UserId,
};

/// Membership store operation error.
///
/// These are **infrastructure errors**; access decisions (`Forbidden`,
/// `NotFound` for the caller) are made above this layer. Callers translate
/// any `StoreError` into their transient-failure kind rather than into a
/// denial.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not serve the request (connection failure, poisoned
    /// state, corrupt row). Safe to retry with backoff.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A schema invariant rejected the write (duplicate membership, dangling
    /// reference).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Persistence boundary for the Organization → Space → Project hierarchy and
/// its membership rows.
///
/// ## Contracts
///
/// - `get_space_with_membership` is **one logical read**: the space together
///   with the caller's organization membership and space enrollment, all
///   observed at the same instant. The resolver depends on this to avoid
///   time-of-check/time-of-use races between the two membership lookups.
/// - Creation writes bake in the role defaults: organization creation
///   enrolls the creator as an ADMIN member in the same write; space
///   creation enrolls the creating member with the role they hold in the
///   organization.
/// - `(user_id, organization_id)` is unique over members and
///   `(member_id, space_id)` is unique over space members; violations are
///   `StoreError::Conflict`, never a silently ambiguous row.
/// - Deleting an organization or space cascades to its children.
/// - The membership administration primitives (`add_member`,
///   `remove_member`, `add_space_member`) belong to the storage layer; the
///   guarded operations never expose them to callers.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    // Reads

    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<Organization>, StoreError>;

    /// Organizations the user belongs to, newest first.
    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Organization>, StoreError>;

    async fn get_member(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Member>, StoreError>;

    /// The single joined lookup backing the access resolver.
    ///
    /// Returns `None` when the space does not exist; otherwise the space
    /// plus the caller's (possibly absent) membership rows.
    async fn get_space_with_membership(
        &self,
        space_id: SpaceId,
        user_id: UserId,
    ) -> Result<Option<SpaceMembershipView>, StoreError>;

    async fn list_spaces(&self, organization_id: OrganizationId)
    -> Result<Vec<Space>, StoreError>;

    async fn get_project(&self, project_id: ProjectId) -> Result<Option<Project>, StoreError>;

    async fn list_projects(&self, space_id: SpaceId) -> Result<Vec<Project>, StoreError>;

    // Guarded writes

    /// Create an organization and its first ADMIN member in one write.
    async fn create_organization(
        &self,
        new_organization: NewOrganization,
        creator: UserId,
    ) -> Result<(Organization, Member), StoreError>;

    async fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError>;

    /// Delete an organization, cascading to members, spaces, space members,
    /// and projects. Returns whether a row existed.
    async fn delete_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<bool, StoreError>;

    /// Create a space under the creator's organization and enroll the
    /// creator with their organization role, in one write.
    async fn create_space(
        &self,
        new_space: NewSpace,
        creator: Member,
    ) -> Result<(Space, SpaceMember), StoreError>;

    async fn update_space(
        &self,
        space_id: SpaceId,
        patch: SpacePatch,
    ) -> Result<Option<Space>, StoreError>;

    /// Delete a space, cascading to space members and projects.
    async fn delete_space(&self, space_id: SpaceId) -> Result<bool, StoreError>;

    async fn create_project(
        &self,
        space_id: SpaceId,
        new_project: NewProject,
    ) -> Result<Project, StoreError>;

    async fn update_project(
        &self,
        project_id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError>;

    async fn delete_project(&self, project_id: ProjectId) -> Result<bool, StoreError>;

    // Membership administration (storage-owned)

    /// Insert an organization membership row. Duplicate
    /// `(user_id, organization_id)` pairs are a `Conflict`.
    async fn add_member(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<Member, StoreError>;

    /// Remove a membership row. Space enrollments referencing the member may
    /// outlive it at this level; the resolver treats such rows as inert.
    async fn remove_member(&self, member_id: MemberId) -> Result<bool, StoreError>;

    /// Enroll an existing organization member into a space. The member must
    /// belong to the space's organization.
    async fn add_space_member(
        &self,
        space_id: SpaceId,
        member_id: MemberId,
        role: MemberRole,
    ) -> Result<SpaceMember, StoreError>;
}

#[async_trait]
impl<S> MembershipStore for Arc<S>
where
    S: MembershipStore + ?Sized,
{
    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<Organization>, StoreError> {
        (**self).get_organization(organization_id).await
    }

    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Organization>, StoreError> {
        (**self).list_organizations_for_user(user_id).await
    }

    async fn get_member(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Member>, StoreError> {
        (**self).get_member(user_id, organization_id).await
    }

    async fn get_space_with_membership(
        &self,
        space_id: SpaceId,
        user_id: UserId,
    ) -> Result<Option<SpaceMembershipView>, StoreError> {
        (**self).get_space_with_membership(space_id, user_id).await
    }

    async fn list_spaces(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Space>, StoreError> {
        (**self).list_spaces(organization_id).await
    }

    async fn get_project(&self, project_id: ProjectId) -> Result<Option<Project>, StoreError> {
        (**self).get_project(project_id).await
    }

    async fn list_projects(&self, space_id: SpaceId) -> Result<Vec<Project>, StoreError> {
        (**self).list_projects(space_id).await
    }

    async fn create_organization(
        &self,
        new_organization: NewOrganization,
        creator: UserId,
    ) -> Result<(Organization, Member), StoreError> {
        (**self).create_organization(new_organization, creator).await
    }

    async fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError> {
        (**self).update_organization(organization_id, patch).await
    }

    async fn delete_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<bool, StoreError> {
        (**self).delete_organization(organization_id).await
    }

    async fn create_space(
        &self,
        new_space: NewSpace,
        creator: Member,
    ) -> Result<(Space, SpaceMember), StoreError> {
        (**self).create_space(new_space, creator).await
    }

    async fn update_space(
        &self,
        space_id: SpaceId,
        patch: SpacePatch,
    ) -> Result<Option<Space>, StoreError> {
        (**self).update_space(space_id, patch).await
    }

    async fn delete_space(&self, space_id: SpaceId) -> Result<bool, StoreError> {
        (**self).delete_space(space_id).await
    }

    async fn create_project(
        &self,
        space_id: SpaceId,
        new_project: NewProject,
    ) -> Result<Project, StoreError> {
        (**self).create_project(space_id, new_project).await
    }

    async fn update_project(
        &self,
        project_id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        (**self).update_project(project_id, patch).await
    }

    async fn delete_project(&self, project_id: ProjectId) -> Result<bool, StoreError> {
        (**self).delete_project(project_id).await
    }

    async fn add_member(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<Member, StoreError> {
        (**self).add_member(organization_id, user_id, role).await
    }

    async fn remove_member(&self, member_id: MemberId) -> Result<bool, StoreError> {
        (**self).remove_member(member_id).await
    }

    async fn add_space_member(
        &self,
        space_id: SpaceId,
        member_id: MemberId,
        role: MemberRole,
    ) -> Result<SpaceMember, StoreError> {
        (**self).add_space_member(space_id, member_id, role).await
    }
}
