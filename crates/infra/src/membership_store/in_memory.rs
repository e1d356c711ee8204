use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use spacedeck_auth::SpaceMembershipView;
use spacedeck_core::{
    Member, MemberId, MemberRole, NewOrganization, NewProject, NewSpace, Organization,
    OrganizationId, OrganizationPatch, Project, ProjectId, ProjectPatch, Space, SpaceId,
    SpaceMember, SpaceMemberId, SpacePatch, UserId,
};

use super::r#trait::{MembershipStore, StoreError};

#[derive(Debug, Default)]
struct State {
    organizations: HashMap<OrganizationId, Organization>,
    members: HashMap<MemberId, Member>,
    spaces: HashMap<SpaceId, Space>,
    space_members: HashMap<SpaceMemberId, SpaceMember>,
    projects: HashMap<ProjectId, Project>,
}

impl State {
    fn member_for(&self, user_id: UserId, organization_id: OrganizationId) -> Option<Member> {
        self.members
            .values()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .copied()
    }

    fn space_member_for(&self, member_id: MemberId, space_id: SpaceId) -> Option<SpaceMember> {
        self.space_members
            .values()
            .find(|sm| sm.member_id == member_id && sm.space_id == space_id)
            .copied()
    }
}

/// In-memory membership store.
///
/// Intended for tests/dev. Lookups are linear scans; not optimized for
/// performance. Enforces the same invariants the Postgres schema does:
/// unique `(user_id, organization_id)` members, unique `(member_id,
/// space_id)` enrollments, space members keyed off existing members, and
/// cascading deletes from organizations and spaces.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    state: RwLock<State>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::unavailable("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<Organization>, StoreError> {
        Ok(self.read()?.organizations.get(&organization_id).cloned())
    }

    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Organization>, StoreError> {
        let state = self.read()?;
        let mut organizations: Vec<Organization> = state
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.organizations.get(&m.organization_id).cloned())
            .collect();
        organizations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(organizations)
    }

    async fn get_member(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Member>, StoreError> {
        Ok(self.read()?.member_for(user_id, organization_id))
    }

    async fn get_space_with_membership(
        &self,
        space_id: SpaceId,
        user_id: UserId,
    ) -> Result<Option<SpaceMembershipView>, StoreError> {
        let state = self.read()?;
        let Some(space) = state.spaces.get(&space_id).cloned() else {
            return Ok(None);
        };

        let org_member = state.member_for(user_id, space.organization_id);
        let space_member =
            org_member.and_then(|m| state.space_member_for(m.id, space_id));

        Ok(Some(SpaceMembershipView {
            space,
            org_member,
            space_member,
        }))
    }

    async fn list_spaces(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Space>, StoreError> {
        let state = self.read()?;
        let mut spaces: Vec<Space> = state
            .spaces
            .values()
            .filter(|s| s.organization_id == organization_id)
            .cloned()
            .collect();
        spaces.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.as_uuid().cmp(b.id.as_uuid())));
        Ok(spaces)
    }

    async fn get_project(&self, project_id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.read()?.projects.get(&project_id).cloned())
    }

    async fn list_projects(&self, space_id: SpaceId) -> Result<Vec<Project>, StoreError> {
        let state = self.read()?;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| p.space_id == space_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.as_uuid().cmp(b.id.as_uuid())));
        Ok(projects)
    }

    async fn create_organization(
        &self,
        new_organization: NewOrganization,
        creator: UserId,
    ) -> Result<(Organization, Member), StoreError> {
        let mut state = self.write()?;
        let now = Utc::now();

        let organization = Organization {
            id: OrganizationId::new(),
            name: new_organization.name().to_string(),
            logo: new_organization.logo().map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        let member = Member {
            id: MemberId::new(),
            user_id: creator,
            organization_id: organization.id,
            role: MemberRole::Admin,
            created_at: now,
        };

        state.organizations.insert(organization.id, organization.clone());
        state.members.insert(member.id, member);
        Ok((organization, member))
    }

    async fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError> {
        let mut state = self.write()?;
        let Some(organization) = state.organizations.get_mut(&organization_id) else {
            return Ok(None);
        };
        patch.apply(organization, Utc::now());
        Ok(Some(organization.clone()))
    }

    async fn delete_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.organizations.remove(&organization_id).is_none() {
            return Ok(false);
        }

        let space_ids: Vec<SpaceId> = state
            .spaces
            .values()
            .filter(|s| s.organization_id == organization_id)
            .map(|s| s.id)
            .collect();
        state.spaces.retain(|_, s| s.organization_id != organization_id);
        state
            .space_members
            .retain(|_, sm| !space_ids.contains(&sm.space_id));
        state.projects.retain(|_, p| !space_ids.contains(&p.space_id));
        state
            .members
            .retain(|_, m| m.organization_id != organization_id);
        Ok(true)
    }

    async fn create_space(
        &self,
        new_space: NewSpace,
        creator: Member,
    ) -> Result<(Space, SpaceMember), StoreError> {
        let mut state = self.write()?;

        // The creator row must still exist; a concurrently revoked member
        // cannot seed a space.
        match state.members.get(&creator.id) {
            Some(stored) if stored.organization_id == creator.organization_id => {}
            _ => return Err(StoreError::conflict("unknown creator member")),
        }
        if !state.organizations.contains_key(&creator.organization_id) {
            return Err(StoreError::conflict("unknown organization"));
        }

        let now = Utc::now();
        let space = Space {
            id: SpaceId::new(),
            organization_id: creator.organization_id,
            name: new_space.name().to_string(),
            icon: new_space.icon().map(str::to_string),
            color: new_space.color().map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        let space_member = SpaceMember {
            id: SpaceMemberId::new(),
            member_id: creator.id,
            space_id: space.id,
            role: creator.role,
            created_at: now,
        };

        state.spaces.insert(space.id, space.clone());
        state.space_members.insert(space_member.id, space_member);
        Ok((space, space_member))
    }

    async fn update_space(
        &self,
        space_id: SpaceId,
        patch: SpacePatch,
    ) -> Result<Option<Space>, StoreError> {
        let mut state = self.write()?;
        let Some(space) = state.spaces.get_mut(&space_id) else {
            return Ok(None);
        };
        patch.apply(space, Utc::now());
        Ok(Some(space.clone()))
    }

    async fn delete_space(&self, space_id: SpaceId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.spaces.remove(&space_id).is_none() {
            return Ok(false);
        }
        state.space_members.retain(|_, sm| sm.space_id != space_id);
        state.projects.retain(|_, p| p.space_id != space_id);
        Ok(true)
    }

    async fn create_project(
        &self,
        space_id: SpaceId,
        new_project: NewProject,
    ) -> Result<Project, StoreError> {
        let mut state = self.write()?;
        if !state.spaces.contains_key(&space_id) {
            return Err(StoreError::conflict("unknown space"));
        }

        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            space_id,
            name: new_project.name().to_string(),
            icon: new_project.icon().map(str::to_string),
            color: new_project.color().map(str::to_string),
            image: new_project.image().map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let mut state = self.write()?;
        let Some(project) = state.projects.get_mut(&project_id) else {
            return Ok(None);
        };
        patch.apply(project, Utc::now());
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, project_id: ProjectId) -> Result<bool, StoreError> {
        Ok(self.write()?.projects.remove(&project_id).is_some())
    }

    async fn add_member(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<Member, StoreError> {
        let mut state = self.write()?;
        if !state.organizations.contains_key(&organization_id) {
            return Err(StoreError::conflict("unknown organization"));
        }
        if state.member_for(user_id, organization_id).is_some() {
            return Err(StoreError::conflict(
                "member already exists for this user and organization",
            ));
        }

        let member = Member {
            id: MemberId::new(),
            user_id,
            organization_id,
            role,
            created_at: Utc::now(),
        };
        state.members.insert(member.id, member);
        Ok(member)
    }

    async fn remove_member(&self, member_id: MemberId) -> Result<bool, StoreError> {
        // Deliberately leaves any space enrollments in place: the resolver
        // must treat enrollments without a backing member as inert.
        Ok(self.write()?.members.remove(&member_id).is_some())
    }

    async fn add_space_member(
        &self,
        space_id: SpaceId,
        member_id: MemberId,
        role: MemberRole,
    ) -> Result<SpaceMember, StoreError> {
        let mut state = self.write()?;
        let Some(space) = state.spaces.get(&space_id) else {
            return Err(StoreError::conflict("unknown space"));
        };
        match state.members.get(&member_id) {
            Some(member) if member.organization_id == space.organization_id => {}
            Some(_) => {
                return Err(StoreError::conflict(
                    "member belongs to a different organization",
                ));
            }
            None => return Err(StoreError::conflict("unknown member")),
        }
        if state.space_member_for(member_id, space_id).is_some() {
            return Err(StoreError::conflict(
                "space member already exists for this member and space",
            ));
        }

        let space_member = SpaceMember {
            id: SpaceMemberId::new(),
            member_id,
            space_id,
            role,
            created_at: Utc::now(),
        };
        state.space_members.insert(space_member.id, space_member);
        Ok(space_member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_org(name: &str) -> NewOrganization {
        NewOrganization::new(name, None).unwrap()
    }

    fn new_space(name: &str) -> NewSpace {
        NewSpace::new(name, None, None).unwrap()
    }

    #[tokio::test]
    async fn organization_creation_enrolls_creator_as_admin() {
        let store = InMemoryMembershipStore::new();
        let creator = UserId::new();

        let (organization, member) = store
            .create_organization(new_org("Acme"), creator)
            .await
            .unwrap();

        assert_eq!(member.user_id, creator);
        assert_eq!(member.organization_id, organization.id);
        assert_eq!(member.role, MemberRole::Admin);
        assert_eq!(
            store.get_member(creator, organization.id).await.unwrap(),
            Some(member)
        );
    }

    #[tokio::test]
    async fn duplicate_membership_is_a_conflict() {
        let store = InMemoryMembershipStore::new();
        let (organization, _) = store
            .create_organization(new_org("Acme"), UserId::new())
            .await
            .unwrap();

        let user = UserId::new();
        store
            .add_member(organization.id, user, MemberRole::Member)
            .await
            .unwrap();
        let err = store
            .add_member(organization.id, user, MemberRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn space_creation_enrolls_creator_with_their_org_role() {
        let store = InMemoryMembershipStore::new();
        let (organization, admin) = store
            .create_organization(new_org("Acme"), UserId::new())
            .await
            .unwrap();

        let (space, space_member) = store
            .create_space(new_space("Engineering"), admin)
            .await
            .unwrap();

        assert_eq!(space.organization_id, organization.id);
        assert_eq!(space_member.member_id, admin.id);
        assert_eq!(space_member.space_id, space.id);
        assert_eq!(space_member.role, MemberRole::Admin);

        // Exactly one enrollment: the creator's.
        let view = store
            .get_space_with_membership(space.id, admin.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.space_member, Some(space_member));
    }

    #[tokio::test]
    async fn space_membership_requires_org_membership() {
        let store = InMemoryMembershipStore::new();
        let (org_a, admin_a) = store
            .create_organization(new_org("Acme"), UserId::new())
            .await
            .unwrap();
        let (_org_b, admin_b) = store
            .create_organization(new_org("Globex"), UserId::new())
            .await
            .unwrap();
        let (space, _) = store.create_space(new_space("Engineering"), admin_a).await.unwrap();

        // A member of another organization cannot be enrolled.
        let err = store
            .add_space_member(space.id, admin_b.id, MemberRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Enrolling a proper member twice is a conflict.
        let user = UserId::new();
        let member = store
            .add_member(org_a.id, user, MemberRole::Member)
            .await
            .unwrap();
        store
            .add_space_member(space.id, member.id, MemberRole::Member)
            .await
            .unwrap();
        let err = store
            .add_space_member(space.id, member.id, MemberRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn joined_lookup_filters_rows_to_the_caller() {
        let store = InMemoryMembershipStore::new();
        let (organization, admin) = store
            .create_organization(new_org("Acme"), UserId::new())
            .await
            .unwrap();
        let (space, _) = store
            .create_space(new_space("Engineering"), admin)
            .await
            .unwrap();

        let outsider = UserId::new();
        let view = store
            .get_space_with_membership(space.id, outsider)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.space.id, space.id);
        assert_eq!(view.org_member, None);
        assert_eq!(view.space_member, None);

        let stranger_org_member = store
            .add_member(organization.id, outsider, MemberRole::Member)
            .await
            .unwrap();
        let view = store
            .get_space_with_membership(space.id, outsider)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.org_member, Some(stranger_org_member));
        assert_eq!(view.space_member, None);
    }

    #[tokio::test]
    async fn missing_space_yields_no_view() {
        let store = InMemoryMembershipStore::new();
        let view = store
            .get_space_with_membership(SpaceId::new(), UserId::new())
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn removing_a_member_leaves_enrollments_inert() {
        let store = InMemoryMembershipStore::new();
        let (_, admin) = store
            .create_organization(new_org("Acme"), UserId::new())
            .await
            .unwrap();
        let (space, _) = store
            .create_space(new_space("Engineering"), admin)
            .await
            .unwrap();

        assert!(store.remove_member(admin.id).await.unwrap());

        // The enrollment row still exists, but without a backing member the
        // view can no longer link it to the user.
        let view = store
            .get_space_with_membership(space.id, admin.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.org_member, None);
        assert_eq!(view.space_member, None);
    }

    #[tokio::test]
    async fn deleting_an_organization_cascades() {
        let store = Arc::new(InMemoryMembershipStore::new());
        let creator = UserId::new();
        let (organization, admin) = store
            .create_organization(new_org("Acme"), creator)
            .await
            .unwrap();
        let (space, _) = store
            .create_space(new_space("Engineering"), admin)
            .await
            .unwrap();
        let project = store
            .create_project(space.id, NewProject::new("Website", None, None, None).unwrap())
            .await
            .unwrap();

        assert!(store.delete_organization(organization.id).await.unwrap());

        assert_eq!(store.get_organization(organization.id).await.unwrap(), None);
        assert!(
            store
                .get_space_with_membership(space.id, creator)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.get_project(project.id).await.unwrap(), None);
        assert_eq!(store.get_member(creator, organization.id).await.unwrap(), None);
        assert!(!store.delete_organization(organization.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_space_cascades_to_projects_and_enrollments() {
        let store = InMemoryMembershipStore::new();
        let (_, admin) = store
            .create_organization(new_org("Acme"), UserId::new())
            .await
            .unwrap();
        let (space, _) = store
            .create_space(new_space("Engineering"), admin)
            .await
            .unwrap();
        let project = store
            .create_project(space.id, NewProject::new("Website", None, None, None).unwrap())
            .await
            .unwrap();

        assert!(store.delete_space(space.id).await.unwrap());
        assert_eq!(store.get_project(project.id).await.unwrap(), None);
        assert_eq!(store.list_projects(space.id).await.unwrap(), vec![]);
        assert!(
            store
                .get_space_with_membership(space.id, admin.user_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn organizations_list_newest_first() {
        let store = InMemoryMembershipStore::new();
        let user = UserId::new();
        let (first, _) = store.create_organization(new_org("First"), user).await.unwrap();
        let (second, _) = store.create_organization(new_org("Second"), user).await.unwrap();

        let listed = store.list_organizations_for_user(user).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|o| o.id).collect();
        // UUIDv7 ids are time-ordered, so creation order is recoverable even
        // when both rows share a timestamp.
        assert_eq!(ids, vec![second.id, first.id]);

        assert!(
            store
                .list_organizations_for_user(UserId::new())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn creating_a_project_under_a_missing_space_is_a_conflict() {
        let store = InMemoryMembershipStore::new();
        let err = store
            .create_project(
                SpaceId::new(),
                NewProject::new("Website", None, None, None).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
