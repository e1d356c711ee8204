//! Postgres-backed membership store.
//!
//! Persists the Organization → Space → Project hierarchy and its membership
//! rows (schema: `migrations/0001_membership_schema.sql`). The schema owns
//! the invariants the resolver relies on: `(user_id, organization_id)` and
//! `(member_id, space_id)` uniqueness, foreign keys from child to parent,
//! and cascading deletes.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique violation) | `Conflict` | Duplicate membership/enrollment |
//! | `23503` (foreign key violation) | `Conflict` | Dangling parent reference |
//! | `23514` (check constraint) | `Conflict` | Invalid role value |
//! | Any other database error | `Unavailable` | Transient/storage failure |
//! | Pool/connection/decode errors | `Unavailable` | Transient/storage failure |
//!
//! ## Thread Safety
//!
//! `PostgresMembershipStore` is `Send + Sync`; all operations go through the
//! SQLx connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use spacedeck_auth::SpaceMembershipView;
use spacedeck_core::{
    Member, MemberId, MemberRole, NewOrganization, NewProject, NewSpace, Organization,
    OrganizationId, OrganizationPatch, Project, ProjectId, ProjectPatch, Space, SpaceId,
    SpaceMember, SpaceMemberId, SpacePatch, UserId,
};

use super::r#trait::{MembershipStore, StoreError};

/// Postgres-backed membership store.
#[derive(Debug, Clone)]
pub struct PostgresMembershipStore {
    pool: Arc<PgPool>,
}

impl PostgresMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// The single joined lookup backing the access resolver.
    ///
    /// One round-trip: the space row left-joined with the caller's
    /// organization membership and space enrollment, so both membership
    /// checks observe the same instant.
    #[instrument(
        skip(self),
        fields(space_id = %space_id, user_id = %user_id),
        err
    )]
    pub async fn fetch_space_with_membership(
        &self,
        space_id: SpaceId,
        user_id: UserId,
    ) -> Result<Option<SpaceMembershipView>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                s.id, s.organization_id, s.name, s.icon, s.color,
                s.created_at, s.updated_at,
                m.id          AS member_id,
                m.user_id     AS member_user_id,
                m.role        AS member_role,
                m.created_at  AS member_created_at,
                sm.id         AS space_member_id,
                sm.role       AS space_member_role,
                sm.created_at AS space_member_created_at
            FROM spaces s
            LEFT JOIN members m
                ON m.organization_id = s.organization_id AND m.user_id = $2
            LEFT JOIN space_members sm
                ON sm.space_id = s.id AND sm.member_id = m.id
            WHERE s.id = $1
            "#,
        )
        .bind(space_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_space_with_membership", e))?;

        row.map(|row| view_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("fetch_space_with_membership", e))
    }
}

#[async_trait]
impl MembershipStore for PostgresMembershipStore {
    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, logo, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(organization_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_organization", e))?;

        row.map(|row| organization_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("get_organization", e))
    }

    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Organization>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.name, o.logo, o.created_at, o.updated_at
            FROM organizations o
            JOIN members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_organizations_for_user", e))?;

        rows.iter()
            .map(organization_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_organizations_for_user", e))
    }

    async fn get_member(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Member>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, organization_id, role, created_at
            FROM members
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_member", e))?;

        row.map(|row| member_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("get_member", e))
    }

    async fn get_space_with_membership(
        &self,
        space_id: SpaceId,
        user_id: UserId,
    ) -> Result<Option<SpaceMembershipView>, StoreError> {
        self.fetch_space_with_membership(space_id, user_id).await
    }

    async fn list_spaces(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Space>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, name, icon, color, created_at, updated_at
            FROM spaces
            WHERE organization_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_spaces", e))?;

        rows.iter()
            .map(space_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_spaces", e))
    }

    async fn get_project(&self, project_id: ProjectId) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, space_id, name, icon, color, image, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_project", e))?;

        row.map(|row| project_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("get_project", e))
    }

    async fn list_projects(&self, space_id: SpaceId) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, space_id, name, icon, color, image, created_at, updated_at
            FROM projects
            WHERE space_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(space_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_projects", e))?;

        rows.iter()
            .map(project_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_projects", e))
    }

    #[instrument(skip(self, new_organization), fields(creator = %creator), err)]
    async fn create_organization(
        &self,
        new_organization: NewOrganization,
        creator: UserId,
    ) -> Result<(Organization, Member), StoreError> {
        let now = chrono::Utc::now();
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_organization", e))?;

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, logo, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.logo)
        .bind(organization.created_at)
        .bind(organization.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_organization", e))?;

        sqlx::query(
            r#"
            INSERT INTO members (id, user_id, organization_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.user_id.as_uuid())
        .bind(member.organization_id.as_uuid())
        .bind(member.role.as_str())
        .bind(member.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_organization", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_organization", e))?;

        Ok((organization, member))
    }

    async fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE organizations
            SET name = COALESCE($2, name),
                logo = COALESCE($3, logo),
                updated_at = $4
            WHERE id = $1
            RETURNING id, name, logo, created_at, updated_at
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(patch.name())
        .bind(patch.logo())
        .bind(chrono::Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_organization", e))?;

        row.map(|row| organization_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("update_organization", e))
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    async fn delete_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(organization_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_organization", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, new_space),
        fields(member_id = %creator.id, organization_id = %creator.organization_id),
        err
    )]
    async fn create_space(
        &self,
        new_space: NewSpace,
        creator: Member,
    ) -> Result<(Space, SpaceMember), StoreError> {
        let now = chrono::Utc::now();
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_space", e))?;

        sqlx::query(
            r#"
            INSERT INTO spaces (id, organization_id, name, icon, color, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(space.id.as_uuid())
        .bind(space.organization_id.as_uuid())
        .bind(&space.name)
        .bind(&space.icon)
        .bind(&space.color)
        .bind(space.created_at)
        .bind(space.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_space", e))?;

        sqlx::query(
            r#"
            INSERT INTO space_members (id, member_id, space_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(space_member.id.as_uuid())
        .bind(space_member.member_id.as_uuid())
        .bind(space_member.space_id.as_uuid())
        .bind(space_member.role.as_str())
        .bind(space_member.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_space", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_space", e))?;

        Ok((space, space_member))
    }

    async fn update_space(
        &self,
        space_id: SpaceId,
        patch: SpacePatch,
    ) -> Result<Option<Space>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE spaces
            SET name = COALESCE($2, name),
                icon = COALESCE($3, icon),
                color = COALESCE($4, color),
                updated_at = $5
            WHERE id = $1
            RETURNING id, organization_id, name, icon, color, created_at, updated_at
            "#,
        )
        .bind(space_id.as_uuid())
        .bind(patch.name())
        .bind(patch.icon())
        .bind(patch.color())
        .bind(chrono::Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_space", e))?;

        row.map(|row| space_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("update_space", e))
    }

    #[instrument(skip(self), fields(space_id = %space_id), err)]
    async fn delete_space(&self, space_id: SpaceId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
            .bind(space_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_space", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_project(
        &self,
        space_id: SpaceId,
        new_project: NewProject,
    ) -> Result<Project, StoreError> {
        let now = chrono::Utc::now();
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

        sqlx::query(
            r#"
            INSERT INTO projects (id, space_id, name, icon, color, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.space_id.as_uuid())
        .bind(&project.name)
        .bind(&project.icon)
        .bind(&project.color)
        .bind(&project.image)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_project", e))?;

        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                icon = COALESCE($3, icon),
                color = COALESCE($4, color),
                image = COALESCE($5, image),
                updated_at = $6
            WHERE id = $1
            RETURNING id, space_id, name, icon, color, image, created_at, updated_at
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(patch.name())
        .bind(patch.icon())
        .bind(patch.color())
        .bind(patch.image())
        .bind(chrono::Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_project", e))?;

        row.map(|row| project_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("update_project", e))
    }

    async fn delete_project(&self, project_id: ProjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_project", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_member(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<Member, StoreError> {
        let member = Member {
            id: MemberId::new(),
            user_id,
            organization_id,
            role,
            created_at: chrono::Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO members (id, user_id, organization_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.user_id.as_uuid())
        .bind(member.organization_id.as_uuid())
        .bind(member.role.as_str())
        .bind(member.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_member", e))?;

        Ok(member)
    }

    async fn remove_member(&self, member_id: MemberId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(member_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_member", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_space_member(
        &self,
        space_id: SpaceId,
        member_id: MemberId,
        role: MemberRole,
    ) -> Result<SpaceMember, StoreError> {
        // The (member, space) organization agreement is guarded here because
        // foreign keys alone cannot express it.
        let row = sqlx::query(
            r#"
            SELECT (m.organization_id = s.organization_id) AS same_org
            FROM members m, spaces s
            WHERE m.id = $1 AND s.id = $2
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(space_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_space_member", e))?;

        match row {
            None => return Err(StoreError::conflict("unknown member or space")),
            Some(row) => {
                let same_org: bool = row
                    .try_get("same_org")
                    .map_err(|e| map_sqlx_error("add_space_member", e))?;
                if !same_org {
                    return Err(StoreError::conflict(
                        "member belongs to a different organization",
                    ));
                }
            }
        }

        let space_member = SpaceMember {
            id: SpaceMemberId::new(),
            member_id,
            space_id,
            role,
            created_at: chrono::Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO space_members (id, member_id, space_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(space_member.id.as_uuid())
        .bind(space_member.member_id.as_uuid())
        .bind(space_member.space_id.as_uuid())
        .bind(space_member.role.as_str())
        .bind(space_member.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_space_member", e))?;

        Ok(space_member)
    }
}

// Row mapping

fn parse_role(row: &PgRow, column: &str) -> Result<MemberRole, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    raw.parse::<MemberRole>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

fn organization_from_row(row: &PgRow) -> Result<Organization, sqlx::Error> {
    Ok(Organization {
        id: OrganizationId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        logo: row.try_get("logo")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn member_from_row(row: &PgRow) -> Result<Member, sqlx::Error> {
    Ok(Member {
        id: MemberId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        organization_id: OrganizationId::from_uuid(row.try_get("organization_id")?),
        role: parse_role(row, "role")?,
        created_at: row.try_get("created_at")?,
    })
}

fn space_from_row(row: &PgRow) -> Result<Space, sqlx::Error> {
    Ok(Space {
        id: SpaceId::from_uuid(row.try_get("id")?),
        organization_id: OrganizationId::from_uuid(row.try_get("organization_id")?),
        name: row.try_get("name")?,
        icon: row.try_get("icon")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn project_from_row(row: &PgRow) -> Result<Project, sqlx::Error> {
    Ok(Project {
        id: ProjectId::from_uuid(row.try_get("id")?),
        space_id: SpaceId::from_uuid(row.try_get("space_id")?),
        name: row.try_get("name")?,
        icon: row.try_get("icon")?,
        color: row.try_get("color")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn view_from_row(row: &PgRow) -> Result<SpaceMembershipView, sqlx::Error> {
    let space = space_from_row(row)?;

    let org_member = match row.try_get::<Option<uuid::Uuid>, _>("member_id")? {
        Some(member_id) => Some(Member {
            id: MemberId::from_uuid(member_id),
            user_id: UserId::from_uuid(row.try_get("member_user_id")?),
            organization_id: space.organization_id,
            role: parse_role(row, "member_role")?,
            created_at: row.try_get("member_created_at")?,
        }),
        None => None,
    };

    let space_member = match (
        row.try_get::<Option<uuid::Uuid>, _>("space_member_id")?,
        &org_member,
    ) {
        (Some(space_member_id), Some(member)) => Some(SpaceMember {
            id: SpaceMemberId::from_uuid(space_member_id),
            member_id: member.id,
            space_id: space.id,
            role: parse_role(row, "space_member_role")?,
            created_at: row.try_get("space_member_created_at")?,
        }),
        _ => None,
    };

    Ok(SpaceMembershipView {
        space,
        org_member,
        space_member,
    })
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: duplicate membership/enrollment.
                Some("23505") => StoreError::Conflict(msg),
                // Foreign key violation: dangling parent reference.
                Some("23503") => StoreError::Conflict(msg),
                // Check constraint violation: invalid role value.
                Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_map_to_conflict() {
        // Error-code mapping is the part of this module that does not need a
        // live database to verify.
        let err = map_sqlx_error("add_member", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err = map_sqlx_error("get_member", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
