//! Space: a sub-tenant scope within an organization, and its membership rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::normalize_attr;
use crate::error::{DomainError, DomainResult};
use crate::id::{MemberId, OrganizationId, SpaceId, SpaceMemberId};
use crate::role::MemberRole;

/// A scope within one organization. Owns projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A member's role-bearing membership within one space.
///
/// Keyed off a [`crate::Member`] (not directly off a user id), so
/// organization membership is a prerequisite for space membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceMember {
    pub id: SpaceMemberId,
    pub member_id: MemberId,
    pub space_id: SpaceId,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSpace {
    name: String,
    icon: Option<String>,
    color: Option<String>,
}

impl NewSpace {
    pub fn new(
        name: impl Into<String>,
        icon: Option<String>,
        color: Option<String>,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.chars().count() < 3 {
            return Err(DomainError::validation(
                "space name must have at least 3 characters",
            ));
        }
        Ok(Self {
            name,
            icon: normalize_attr(icon),
            color: normalize_attr(color),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

/// Validated partial update for a space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacePatch {
    name: Option<String>,
    icon: Option<String>,
    color: Option<String>,
}

impl SpacePatch {
    pub fn new(
        name: Option<String>,
        icon: Option<String>,
        color: Option<String>,
    ) -> DomainResult<Self> {
        let name = match name {
            Some(n) => {
                let n = n.trim().to_string();
                if n.is_empty() {
                    return Err(DomainError::validation("space name cannot be empty"));
                }
                Some(n)
            }
            None => None,
        };
        Ok(Self {
            name,
            icon: normalize_attr(icon),
            color: normalize_attr(color),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Apply this patch in place, bumping `updated_at`.
    pub fn apply(&self, space: &mut Space, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            space.name = name.clone();
        }
        if let Some(icon) = &self.icon {
            space.icon = Some(icon.clone());
        }
        if let Some(color) = &self.color {
            space.color = Some(color.clone());
        }
        space.updated_at = now;
    }
}
