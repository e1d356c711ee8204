//! Organization: the top-level tenant boundary, and its membership rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::normalize_attr;
use crate::error::{DomainError, DomainResult};
use crate::id::{MemberId, OrganizationId, UserId};
use crate::role::MemberRole;

/// Top-level tenant. Owns spaces; deletion cascades to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's role-bearing membership within one organization.
///
/// Exactly one row exists per `(user_id, organization_id)` pair; the storage
/// layer enforces the uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    name: String,
    logo: Option<String>,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>, logo: Option<String>) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("organization name is required"));
        }
        Ok(Self {
            name,
            logo: normalize_attr(logo),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logo(&self) -> Option<&str> {
        self.logo.as_deref()
    }
}

/// Validated partial update for an organization.
///
/// Absent fields leave the current value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    name: Option<String>,
    logo: Option<String>,
}

impl OrganizationPatch {
    pub fn new(name: Option<String>, logo: Option<String>) -> DomainResult<Self> {
        let name = match name {
            Some(n) => {
                let n = n.trim().to_string();
                if n.chars().count() < 3 {
                    return Err(DomainError::validation(
                        "organization name must have at least 3 characters",
                    ));
                }
                Some(n)
            }
            None => None,
        };
        Ok(Self {
            name,
            logo: normalize_attr(logo),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn logo(&self) -> Option<&str> {
        self.logo.as_deref()
    }

    /// Apply this patch in place, bumping `updated_at`.
    pub fn apply(&self, organization: &mut Organization, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            organization.name = name.clone();
        }
        if let Some(logo) = &self.logo {
            organization.logo = Some(logo.clone());
        }
        organization.updated_at = now;
    }
}
