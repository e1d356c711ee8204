//! The two-tier role model shared by organization and space memberships.

use serde::{Deserialize, Serialize};

/// Membership role at a scope (organization or space).
///
/// Strict two-level ordering: `Admin` covers everything `Member` can do,
/// plus elevated operations (update/delete of the owning scope, creation of
/// child scopes). There are intentionally no per-permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Member,
    Admin,
}

impl MemberRole {
    /// Whether this role covers the capabilities of `required`.
    ///
    /// `Admin` satisfies any requirement; `Member` satisfies only `Member`.
    pub fn satisfies(self, required: MemberRole) -> bool {
        match (self, required) {
            (MemberRole::Admin, _) => true,
            (MemberRole::Member, MemberRole::Member) => true,
            (MemberRole::Member, MemberRole::Admin) => false,
        }
    }

    pub fn is_admin(self) -> bool {
        self == MemberRole::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Admin => "ADMIN",
            MemberRole::Member => "MEMBER",
        }
    }
}

impl core::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MemberRole {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(MemberRole::Admin),
            "MEMBER" => Ok(MemberRole::Member),
            other => Err(crate::error::DomainError::validation(format!(
                "unknown role: {other}"
            ))),
        }
    }
}
