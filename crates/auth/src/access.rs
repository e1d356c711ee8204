//! Cascading space-access evaluation.
//!
//! The rule is evaluated over a [`SpaceMembershipView`] — the product of one
//! logical store read (space joined with the caller's filtered organization
//! and space memberships), so the two membership checks cannot observe
//! different instants.

use spacedeck_core::{Member, MemberRole, Space, SpaceMember, UserId};

use crate::error::AccessError;

/// Denial reason: the caller has no membership in the space's organization.
pub const DENIED_NOT_ORG_MEMBER: &str = "not an organization member";
/// Denial reason: the caller is an organization member but not enrolled in
/// the space.
pub const DENIED_NOT_SPACE_MEMBER: &str = "not a space member";
/// Denial reason: the operation needs ADMIN at the relevant scope.
pub const DENIED_ADMIN_REQUIRED: &str = "admin required";

/// A space together with the caller's membership rows, loaded in one read.
///
/// `org_member` is the caller's membership in the space's organization (if
/// any); `space_member` is the caller's enrollment in the space itself (if
/// any). Both are pre-filtered to the caller by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceMembershipView {
    pub space: Space,
    pub org_member: Option<Member>,
    pub space_member: Option<SpaceMember>,
}

/// A granted access decision.
///
/// Carries the resolved membership rows so callers can make secondary
/// decisions (e.g. project writes) without re-querying. Valid only for the
/// instant it was produced — membership may change concurrently, so results
/// must not be cached across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceAccess {
    pub space: Space,
    pub org_member: Member,
    pub space_member: SpaceMember,
}

impl SpaceAccess {
    /// The caller's role at space scope.
    pub fn role(&self) -> MemberRole {
        self.space_member.role
    }
}

/// Reject missing caller identity before any store work happens.
pub fn require_authenticated(actor: Option<UserId>) -> Result<UserId, AccessError> {
    actor.ok_or(AccessError::Unauthenticated)
}

/// Evaluate the cascading access rule.
///
/// Organization membership is checked before space membership, never the
/// other way around: a user whose organization membership was revoked loses
/// access even while a stale space enrollment still exists. Conversely an
/// organization ADMIN has no implicit space access without an enrollment —
/// space membership is opt-in per space (auto-granted only at creation).
///
/// - No I/O
/// - No panics
/// - No silent defaulting to "allowed"
pub fn evaluate_space_access(
    view: SpaceMembershipView,
    require_admin: bool,
) -> Result<SpaceAccess, AccessError> {
    let SpaceMembershipView {
        space,
        org_member,
        space_member,
    } = view;

    let org_member = match org_member {
        Some(m) if m.organization_id == space.organization_id => m,
        // A membership row for some other organization is not a grant here.
        _ => return Err(AccessError::forbidden(DENIED_NOT_ORG_MEMBER)),
    };

    let space_member = match space_member {
        Some(sm) if sm.space_id == space.id && sm.member_id == org_member.id => sm,
        _ => return Err(AccessError::forbidden(DENIED_NOT_SPACE_MEMBER)),
    };

    if require_admin && !space_member.role.satisfies(MemberRole::Admin) {
        return Err(AccessError::forbidden(DENIED_ADMIN_REQUIRED));
    }

    Ok(SpaceAccess {
        space,
        org_member,
        space_member,
    })
}
