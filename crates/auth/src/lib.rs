//! `spacedeck-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it evaluates
//! the cascading access rule over membership rows that a store has already
//! loaded, and defines the denial taxonomy shared by every caller.

pub mod access;
pub mod error;

pub use access::{
    DENIED_ADMIN_REQUIRED, DENIED_NOT_ORG_MEMBER, DENIED_NOT_SPACE_MEMBER, SpaceAccess,
    SpaceMembershipView, evaluate_space_access, require_authenticated,
};
pub use error::{AccessError, DenialKind};
