//! `spacedeck-service` — the request-facing core.
//!
//! A transport layer (HTTP, RPC, CLI) hands every call an explicit actor
//! (`Option<UserId>`, `None` meaning unauthenticated) and a target resource;
//! this crate runs the guards and the access resolver against the membership
//! store and either performs the operation or surfaces a structured
//! [`spacedeck_auth::AccessError`]. There is no ambient "current user" and no
//! caching of decisions: every call re-reads membership state.

pub mod guard;
pub mod organizations;
pub mod projects;
pub mod resolver;
pub mod spaces;
pub mod telemetry;

pub use resolver::{resolve_space_access, resolve_space_in_org};
