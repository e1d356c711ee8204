//! Membership store boundary.
//!
//! This module defines an infrastructure-facing abstraction over the
//! Organization/Member/Space/SpaceMember/Project tables without making any
//! storage assumptions. The access resolver only ever reads through it; the
//! guarded service operations drive the writes.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryMembershipStore;
pub use postgres::PostgresMembershipStore;
pub use r#trait::{MembershipStore, StoreError};
