//! Infrastructure layer: membership persistence.

pub mod membership_store;

pub use membership_store::{
    InMemoryMembershipStore, MembershipStore, PostgresMembershipStore, StoreError,
};
