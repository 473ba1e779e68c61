//! Database repositories for the data access layer
//!
//! `engine` and `query` hold the primitives every repository shares;
//! `control/` holds one repository per directory table.

pub mod control;
pub mod engine;
pub mod query;
pub mod transaction;

pub use control::{
    AccountChanges, AccountFilter, AccountRepository, AuthRepository, MemberChanges,
    MemberFilter, MembershipRepository, NewAccount, NewMember, NewOrganization,
    OrganizationChanges, OrganizationFilter, OrganizationRepository,
};
