pub mod account;
pub mod auth;
pub mod membership;
pub mod organization;

pub use account::{AccountChanges, AccountFilter, AccountRepository, NewAccount};
pub use auth::AuthRepository;
pub use membership::{MemberChanges, MemberFilter, MembershipRepository, NewMember};
pub use organization::{
    NewOrganization, OrganizationChanges, OrganizationFilter, OrganizationRepository,
};
