//! Authentication and tenant-scoped authorization.

pub mod authorizer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod token;

pub use authorizer::{IdentityStore, TenantAuthorizer};
pub use models::{Actor, TokenClaims};
pub use token::{IssuedToken, TokenService};
