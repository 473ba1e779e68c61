//! Orgdir HTTP API
//!
//! Multi-tenant identity and organization directory: password login with
//! tenant selection, scope-checked account, organization and membership
//! management over PostgreSQL.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::HttpAppError;
pub use state::AppState;
