//! Directory operations built on the repositories. Each mutation runs in
//! one transaction that commits only when every step succeeds.

pub mod accounts;
pub mod bootstrap;
pub mod members;
pub mod organizations;

pub use accounts::AccountService;
pub use members::MemberService;
pub use organizations::OrganizationService;

use orgdir_core::AppError;
use validator::Validate;

pub(crate) fn validate<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(format!("Validation error: {}", e)))
}
