//! Error types module
//!
//! Every failure a caller can observe is an [`AppError`]. Each variant maps to
//! exactly one [`ErrorCode`], which is the `code` field of the `{code, message}`
//! envelope returned to clients. Store errors keep their `sqlx::Error` as the
//! source so it can be logged, but it never reaches the client message.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use serde::Serialize;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected failures such as validation or uniqueness conflicts
    Debug,
    /// Authentication and authorization refusals
    Warn,
    /// Unexpected failures
    Error,
}

/// Fixed enumeration of envelope codes. `Succeed` is the only success value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Succeed,
    WrongCredentials,
    AccountDisabled,
    OrgAccessDenied,
    PhoneAlreadyExists,
    AccountAlreadyExists,
    SuperadminDenied,
    OrgOwnerDeleteDenied,
    OrgNameAlreadyExists,
    AdminOrgDenied,
    MemberAlreadyExists,
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    DecryptionFailure,
    StoreFailure,
    Internal,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::Succeed => 0,
            ErrorCode::WrongCredentials => 1001,
            ErrorCode::AccountDisabled => 1002,
            ErrorCode::OrgAccessDenied => 1003,
            ErrorCode::PhoneAlreadyExists => 1004,
            ErrorCode::AccountAlreadyExists => 1005,
            ErrorCode::SuperadminDenied => 1006,
            ErrorCode::OrgOwnerDeleteDenied => 1007,
            ErrorCode::OrgNameAlreadyExists => 1008,
            ErrorCode::AdminOrgDenied => 1009,
            ErrorCode::MemberAlreadyExists => 1010,
            ErrorCode::InvalidInput => 4000,
            ErrorCode::Unauthorized => 4001,
            ErrorCode::Forbidden => 4003,
            ErrorCode::NotFound => 4004,
            ErrorCode::DecryptionFailure => 5000,
            ErrorCode::StoreFailure => 5001,
            ErrorCode::Internal => 5002,
        }
    }

    /// Default client-facing message for the code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Succeed => "ok",
            ErrorCode::WrongCredentials => "Account or password is incorrect",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::OrgAccessDenied => "No access to this organization",
            ErrorCode::PhoneAlreadyExists => "Phone number already exists",
            ErrorCode::AccountAlreadyExists => "Account already exists",
            ErrorCode::SuperadminDenied => "The superadmin account cannot be modified",
            ErrorCode::OrgOwnerDeleteDenied => "An organization owner cannot be deleted or disabled",
            ErrorCode::OrgNameAlreadyExists => "Organization name already exists",
            ErrorCode::AdminOrgDenied => "The admin organization cannot be modified",
            ErrorCode::MemberAlreadyExists => "User is already a member of this organization",
            ErrorCode::InvalidInput => "Invalid input",
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Permission denied",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::DecryptionFailure => "Stored value could not be decrypted",
            ErrorCode::StoreFailure => "Database error",
            ErrorCode::Internal => "Internal server error",
        }
    }
}

/// Wire shape of every failure: `{code, message}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: i32,
    pub message: String,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Envelope code
    fn error_code(&self) -> ErrorCode;

    /// Client-facing message (never contains store details)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    #[error("Wrong credentials")]
    WrongCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Organization access denied")]
    OrgAccessDenied,

    /// A business-unique column collided, either in the pre-check or in the store.
    #[error("Uniqueness violation: {0:?}")]
    Uniqueness(ErrorCode),

    /// A protected row (superadmin, org owner, admin org) refused the mutation.
    #[error("Protected resource: {0:?}")]
    ProtectedResource(ErrorCode),

    #[error("Forbidden: missing scope {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[cfg(feature = "sqlx")]
    #[error("Store failure: {0}")]
    StoreFailure(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::StoreFailure(err)
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl AppError {
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.error_code().as_i32(),
            message: self.client_message(),
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::WrongCredentials | AppError::Unauthorized(_) => 401,
            AppError::AccountDisabled
            | AppError::OrgAccessDenied
            | AppError::Forbidden(_)
            | AppError::ProtectedResource(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Uniqueness(_) => 409,
            AppError::DecryptionFailure(_) | AppError::StoreFailure(_) | AppError::Internal(_) => {
                500
            }
        }
    }

    fn error_code(&self) -> ErrorCode {
        match self {
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::DecryptionFailure(_) => ErrorCode::DecryptionFailure,
            AppError::WrongCredentials => ErrorCode::WrongCredentials,
            AppError::AccountDisabled => ErrorCode::AccountDisabled,
            AppError::OrgAccessDenied => ErrorCode::OrgAccessDenied,
            AppError::Uniqueness(code) | AppError::ProtectedResource(code) => *code,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::StoreFailure(_) => ErrorCode::StoreFailure,
            AppError::Internal(_) => ErrorCode::Internal,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::Forbidden(scope) => format!("Permission denied: {}", scope),
            other => other.error_code().message().to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidInput(_)
            | AppError::NotFound(_)
            | AppError::Uniqueness(_)
            | AppError::ProtectedResource(_) => LogLevel::Debug,
            AppError::WrongCredentials
            | AppError::AccountDisabled
            | AppError::OrgAccessDenied
            | AppError::Forbidden(_)
            | AppError::Unauthorized(_) => LogLevel::Warn,
            AppError::DecryptionFailure(_) | AppError::StoreFailure(_) | AppError::Internal(_) => {
                LogLevel::Error
            }
        }
    }
}
