use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{Formattable, Timestamp};

/// Enable/disable flag shared by users, organizations and memberships.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Enabled,
    Disabled,
}

impl Status {
    pub fn is_enabled(self) -> bool {
        self == Status::Enabled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "credential_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Password,
    External,
}

/// Account name of the platform superadmin; it can be neither edited nor deleted.
pub const SUPERADMIN_ACCOUNT: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub account: String,
    /// FieldCipher ciphertext, NULL when the user has no phone.
    pub phone: Option<String>,
    pub nick_name: String,
    pub avatar: Option<String>,
    pub status: Status,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_superadmin(&self) -> bool {
        self.account == SUPERADMIN_ACCOUNT
    }
}

/// Login lookup result: the user's state plus their password hash.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PasswordCredential {
    pub user_id: Uuid,
    pub status: Status,
    pub secret: String,
}

/// Account row as returned by list and detail queries.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AccountRecord {
    pub id: Uuid,
    pub account: String,
    pub phone: Option<String>,
    pub nick_name: String,
    pub avatar: Option<String>,
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Formattable for AccountRecord {
    fn text_field(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "account" => Some(&mut self.account),
            "phone" => self.phone.as_mut(),
            "nick_name" => Some(&mut self.nick_name),
            "avatar" => self.avatar.as_mut(),
            _ => None,
        }
    }

    fn time_field(&mut self, name: &str) -> Option<&mut Timestamp> {
        match name {
            "created_at" => Some(&mut self.created_at),
            "updated_at" => Some(&mut self.updated_at),
            _ => None,
        }
    }
}
