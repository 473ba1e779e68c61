use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{Formattable, Timestamp};
use super::user::Status;

/// Organization (tenant). The platform admin org has `is_admin` set and
/// cannot be modified or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub is_admin: bool,
    pub remark: Option<String>,
    pub status: Status,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrganizationRecord {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner_account: String,
    pub is_admin: bool,
    pub remark: Option<String>,
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Formattable for OrganizationRecord {
    fn text_field(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "name" => Some(&mut self.name),
            "owner_account" => Some(&mut self.owner_account),
            "remark" => self.remark.as_mut(),
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
