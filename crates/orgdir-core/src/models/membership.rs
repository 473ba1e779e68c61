use serde::Serialize;
use uuid::Uuid;

use super::record::{Formattable, Timestamp};
use super::user::Status;

/// Scope names granted through memberships.
pub mod scope {
    pub const ACCOUNT_LIST: &str = "account:list";
    pub const ACCOUNT_DETAIL: &str = "account:detail";
    pub const ACCOUNT_CREATE: &str = "account:create";
    pub const ACCOUNT_UPDATE: &str = "account:update";
    pub const ACCOUNT_DELETE: &str = "account:delete";
    pub const ORG_LIST: &str = "org:list";
    pub const ORG_DETAIL: &str = "org:detail";
    pub const ORG_CREATE: &str = "org:create";
    pub const ORG_UPDATE: &str = "org:update";
    pub const ORG_DELETE: &str = "org:delete";
    pub const MEMBER_LIST: &str = "member:list";
    pub const MEMBER_CREATE: &str = "member:create";
    pub const MEMBER_UPDATE: &str = "member:update";

    pub const ALL: &[&str] = &[
        ACCOUNT_LIST,
        ACCOUNT_DETAIL,
        ACCOUNT_CREATE,
        ACCOUNT_UPDATE,
        ACCOUNT_DELETE,
        ORG_LIST,
        ORG_DETAIL,
        ORG_CREATE,
        ORG_UPDATE,
        ORG_DELETE,
        MEMBER_LIST,
        MEMBER_CREATE,
        MEMBER_UPDATE,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// What a user may act as inside one organization: an enabled membership in
/// an enabled, non-deleted org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrgGrant {
    pub org_id: Uuid,
    pub org_name: String,
    pub owner_id: Uuid,
    pub is_admin: bool,
    pub scopes: Vec<String>,
}

impl OrgGrant {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MemberRecord {
    pub user_id: Uuid,
    pub account: String,
    pub phone: Option<String>,
    pub user_name: String,
    pub avatar: Option<String>,
    pub status: Status,
    pub scopes: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Formattable for MemberRecord {
    fn text_field(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "account" => Some(&mut self.account),
            "phone" => self.phone.as_mut(),
            "user_name" => Some(&mut self.user_name),
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
