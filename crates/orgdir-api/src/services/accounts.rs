use orgdir_core::{
    models::{AccountRecord, Page, PageQuery, PageRequest, Status},
    AppError, ErrorCode,
};
use orgdir_db::{AccountChanges, AccountFilter, AccountRepository, NewAccount, TransactionGuard};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::validate;
use crate::auth::password::hash_password;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 64))]
    pub account: String,
    #[validate(length(max = 11))]
    pub phone: Option<String>,
    #[validate(length(max = 64))]
    #[serde(default)]
    pub nick_name: String,
    #[validate(length(max = 512))]
    pub avatar: Option<String>,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(max = 11))]
    pub phone: Option<String>,
    #[validate(length(max = 64))]
    pub nick_name: Option<String>,
    #[validate(length(max = 512))]
    pub avatar: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub account: Option<String>,
    pub nick_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<Status>,
    pub page_idx: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
    accounts: AccountRepository,
    default_password: String,
}

impl AccountService {
    pub fn new(pool: PgPool, accounts: AccountRepository, default_password: String) -> Self {
        Self {
            pool,
            accounts,
            default_password,
        }
    }

    pub async fn list(&self, query: AccountQuery) -> Result<Page<AccountRecord>, AppError> {
        let page: PageRequest = PageQuery {
            page_idx: query.page_idx,
            page_size: query.page_size,
        }
        .into();
        let filter = AccountFilter {
            account: query.account,
            nick_name: query.nick_name,
            phone: query.phone,
            status: query.status,
        };
        self.accounts.list(filter, page).await
    }

    pub async fn detail(&self, id: Uuid) -> Result<AccountRecord, AppError> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    /// New accounts get the configured default password.
    pub async fn create(&self, request: CreateAccountRequest) -> Result<AccountRecord, AppError> {
        validate(&request)?;
        let password_hash = hash_password(&self.default_password)?;
        let new = NewAccount {
            account: request.account.trim().to_string(),
            phone: request.phone,
            nick_name: request.nick_name,
            avatar: request.avatar,
            status: request.status,
        };

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.accounts.create(&mut tx, &new, &password_hash).await;
        let user = tx.finish(outcome).await?;

        self.detail(user.id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateAccountRequest,
    ) -> Result<AccountRecord, AppError> {
        validate(&request)?;
        let changes = AccountChanges {
            phone: request.phone,
            nick_name: request.nick_name,
            avatar: request.avatar,
            status: request.status,
        };

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.update_in(&mut tx, id, &changes).await;
        tx.finish(outcome).await?;

        self.detail(id).await
    }

    async fn update_in(
        &self,
        conn: &mut sqlx::PgConnection,
        id: Uuid,
        changes: &AccountChanges,
    ) -> Result<(), AppError> {
        let user = self
            .accounts
            .find(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))?;
        if user.is_superadmin() {
            return Err(AppError::ProtectedResource(ErrorCode::SuperadminDenied));
        }
        self.accounts.update(conn, id, changes).await?;
        Ok(())
    }

    /// Owners of a live organization and the superadmin cannot be deleted.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.delete_in(&mut tx, id).await;
        tx.finish(outcome).await
    }

    async fn delete_in(&self, conn: &mut sqlx::PgConnection, id: Uuid) -> Result<(), AppError> {
        let user = self
            .accounts
            .find(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))?;
        if user.is_superadmin() {
            return Err(AppError::ProtectedResource(ErrorCode::SuperadminDenied));
        }
        if self.accounts.owns_any_org(conn, id).await? {
            return Err(AppError::ProtectedResource(ErrorCode::OrgOwnerDeleteDenied));
        }
        self.accounts.soft_delete(conn, id).await
    }
}
