//! Lookups backing login, tenant selection and per-request revalidation.

use orgdir_core::{
    models::{OrgGrant, PasswordCredential, Status},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const GRANT_SELECT: &str = r#"
    SELECT o.id AS org_id, o.name AS org_name, o.owner_id, o.is_admin, m.scopes
    FROM org_users m
    JOIN organizations o ON o.id = m.org_id
    WHERE m.user_id = $1
      AND m.status = 'enabled'
      AND o.status = 'enabled'
      AND o.is_deleted = FALSE
"#;

#[derive(Clone)]
pub struct AuthRepository {
    pool: PgPool,
}

impl AuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Password credential of a live account (kind `password`, empty provider id).
    #[tracing::instrument(skip(self), fields(db.table = "user_credentials", db.operation = "select"))]
    pub async fn find_password_credential(
        &self,
        account: &str,
    ) -> Result<Option<PasswordCredential>, AppError> {
        let credential = sqlx::query_as::<Postgres, PasswordCredential>(
            r#"
            SELECT u.id AS user_id, u.status, c.secret
            FROM users u
            JOIN user_credentials c ON c.user_id = u.id
            WHERE u.account = $1
              AND u.is_deleted = FALSE
              AND c.kind = 'password'
              AND c.provider_id = ''
            "#,
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to look up credential");
            AppError::StoreFailure(e)
        })?;

        Ok(credential)
    }

    /// Global status of a live user, `None` when deleted or unknown.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %user_id))]
    pub async fn user_status(&self, user_id: Uuid) -> Result<Option<Status>, AppError> {
        let status = sqlx::query_scalar::<Postgres, Status>(
            "SELECT status FROM users WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status)
    }

    /// Organizations the user can currently act in, oldest first.
    #[tracing::instrument(skip(self), fields(db.table = "org_users", db.operation = "select", db.record_id = %user_id))]
    pub async fn list_grants(&self, user_id: Uuid) -> Result<Vec<OrgGrant>, AppError> {
        let sql = format!("{} ORDER BY o.created_at ASC, o.id ASC", GRANT_SELECT);
        let grants = sqlx::query_as::<Postgres, OrgGrant>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(grants)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_users", db.operation = "select", db.record_id = %user_id))]
    pub async fn find_grant(
        &self,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<OrgGrant>, AppError> {
        let sql = format!("{} AND o.id = $2", GRANT_SELECT);
        let grant = sqlx::query_as::<Postgres, OrgGrant>(&sql)
            .bind(user_id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(grant)
    }
}
