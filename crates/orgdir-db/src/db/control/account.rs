use orgdir_core::{
    models::{AccountRecord, CredentialKind, Page, PageRequest, Status, User},
    AppError, ErrorCode, FieldCipher,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::engine::{
    check_unique, map_unique_violation, paginate, FormatRule, Formatter, Listing, UniquenessRule,
};
use crate::db::query::Predicate;

const RECORD_COLUMNS: &str = "id, account, phone, nick_name, avatar, status, created_at, updated_at";

/// Store constraints backing the account and phone uniqueness rules.
pub const UNIQUE_CONSTRAINTS: &[(&str, ErrorCode)] = &[
    ("users_account_key", ErrorCode::AccountAlreadyExists),
    ("users_phone_key", ErrorCode::PhoneAlreadyExists),
];

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub account: Option<String>,
    pub nick_name: Option<String>,
    /// Plain digits; matched against the encrypted column.
    pub phone: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account: String,
    pub phone: Option<String>,
    pub nick_name: String,
    pub avatar: Option<String>,
    pub status: Status,
}

/// `None` leaves a column untouched. An empty `phone` clears it.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub phone: Option<String>,
    pub nick_name: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<Status>,
}

/// Repository for users and their credentials. Phones are encrypted on the
/// way in and decrypted by the record formatter on the way out.
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
    cipher: FieldCipher,
}

impl AccountRepository {
    pub fn new(pool: PgPool, cipher: FieldCipher) -> Self {
        Self { pool, cipher }
    }

    /// Precedence: account collisions are reported before phone collisions.
    pub fn uniqueness_rules(account: &str, phone_cipher: Option<&str>) -> Vec<UniquenessRule> {
        let live = || Predicate::raw("is_deleted = FALSE");
        let mut rules = vec![UniquenessRule::new(
            ErrorCode::AccountAlreadyExists,
            Predicate::eq("account", account).and(live()),
        )];
        if let Some(phone) = phone_cipher {
            rules.push(UniquenessRule::new(
                ErrorCode::PhoneAlreadyExists,
                Predicate::eq("phone", phone).and(live()),
            ));
        }
        rules
    }

    fn encrypt_phone(&self, phone: &str) -> Result<Option<String>, AppError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Ok(None);
        }
        self.cipher.encrypt(phone).map(Some)
    }

    fn formatter(&self, mask: bool) -> Formatter {
        let cipher = self.cipher.clone();
        Formatter::new().rule(FormatRule::new("phone", move |value| {
            cipher.decrypt(value, mask)
        }))
    }

    fn list_predicate(cipher: &FieldCipher, filter: AccountFilter) -> Result<Predicate, AppError> {
        let mut predicate = Predicate::raw("is_deleted = FALSE");
        if let Some(account) = filter.account.filter(|a| !a.is_empty()) {
            predicate = predicate.and(Predicate::contains("account", &account));
        }
        if let Some(nick_name) = filter.nick_name.filter(|n| !n.is_empty()) {
            predicate = predicate.and(Predicate::contains("nick_name", &nick_name));
        }
        if let Some(phone) = filter.phone.filter(|p| !p.is_empty()) {
            let fragment = cipher.search_fragment(phone.trim())?;
            predicate = predicate.and(Predicate::contains("phone", &fragment));
        }
        if let Some(status) = filter.status {
            predicate = predicate.and(Predicate::eq("status", status));
        }
        Ok(predicate)
    }

    #[tracing::instrument(skip(self, filter), fields(db.table = "users", db.operation = "select"))]
    pub async fn list(
        &self,
        filter: AccountFilter,
        page: PageRequest,
    ) -> Result<Page<AccountRecord>, AppError> {
        let listing = Listing {
            columns: RECORD_COLUMNS,
            from: "users",
            filter: Self::list_predicate(&self.cipher, filter)?,
            order_by: "created_at DESC, id DESC",
        };

        let mut conn = self.pool.acquire().await?;
        paginate(&mut conn, &listing, page, &self.formatter(true)).await
    }

    /// Detail view; the phone is decrypted without masking.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<AccountRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, AccountRecord>(
            r#"
            SELECT id, account, phone, nick_name, avatar, status, created_at, updated_at
            FROM users
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(mut record) => {
                self.formatter(false).apply(&mut record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, conn), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn find(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, account, phone, nick_name, avatar, status, is_deleted, created_at, updated_at
            FROM users
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Look up a live account by its login name.
    #[tracing::instrument(skip(self, conn), fields(db.table = "users", db.operation = "select"))]
    pub async fn find_by_account(
        &self,
        conn: &mut PgConnection,
        account: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, account, phone, nick_name, avatar, status, is_deleted, created_at, updated_at
            FROM users
            WHERE account = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(account)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Insert a user and its password credential. Run inside a transaction.
    #[tracing::instrument(skip(self, conn, new, password_hash), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        new: &NewAccount,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let phone = match new.phone.as_deref() {
            Some(phone) => self.encrypt_phone(phone)?,
            None => None,
        };

        check_unique(
            &mut *conn,
            "users",
            &Self::uniqueness_rules(&new.account, phone.as_deref()),
            None,
        )
        .await?;

        let user = sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (id, account, phone, nick_name, avatar, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account, phone, nick_name, avatar, status, is_deleted, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.account)
        .bind(&phone)
        .bind(&new.nick_name)
        .bind(&new.avatar)
        .bind(new.status)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?;

        sqlx::query(
            r#"
            INSERT INTO user_credentials (id, user_id, kind, provider_id, secret)
            VALUES ($1, $2, $3, '', $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(CredentialKind::Password)
        .bind(password_hash)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "Failed to insert credential");
            AppError::StoreFailure(e)
        })?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    #[tracing::instrument(skip(self, conn, changes), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        changes: &AccountChanges,
    ) -> Result<User, AppError> {
        let phone = match changes.phone.as_deref() {
            Some(phone) => Some(self.encrypt_phone(phone)?),
            None => None,
        };

        if let Some(Some(cipher)) = &phone {
            let rules = [UniquenessRule::new(
                ErrorCode::PhoneAlreadyExists,
                Predicate::eq("phone", cipher.as_str()).and(Predicate::raw("is_deleted = FALSE")),
            )];
            check_unique(&mut *conn, "users", &rules, Some(&Predicate::ne("id", id))).await?;
        }

        let user = sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users
            SET phone = CASE WHEN $2 THEN $3 ELSE phone END,
                nick_name = COALESCE($4, nick_name),
                avatar = COALESCE($5, avatar),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING id, account, phone, nick_name, avatar, status, is_deleted, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(phone.is_some())
        .bind(phone.flatten())
        .bind(&changes.nick_name)
        .bind(&changes.avatar)
        .bind(changes.status)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?;

        user.ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    /// Flag the user deleted, overwrite account and phone with a tombstone so
    /// both can be registered again, and drop its credentials.
    #[tracing::instrument(skip(self, conn), fields(db.table = "users", db.operation = "delete", db.record_id = %id))]
    pub async fn soft_delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        let tombstone = id.to_string();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET account = $2,
                phone = CASE WHEN phone IS NULL THEN NULL ELSE $2 END,
                is_deleted = TRUE,
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(&tombstone)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account".to_string()));
        }

        sqlx::query("DELETE FROM user_credentials WHERE user_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::info!(user_id = %id, "Account deleted");
        Ok(())
    }

    /// Whether the user owns at least one live organization.
    pub async fn owns_any_org(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
        let owns = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM organizations WHERE owner_id = $1 AND is_deleted = FALSE)",
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(owns)
    }
}
