use orgdir_core::{
    models::{MemberRecord, Page, PageRequest, Status},
    AppError, ErrorCode, FieldCipher,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::engine::{
    check_unique, map_unique_violation, paginate, FormatRule, Formatter, Listing, UniquenessRule,
};
use crate::db::query::Predicate;

pub const UNIQUE_CONSTRAINTS: &[(&str, ErrorCode)] =
    &[("org_users_org_id_user_id_key", ErrorCode::MemberAlreadyExists)];

const RECORD_COLUMNS: &str = "m.user_id, u.account, u.phone, m.user_name, m.avatar, m.status, \
    m.scopes, m.created_at, m.updated_at";
const RECORD_FROM: &str = "org_users m JOIN users u ON u.id = m.user_id";

#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub user_name: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub user_id: Uuid,
    pub user_name: String,
    pub avatar: Option<String>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberChanges {
    pub user_name: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<Status>,
    pub scopes: Option<Vec<String>>,
}

/// Repository for memberships (OrgUser rows). Every method is scoped to one
/// organization.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
    cipher: FieldCipher,
}

impl MembershipRepository {
    pub fn new(pool: PgPool, cipher: FieldCipher) -> Self {
        Self { pool, cipher }
    }

    fn formatter(&self) -> Formatter {
        let cipher = self.cipher.clone();
        Formatter::new().rule(FormatRule::new("phone", move |value| {
            cipher.decrypt(value, true)
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_users", db.operation = "select", org_id = %org_id))]
    pub async fn list(
        &self,
        org_id: Uuid,
        filter: MemberFilter,
        page: PageRequest,
    ) -> Result<Page<MemberRecord>, AppError> {
        let mut predicate = Predicate::eq("m.org_id", org_id).and(Predicate::raw("u.is_deleted = FALSE"));
        if let Some(name) = filter.user_name.filter(|n| !n.is_empty()) {
            predicate = predicate.and(Predicate::contains("m.user_name", &name));
        }
        if let Some(status) = filter.status {
            predicate = predicate.and(Predicate::eq("m.status", status));
        }

        let listing = Listing {
            columns: RECORD_COLUMNS,
            from: RECORD_FROM,
            filter: predicate,
            order_by: "m.created_at DESC, m.id DESC",
        };

        let mut conn = self.pool.acquire().await?;
        paginate(&mut conn, &listing, page, &self.formatter()).await
    }

    #[tracing::instrument(skip(self, conn), fields(db.table = "org_users", db.operation = "select", org_id = %org_id))]
    pub async fn get(
        &self,
        conn: &mut PgConnection,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MemberRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE m.org_id = $1 AND m.user_id = $2 AND u.is_deleted = FALSE",
            RECORD_COLUMNS, RECORD_FROM
        );
        let record = sqlx::query_as::<Postgres, MemberRecord>(&sql)
            .bind(org_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        match record {
            Some(mut record) => {
                self.formatter().apply(&mut record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Run inside a transaction.
    #[tracing::instrument(skip(self, conn, new), fields(db.table = "org_users", db.operation = "insert", org_id = %org_id))]
    pub async fn add(
        &self,
        conn: &mut PgConnection,
        org_id: Uuid,
        new: &NewMember,
    ) -> Result<(), AppError> {
        let rules = [UniquenessRule::new(
            ErrorCode::MemberAlreadyExists,
            Predicate::eq("org_id", org_id).and(Predicate::eq("user_id", new.user_id)),
        )];
        check_unique(&mut *conn, "org_users", &rules, None).await?;

        sqlx::query(
            r#"
            INSERT INTO org_users (id, org_id, user_id, user_name, avatar, scopes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(new.user_id)
        .bind(&new.user_name)
        .bind(&new.avatar)
        .bind(&new.scopes)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?;

        tracing::info!(org_id = %org_id, user_id = %new.user_id, "Member added");
        Ok(())
    }

    #[tracing::instrument(skip(self, conn, changes), fields(db.table = "org_users", db.operation = "update", org_id = %org_id))]
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        org_id: Uuid,
        user_id: Uuid,
        changes: &MemberChanges,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE org_users
            SET user_name = COALESCE($3, user_name),
                avatar = COALESCE($4, avatar),
                status = COALESCE($5, status),
                scopes = COALESCE($6, scopes),
                updated_at = NOW()
            WHERE org_id = $1 AND user_id = $2
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(&changes.user_name)
        .bind(&changes.avatar)
        .bind(changes.status)
        .bind(&changes.scopes)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member".to_string()));
        }
        Ok(())
    }
}
