use orgdir_core::{
    models::{scope, Organization, OrganizationRecord, Page, PageRequest, Status},
    AppError, ErrorCode,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::engine::{
    check_unique, map_unique_violation, paginate, Formatter, Listing, UniquenessRule,
};
use crate::db::query::Predicate;

pub const UNIQUE_CONSTRAINTS: &[(&str, ErrorCode)] =
    &[("organizations_name_key", ErrorCode::OrgNameAlreadyExists)];

const RECORD_COLUMNS: &str = "o.id, o.name, o.owner_id, u.account AS owner_account, o.is_admin, \
    o.remark, o.status, o.created_at, o.updated_at";
const RECORD_FROM: &str = "organizations o JOIN users u ON u.id = o.owner_id";

#[derive(Debug, Clone, Default)]
pub struct OrganizationFilter {
    pub name: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub owner_id: Uuid,
    pub remark: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub remark: Option<String>,
    pub status: Option<Status>,
}

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn name_rule(name: &str) -> UniquenessRule {
        UniquenessRule::new(
            ErrorCode::OrgNameAlreadyExists,
            Predicate::eq("name", name).and(Predicate::raw("is_deleted = FALSE")),
        )
    }

    #[tracing::instrument(skip(self), fields(db.table = "organizations", db.operation = "select"))]
    pub async fn list(
        &self,
        filter: OrganizationFilter,
        page: PageRequest,
    ) -> Result<Page<OrganizationRecord>, AppError> {
        let mut predicate = Predicate::raw("o.is_deleted = FALSE");
        if let Some(name) = filter.name.filter(|n| !n.is_empty()) {
            predicate = predicate.and(Predicate::contains("o.name", &name));
        }
        if let Some(status) = filter.status {
            predicate = predicate.and(Predicate::eq("o.status", status));
        }

        let listing = Listing {
            columns: RECORD_COLUMNS,
            from: RECORD_FROM,
            filter: predicate,
            order_by: "o.created_at DESC, o.id DESC",
        };

        let mut conn = self.pool.acquire().await?;
        paginate(&mut conn, &listing, page, &Formatter::new()).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "organizations", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<OrganizationRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE o.id = $1 AND o.is_deleted = FALSE",
            RECORD_COLUMNS, RECORD_FROM
        );
        let record = sqlx::query_as::<Postgres, OrganizationRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(mut record) => {
                Formatter::new().apply(&mut record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, conn), fields(db.table = "organizations", db.operation = "select", db.record_id = %id))]
    pub async fn find(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            SELECT id, name, owner_id, is_admin, remark, status, is_deleted, created_at, updated_at
            FROM organizations
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(org)
    }

    /// The platform admin organization, if one exists.
    pub async fn find_admin(&self, conn: &mut PgConnection) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            SELECT id, name, owner_id, is_admin, remark, status, is_deleted, created_at, updated_at
            FROM organizations
            WHERE is_admin = TRUE AND is_deleted = FALSE
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *conn)
        .await?;

        Ok(org)
    }

    /// Insert an organization and its owner's membership with every scope.
    /// Run inside a transaction.
    #[tracing::instrument(skip(self, conn, new), fields(db.table = "organizations", db.operation = "insert"))]
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        new: &NewOrganization,
        owner_display_name: &str,
    ) -> Result<Organization, AppError> {
        check_unique(&mut *conn, "organizations", &[Self::name_rule(&new.name)], None).await?;

        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            INSERT INTO organizations (id, name, owner_id, is_admin, remark)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, owner_id, is_admin, remark, status, is_deleted, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(new.owner_id)
        .bind(new.is_admin)
        .bind(&new.remark)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?;

        let all_scopes: Vec<String> = scope::ALL.iter().map(|s| s.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO org_users (id, org_id, user_id, user_name, scopes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org.id)
        .bind(new.owner_id)
        .bind(owner_display_name)
        .bind(&all_scopes)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, org_id = %org.id, "Failed to insert owner membership");
            AppError::StoreFailure(e)
        })?;

        tracing::info!(org_id = %org.id, owner_id = %org.owner_id, "Organization created");
        Ok(org)
    }

    #[tracing::instrument(skip(self, conn, changes), fields(db.table = "organizations", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        changes: &OrganizationChanges,
    ) -> Result<Organization, AppError> {
        if let Some(name) = changes.name.as_deref() {
            check_unique(
                &mut *conn,
                "organizations",
                &[Self::name_rule(name)],
                Some(&Predicate::ne("id", id)),
            )
            .await?;
        }

        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            UPDATE organizations
            SET name = COALESCE($2, name),
                remark = COALESCE($3, remark),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING id, name, owner_id, is_admin, remark, status, is_deleted, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.remark)
        .bind(changes.status)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?;

        org.ok_or_else(|| AppError::NotFound("Organization".to_string()))
    }

    /// Flag the organization deleted and tombstone its name.
    #[tracing::instrument(skip(self, conn), fields(db.table = "organizations", db.operation = "delete", db.record_id = %id))]
    pub async fn soft_delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET name = $2, is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Organization".to_string()));
        }

        tracing::info!(org_id = %id, "Organization deleted");
        Ok(())
    }
}
