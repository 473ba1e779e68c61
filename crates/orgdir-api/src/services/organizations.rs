use orgdir_core::{
    models::{OrganizationRecord, Page, PageQuery, PageRequest, Status},
    AppError, ErrorCode,
};
use orgdir_db::{
    AccountRepository, NewOrganization, OrganizationChanges, OrganizationFilter,
    OrganizationRepository, TransactionGuard,
};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    /// Login name of the owner, who must already exist.
    #[validate(length(min = 1, max = 64))]
    pub owner_account: String,
    #[validate(length(max = 512))]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 512))]
    pub remark: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationQuery {
    pub name: Option<String>,
    pub status: Option<Status>,
    pub page_idx: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Clone)]
pub struct OrganizationService {
    pool: PgPool,
    organizations: OrganizationRepository,
    accounts: AccountRepository,
}

impl OrganizationService {
    pub fn new(
        pool: PgPool,
        organizations: OrganizationRepository,
        accounts: AccountRepository,
    ) -> Self {
        Self {
            pool,
            organizations,
            accounts,
        }
    }

    pub async fn list(
        &self,
        query: OrganizationQuery,
    ) -> Result<Page<OrganizationRecord>, AppError> {
        let page: PageRequest = PageQuery {
            page_idx: query.page_idx,
            page_size: query.page_size,
        }
        .into();
        let filter = OrganizationFilter {
            name: query.name,
            status: query.status,
        };
        self.organizations.list(filter, page).await
    }

    pub async fn detail(&self, id: Uuid) -> Result<OrganizationRecord, AppError> {
        self.organizations
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization".to_string()))
    }

    /// Creates the organization and the owner's membership together.
    pub async fn create(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<OrganizationRecord, AppError> {
        validate(&request)?;

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.create_in(&mut tx, &request).await;
        let org_id = tx.finish(outcome).await?;

        self.detail(org_id).await
    }

    async fn create_in(
        &self,
        conn: &mut PgConnection,
        request: &CreateOrganizationRequest,
    ) -> Result<Uuid, AppError> {
        let owner = self
            .accounts
            .find_by_account(conn, request.owner_account.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Owner account".to_string()))?;

        let new = NewOrganization {
            name: request.name.trim().to_string(),
            owner_id: owner.id,
            remark: request.remark.clone(),
            is_admin: false,
        };
        let org = self
            .organizations
            .create(conn, &new, &owner.nick_name)
            .await?;
        Ok(org.id)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateOrganizationRequest,
    ) -> Result<OrganizationRecord, AppError> {
        validate(&request)?;
        let changes = OrganizationChanges {
            name: request.name.map(|n| n.trim().to_string()),
            remark: request.remark,
            status: request.status,
        };

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.update_in(&mut tx, id, &changes).await;
        tx.finish(outcome).await?;

        self.detail(id).await
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        changes: &OrganizationChanges,
    ) -> Result<(), AppError> {
        self.require_mutable(conn, id).await?;
        self.organizations.update(conn, id, changes).await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.delete_in(&mut tx, id).await;
        tx.finish(outcome).await
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        self.require_mutable(conn, id).await?;
        self.organizations.soft_delete(conn, id).await
    }

    /// The platform admin organization is never updated or deleted here.
    async fn require_mutable(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        let org = self
            .organizations
            .find(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization".to_string()))?;
        if org.is_admin {
            return Err(AppError::ProtectedResource(ErrorCode::AdminOrgDenied));
        }
        Ok(())
    }
}
