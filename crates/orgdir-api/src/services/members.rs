use orgdir_core::{
    models::{scope, MemberRecord, Page, PageQuery, PageRequest, Status},
    AppError, ErrorCode,
};
use orgdir_db::{
    AccountRepository, MemberChanges, MemberFilter, MembershipRepository, NewMember,
    OrganizationRepository, TransactionGuard,
};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::validate;
use crate::auth::Actor;

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(length(min = 1, max = 64))]
    pub account: String,
    /// Display name inside the organization; defaults to the nick name.
    #[validate(length(max = 64))]
    pub user_name: Option<String>,
    #[validate(length(max = 512))]
    pub avatar: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberRequest {
    #[validate(length(max = 64))]
    pub user_name: Option<String>,
    #[validate(length(max = 512))]
    pub avatar: Option<String>,
    pub status: Option<Status>,
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    pub user_name: Option<String>,
    pub status: Option<Status>,
    pub page_idx: Option<i64>,
    pub page_size: Option<i64>,
}

fn check_scopes(scopes: &[String]) -> Result<(), AppError> {
    match scopes.iter().find(|s| !scope::is_known(s)) {
        Some(unknown) => Err(AppError::InvalidInput(format!("Unknown scope: {}", unknown))),
        None => Ok(()),
    }
}

/// Only the org owner may rewrite the scopes of their own membership.
fn check_scope_change(actor: &Actor, target: Uuid, scopes: Option<&[String]>) -> Result<(), AppError> {
    if scopes.is_some() && actor.user_id == target && !actor.is_org_owner {
        return Err(AppError::Forbidden("own member scopes".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MemberService {
    pool: PgPool,
    members: MembershipRepository,
    accounts: AccountRepository,
    organizations: OrganizationRepository,
}

impl MemberService {
    pub fn new(
        pool: PgPool,
        members: MembershipRepository,
        accounts: AccountRepository,
        organizations: OrganizationRepository,
    ) -> Self {
        Self {
            pool,
            members,
            accounts,
            organizations,
        }
    }

    pub async fn list(&self, org_id: Uuid, query: MemberQuery) -> Result<Page<MemberRecord>, AppError> {
        let page: PageRequest = PageQuery {
            page_idx: query.page_idx,
            page_size: query.page_size,
        }
        .into();
        let filter = MemberFilter {
            user_name: query.user_name,
            status: query.status,
        };
        self.members.list(org_id, filter, page).await
    }

    /// Add an existing account to the organization.
    pub async fn add(&self, org_id: Uuid, request: AddMemberRequest) -> Result<MemberRecord, AppError> {
        validate(&request)?;
        check_scopes(&request.scopes)?;

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.add_in(&mut tx, org_id, &request).await;
        tx.finish(outcome).await
    }

    async fn add_in(
        &self,
        conn: &mut PgConnection,
        org_id: Uuid,
        request: &AddMemberRequest,
    ) -> Result<MemberRecord, AppError> {
        let user = self
            .accounts
            .find_by_account(conn, request.account.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))?;

        let new = NewMember {
            user_id: user.id,
            user_name: request
                .user_name
                .clone()
                .unwrap_or_else(|| user.nick_name.clone()),
            avatar: request.avatar.clone().or_else(|| user.avatar.clone()),
            scopes: request.scopes.clone(),
        };
        self.members.add(conn, org_id, &new).await?;

        self.members
            .get(conn, org_id, user.id)
            .await?
            .ok_or_else(|| AppError::Internal("Member missing after insert".to_string()))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        org_id: Uuid,
        user_id: Uuid,
        request: UpdateMemberRequest,
    ) -> Result<MemberRecord, AppError> {
        validate(&request)?;
        check_scope_change(actor, user_id, request.scopes.as_deref())?;
        if let Some(scopes) = &request.scopes {
            check_scopes(scopes)?;
        }
        let changes = MemberChanges {
            user_name: request.user_name,
            avatar: request.avatar,
            status: request.status,
            scopes: request.scopes,
        };

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let outcome = self.update_in(&mut tx, org_id, user_id, &changes).await;
        tx.finish(outcome).await
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        org_id: Uuid,
        user_id: Uuid,
        changes: &MemberChanges,
    ) -> Result<MemberRecord, AppError> {
        let org = self
            .organizations
            .find(conn, org_id)
            .await?
            .ok_or(AppError::OrgAccessDenied)?;
        if org.owner_id == user_id && changes.status == Some(Status::Disabled) {
            return Err(AppError::ProtectedResource(ErrorCode::OrgOwnerDeleteDenied));
        }

        self.members.update(conn, org_id, user_id, changes).await?;
        self.members
            .get(conn, org_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member".to_string()))
    }
}
