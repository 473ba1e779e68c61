//! Account management. Only actors in the platform admin organization reach
//! these handlers, and each one also needs its `account:*` scope.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use orgdir_core::models::scope;
use uuid::Uuid;

use super::ok;
use crate::auth::Actor;
use crate::error::{HttpAppError, ValidatedJson, ValidatedQuery};
use crate::services::accounts::{AccountQuery, CreateAccountRequest, UpdateAccountRequest};
use crate::state::AppState;

fn gate(state: &AppState, actor: &Actor, required: &str) -> Result<(), HttpAppError> {
    actor.require_platform_admin()?;
    state.authorizer.authorize(actor, Some(required))?;
    Ok(())
}

#[tracing::instrument(skip(state, actor, query), fields(user_id = %actor.user_id))]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<AccountQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ACCOUNT_LIST)?;
    Ok(ok(state.accounts.list(query).await?))
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ACCOUNT_DETAIL)?;
    Ok(ok(state.accounts.detail(id).await?))
}

#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id))]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<CreateAccountRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ACCOUNT_CREATE)?;
    Ok(ok(state.accounts.create(request).await?))
}

#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id, account_id = %id))]
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateAccountRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ACCOUNT_UPDATE)?;
    Ok(ok(state.accounts.update(id, request).await?))
}

#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id, account_id = %id))]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ACCOUNT_DELETE)?;
    state.accounts.delete(id).await?;
    Ok(ok(()))
}
