//! Organization management, restricted to the platform admin organization.

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
use crate::services::organizations::{
    CreateOrganizationRequest, OrganizationQuery, UpdateOrganizationRequest,
};
use crate::state::AppState;

fn gate(state: &AppState, actor: &Actor, required: &str) -> Result<(), HttpAppError> {
    actor.require_platform_admin()?;
    state.authorizer.authorize(actor, Some(required))?;
    Ok(())
}

pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<OrganizationQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ORG_LIST)?;
    Ok(ok(state.organizations.list(query).await?))
}

pub async fn get_organization(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ORG_DETAIL)?;
    Ok(ok(state.organizations.detail(id).await?))
}

#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id))]
pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ORG_CREATE)?;
    Ok(ok(state.organizations.create(request).await?))
}

#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id, org_id = %id))]
pub async fn update_organization(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateOrganizationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ORG_UPDATE)?;
    Ok(ok(state.organizations.update(id, request).await?))
}

#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id, org_id = %id))]
pub async fn delete_organization(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    gate(&state, &actor, scope::ORG_DELETE)?;
    state.organizations.delete(id).await?;
    Ok(ok(()))
}
