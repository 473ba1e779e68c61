//! Membership management within the actor's selected organization.

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
use crate::services::members::{AddMemberRequest, MemberQuery, UpdateMemberRequest};
use crate::state::AppState;

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<MemberQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let org_id = actor.org()?;
    state.authorizer.authorize(&actor, Some(scope::MEMBER_LIST))?;
    Ok(ok(state.members.list(org_id, query).await?))
}

#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id))]
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<AddMemberRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let org_id = actor.org()?;
    state.authorizer.authorize(&actor, Some(scope::MEMBER_CREATE))?;
    Ok(ok(state.members.add(org_id, request).await?))
}

#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id, member_id = %user_id))]
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateMemberRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let org_id = actor.org()?;
    state.authorizer.authorize(&actor, Some(scope::MEMBER_UPDATE))?;
    Ok(ok(state.members.update(&actor, org_id, user_id, request).await?))
}
