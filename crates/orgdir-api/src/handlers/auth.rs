//! Login, tenant selection and self lookup.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::ok;
use crate::auth::Actor;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub account: String,
    /// Transport-encrypted password.
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectOrgRequest {
    pub org_id: Uuid,
}

#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let issued = state
        .authorizer
        .password_login(request.account.trim(), &request.password)
        .await?;
    Ok(ok(issued))
}

pub async fn list_orgs(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<impl IntoResponse, HttpAppError> {
    let grants = state.authorizer.list_orgs(&actor).await?;
    Ok(ok(grants))
}

pub async fn select_org(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<SelectOrgRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let issued = state.authorizer.select_org(&actor, request.org_id).await?;
    Ok(ok(issued))
}

pub async fn me(actor: Actor) -> impl IntoResponse {
    ok(actor)
}
