use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use orgdir_core::AppError;

use super::authorizer::TenantAuthorizer;
use crate::error::HttpAppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Resolve the bearer token into an [`Actor`](super::models::Actor) and store
/// it in the request extensions. Nothing downstream runs on failure.
pub async fn auth_middleware(
    State(authorizer): State<Arc<TenantAuthorizer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix(BEARER_PREFIX) else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match authorizer.resolve_actor(token.trim()).await {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
