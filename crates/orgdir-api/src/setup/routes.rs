//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post, put},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::auth_middleware;
use crate::handlers;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";
const MAX_BODY_BYTES: usize = 64 * 1024;
const CONCURRENCY_LIMIT: usize = 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.authorizer.clone(),
        auth_middleware,
    ));

    public_routes()
        .merge(protected)
        .layer(ConcurrencyLimitLayer::new(CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(&format!("{}/auth/login", API_PREFIX), post(handlers::auth::login))
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/auth/orgs", API_PREFIX), get(handlers::auth::list_orgs))
        .route(
            &format!("{}/auth/select-org", API_PREFIX),
            post(handlers::auth::select_org),
        )
        .route(&format!("{}/auth/me", API_PREFIX), get(handlers::auth::me))
        .route(
            &format!("{}/accounts", API_PREFIX),
            get(handlers::accounts::list_accounts).post(handlers::accounts::create_account),
        )
        .route(
            &format!("{}/accounts/{{id}}", API_PREFIX),
            get(handlers::accounts::get_account)
                .put(handlers::accounts::update_account)
                .delete(handlers::accounts::delete_account),
        )
        .route(
            &format!("{}/orgs", API_PREFIX),
            get(handlers::organizations::list_organizations)
                .post(handlers::organizations::create_organization),
        )
        .route(
            &format!("{}/orgs/{{id}}", API_PREFIX),
            get(handlers::organizations::get_organization)
                .put(handlers::organizations::update_organization)
                .delete(handlers::organizations::delete_organization),
        )
        .route(
            &format!("{}/members", API_PREFIX),
            get(handlers::members::list_members).post(handlers::members::add_member),
        )
        .route(
            &format!("{}/members/{{user_id}}", API_PREFIX),
            put(handlers::members::update_member),
        )
}
