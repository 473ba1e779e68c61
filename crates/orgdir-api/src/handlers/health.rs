use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Liveness plus a bounded database round trip.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let check = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.pool);
    let database = database_status(tokio::time::timeout(CHECK_TIMEOUT, check).await.ok());

    let status = if database == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
            "database": database,
        })),
    )
}

/// `None` means the check timed out. Store errors are logged, never returned.
fn database_status<T, E: Display>(outcome: Option<Result<T, E>>) -> &'static str {
    match outcome {
        Some(Ok(_)) => "healthy",
        Some(Err(e)) => {
            tracing::error!(error = %e, "Health check query failed");
            "unhealthy"
        }
        None => "timeout",
    }
}
