//! HTTP handlers. Successful responses use the `{code: 0, message: "ok", data}`
//! envelope; failures go through [`HttpAppError`](crate::error::HttpAppError).

pub mod accounts;
pub mod auth;
pub mod health;
pub mod members;
pub mod organizations;

use axum::Json;
use orgdir_core::ErrorCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: &'static str,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: ErrorCode::Succeed.as_i32(),
        message: ErrorCode::Succeed.message(),
        data,
    })
}
