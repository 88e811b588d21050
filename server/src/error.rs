//! Wraps `subsim_shared::ApiError` in an axum-facing type, since neither the
//! trait nor the error type lives in this crate and Rust won't let us
//! `impl IntoResponse for ApiError` directly (orphan rule). Mirrors the
//! source's route-level `jsonify({"ok": False, "error": ...}), status`
//! returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use subsim_shared::ApiError;

pub struct AppError(pub ApiError);

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "ok": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
