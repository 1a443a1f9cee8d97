/*
 * Responsibility
 * - GET /health (liveness)
 * - Public endpoint; also handy for verifying which middleware a request passes
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
