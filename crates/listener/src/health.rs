//! Liveness endpoint.

use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Returns 200 OK while the server is running.
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
