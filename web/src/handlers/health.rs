//! Liveness and readiness endpoints.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `false` when not ready
    pub success: bool,
    /// `"ok"` or `"unavailable"`
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
}

/// `GET /health`: the process is up. Does not touch dependencies.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            success: true,
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// `GET /ready`: 200 when the database answers, 503 otherwise.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.readiness.check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                success: true,
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    success: false,
                    status: "unavailable",
                    version: env!("CARGO_PKG_VERSION"),
                }),
            )
        }
    }
}
