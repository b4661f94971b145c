//! Health check HTTP handlers

use axum::{extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::web::responses::ApiResponse;
use crate::web::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub artifacts_stored: usize,
}

/// Health check with registry status and uptime
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let info = state.registry.storage_info().await;
    ApiResponse::success(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (chrono::Utc::now() - state.start_time).num_seconds(),
        artifacts_stored: info.artifact_count,
    })
}

/// Liveness probe: answers as soon as the router is up
pub async fn liveness() -> impl IntoResponse {
    ApiResponse::success(serde_json::json!({ "alive": true }))
}
