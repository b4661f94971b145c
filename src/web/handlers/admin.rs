//! Admin HTTP handlers: manual cleanup and storage introspection

use axum::{extract::State, response::IntoResponse};
use tracing::info;

use crate::web::responses::ApiResponse;
use crate::web::AppState;

/// Run a registry cleanup pass immediately
#[utoipa::path(
    post,
    path = "/api/v1/cleanup",
    tag = "admin",
    responses((status = 200, description = "Cleanup report", body = crate::services::CleanupReport))
)]
pub async fn run_cleanup(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.registry.run_cleanup().await;
    info!(
        "Manual cleanup: {} expired, {} evicted, {} remain",
        report.expired_removed, report.capacity_evicted, report.remaining
    );
    ApiResponse::success(report)
}

/// Current registry storage figures
#[utoipa::path(
    get,
    path = "/api/v1/storage/info",
    tag = "admin",
    responses((status = 200, description = "Storage info", body = crate::services::StorageInfo))
)]
pub async fn storage_info(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(state.registry.storage_info().await)
}
