//! OpenAPI documentation generation using utoipa

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::web::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tabular Export API",
        description = "Chunked spreadsheet export service: JSON records in, \
            downloadable XLSX/CSV artifacts out, with ZIP packaging for large \
            exports and age-gated in-memory retention."
    ),
    paths(
        handlers::export::create_export,
        handlers::export::export_status,
        handlers::export::download_export,
        handlers::export::download_chunk,
        handlers::admin::run_cleanup,
        handlers::admin::storage_info,
    ),
    tags(
        (name = "export", description = "Export creation and download"),
        (name = "admin", description = "Registry maintenance")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document as JSON
pub async fn serve_openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
