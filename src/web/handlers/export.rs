//! Export HTTP handlers
//!
//! Thin controllers: parse path/body, delegate to the pipeline or registry,
//! map errors through the shared response envelope.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ExportError;
use crate::models::{ExportRequest, ExportStrategy, ExportType};
use crate::services::{ArchiveSummary, ChunkSummary, StoredExport};
use crate::web::responses::{file_download, handle_error, ApiResponse};
use crate::web::AppState;

/// Creation response body: the stored export plus download links
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportCreated {
    pub export_id: Uuid,
    pub export_type: String,
    pub strategy: ExportStrategy,
    pub record_count: u64,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_info: Option<ArchiveSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<ChunkDownload>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// One chunk with its individual download link
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChunkDownload {
    #[serde(flatten)]
    pub chunk: ChunkSummary,
    pub download_url: String,
}

fn created_body(base_url: &str, stored: StoredExport) -> ExportCreated {
    let download_url = format!("{base_url}/api/v1/export/{}/download", stored.export_id);
    let chunks = stored
        .chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| ChunkDownload {
            download_url: format!(
                "{base_url}/api/v1/export/{}/download/batch/{}",
                stored.export_id,
                i + 1
            ),
            chunk,
        })
        .collect();
    ExportCreated {
        export_id: stored.export_id,
        export_type: stored.export_type.to_string(),
        strategy: stored.strategy,
        record_count: stored.record_count,
        file_name: stored.file_name,
        file_size_bytes: stored.file_size_bytes,
        download_url,
        archive_info: stored.archive,
        chunks,
        expires_at: stored.expires_at,
    }
}

fn parse_export_type(raw: &str) -> Result<ExportType, ExportError> {
    raw.parse().map_err(|_| {
        ExportError::validation(format!(
            "unknown export type '{raw}' (expected participants, payments or ambassadors)"
        ))
    })
}

fn parse_export_id(raw: &str) -> Result<Uuid, ExportError> {
    Uuid::parse_str(raw).map_err(|_| ExportError::validation("export id must be a UUID"))
}

/// Create an export
#[utoipa::path(
    post,
    path = "/api/v1/export/{export_type}",
    tag = "export",
    request_body = ExportRequest,
    params(("export_type" = String, Path, description = "participants, payments or ambassadors")),
    responses(
        (status = 200, description = "Export created and stored"),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown template"),
        (status = 422, description = "Filter matched no records"),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn create_export(
    State(state): State<AppState>,
    Path(export_type): Path<String>,
    Json(request): Json<ExportRequest>,
) -> Response {
    let export_type = match parse_export_type(&export_type) {
        Ok(ty) => ty,
        Err(err) => return handle_error(err),
    };

    match state.pipeline.run(export_type, request).await {
        Ok(stored) => {
            info!(
                "Export {} created: {} {} records as {:?}",
                stored.export_id, export_type, stored.record_count, stored.strategy
            );
            let metrics = stored.metrics.clone();
            ApiResponse::success_with_metrics(created_body(&state.base_url, stored), metrics)
                .into_response()
        }
        Err(err) => handle_error(err),
    }
}

/// Status body served for a live export
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportStatus {
    pub export_id: Uuid,
    pub export_type: String,
    pub strategy: ExportStrategy,
    pub record_count: u64,
    pub file_name: String,
    pub total_size_bytes: u64,
    pub chunk_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub download_url: String,
    pub metrics: crate::models::ExportMetrics,
}

/// Look up a stored export
#[utoipa::path(
    get,
    path = "/api/v1/export/{export_id}/status",
    tag = "export",
    params(("export_id" = Uuid, Path, description = "Export id")),
    responses(
        (status = 200, description = "Export is live"),
        (status = 404, description = "Unknown or expired export")
    )
)]
pub async fn export_status(
    State(state): State<AppState>,
    Path(export_id): Path<String>,
) -> Response {
    let id = match parse_export_id(&export_id) {
        Ok(id) => id,
        Err(err) => return handle_error(err),
    };

    match state.registry.get(id).await {
        Ok(artifact) => {
            let chunk_count = match &artifact.payload {
                crate::models::ExportPayload::Single { .. } => 1,
                crate::models::ExportPayload::Chunked { chunks, .. } => chunks.len() as u64,
            };
            ApiResponse::success(ExportStatus {
                export_id: artifact.export_id,
                export_type: artifact.export_type.to_string(),
                strategy: artifact.strategy,
                record_count: artifact.record_count,
                file_name: artifact.download_name().to_string(),
                total_size_bytes: artifact.total_size_bytes(),
                chunk_count,
                created_at: artifact.created_at,
                expires_at: artifact.expires_at,
                download_url: format!(
                    "{}/api/v1/export/{}/download",
                    state.base_url, artifact.export_id
                ),
                metrics: artifact.metrics.clone(),
            })
            .into_response()
        }
        Err(err) => handle_error(err),
    }
}

/// Download the whole export (single file, or ZIP for chunked exports)
#[utoipa::path(
    get,
    path = "/api/v1/export/{export_id}/download",
    tag = "export",
    params(("export_id" = Uuid, Path, description = "Export id")),
    responses(
        (status = 200, description = "File bytes with attachment disposition"),
        (status = 404, description = "Unknown or expired export")
    )
)]
pub async fn download_export(
    State(state): State<AppState>,
    Path(export_id): Path<String>,
) -> Response {
    let id = match parse_export_id(&export_id) {
        Ok(id) => id,
        Err(err) => return handle_error(err),
    };
    match state.registry.download_whole(id).await {
        Ok((name, data)) => file_download(&name, data),
        Err(err) => handle_error(err),
    }
}

/// Download one chunk of a multi-file export by 1-based index
#[utoipa::path(
    get,
    path = "/api/v1/export/{export_id}/download/batch/{chunk}",
    tag = "export",
    params(
        ("export_id" = Uuid, Path, description = "Export id"),
        ("chunk" = u64, Path, description = "1-based chunk index")
    ),
    responses(
        (status = 200, description = "Chunk file bytes"),
        (status = 404, description = "Unknown export, expired export, or chunk out of range")
    )
)]
pub async fn download_chunk(
    State(state): State<AppState>,
    Path((export_id, chunk)): Path<(String, u64)>,
) -> Response {
    let id = match parse_export_id(&export_id) {
        Ok(id) => id,
        Err(err) => return handle_error(err),
    };
    match state.registry.download_chunk(id, chunk).await {
        Ok((name, data)) => file_download(&name, data),
        Err(err) => handle_error(err),
    }
}
