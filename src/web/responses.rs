//! HTTP response types and error mapping
//!
//! Every JSON endpoint answers with the same envelope: a `status` field of
//! `"success"` or `"error"`, the payload under `data`, and on failure a
//! human-readable `message` plus the stable `error_code` from the error
//! taxonomy. Download endpoints answer with raw bytes instead.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::errors::ExportError;
use crate::models::ExportMetrics;

/// Envelope for successful JSON responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `"success"`
    pub status: &'static str,
    pub data: T,
    /// Processing figures, present on export creation responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<ExportMetrics>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
            performance_metrics: None,
        }
    }

    pub fn success_with_metrics(data: T, metrics: ExportMetrics) -> Self {
        Self {
            status: "success",
            data,
            performance_metrics: Some(metrics),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Envelope for error responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiErrorBody {
    /// Always `"error"`
    pub status: &'static str,
    pub message: String,
    /// Stable machine-readable code, one per error variant
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

/// Map an `ExportError` to its HTTP status and JSON body.
pub fn handle_error(error: ExportError) -> Response {
    let status = match &error {
        ExportError::Validation { .. } => StatusCode::BAD_REQUEST,
        ExportError::TemplateNotFound { .. } => StatusCode::NOT_FOUND,
        ExportError::DataSource { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ExportError::Generation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ExportError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ExportError::NotFound { .. } => StatusCode::NOT_FOUND,
    };
    let details = match &error {
        ExportError::Validation { details, .. } if !details.is_empty() => Some(details.clone()),
        _ => None,
    };
    let body = ApiErrorBody {
        status: "error",
        message: error.to_string(),
        error_code: error.error_code(),
        details,
    };
    (status, Json(body)).into_response()
}

/// MIME type for a download by file extension; binary fallback otherwise.
fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("csv") => "text/csv; charset=utf-8",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Build a file download response with attachment disposition.
pub fn file_download(file_name: &str, data: Bytes) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
            (header::CONTENT_LENGTH, data.len().to_string()),
        ],
        data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extension() {
        assert!(content_type_for("report.xlsx").contains("spreadsheetml"));
        assert!(content_type_for("report.csv").starts_with("text/csv"));
        assert_eq!(content_type_for("bundle.zip"), "application/zip");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }

    #[test]
    fn error_statuses_match_taxonomy() {
        let cases = [
            (ExportError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                ExportError::TemplateNotFound {
                    export_type: "participants".into(),
                    template: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ExportError::data_source("none"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ExportError::generation("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ExportError::ServiceUnavailable {
                    message: "down".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(handle_error(error).status(), expected);
        }
    }
}
