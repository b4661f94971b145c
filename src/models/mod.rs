//! Core data model for the export pipeline
//!
//! Request types deserialized at the web boundary, the chunk plan produced
//! by the planner, and the immutable `ExportArtifact` owned by the registry.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod templates;

pub use templates::{Template, TemplateRegistry};

/// A raw input record: field name -> JSON value
pub type RawRecord = HashMap<String, serde_json::Value>;

/// The record categories this service knows how to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Participants,
    Payments,
    Ambassadors,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participants => "participants",
            Self::Payments => "payments",
            Self::Ambassadors => "ambassadors",
        }
    }
}

impl std::fmt::Display for ExportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participants" => Ok(Self::Participants),
            "payments" => Ok(Self::Payments),
            "ambassadors" => Ok(Self::Ambassadors),
            other => Err(format!("unknown export type '{other}'")),
        }
    }
}

/// Output format, selecting the spreadsheet writer and file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// Filter spec handed to the data source when a request carries no inline
/// records. Interpretation of `criteria` is owned by the data source.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct FilterSpec {
    #[serde(default)]
    pub criteria: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Body of `POST /export/{export_type}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExportRequest {
    /// Inline records to export; mutually exclusive with `filter`
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<RawRecord>,
    /// Filter spec resolved through the configured data source
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    /// Template name, resolved against the export type
    pub template: String,
    #[serde(default)]
    pub format: ExportFormat,
    /// Optional base filename override (extension is appended)
    #[serde(default)]
    pub filename: Option<String>,
    /// Optional worksheet name override
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub force_chunking: bool,
    /// Optional chunk size override; must be positive when present
    #[serde(default)]
    pub chunk_size: Option<u64>,
}

/// Whether an export produced one file or a set of chunk files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExportStrategy {
    SingleFile,
    MultiFile,
}

/// Output of the chunk planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub strategy: ExportStrategy,
    /// Records per chunk; equals the record count for single-file plans
    pub chunk_size: u64,
    pub chunk_count: u64,
}

/// One independently downloadable chunk file of a multi-file export
#[derive(Debug, Clone)]
pub struct ChunkFile {
    pub file_name: String,
    pub data: Bytes,
    /// 1-based inclusive record range this chunk covers
    pub record_range: (u64, u64),
    pub size_bytes: u64,
    pub processing_ms: u64,
}

/// The binary result of one pipeline run
#[derive(Debug, Clone)]
pub enum ExportPayload {
    Single {
        file_name: String,
        data: Bytes,
    },
    Chunked {
        chunks: Vec<ChunkFile>,
        archive_name: String,
        archive: Bytes,
        total_uncompressed: u64,
        compressed: u64,
    },
}

/// Performance figures accumulated during processing, never re-derived later
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportMetrics {
    pub total_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub per_chunk_ms: Vec<u64>,
    pub records_per_second: f64,
    /// Rough in-memory footprint of the stored payload
    pub memory_estimate_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
}

/// Stored result of one successful export run
///
/// Immutable once stored; exclusively owned by the `ExportRegistry` and
/// destroyed only by its cleanup policy or expiry.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub export_id: Uuid,
    pub export_type: ExportType,
    pub strategy: ExportStrategy,
    pub payload: ExportPayload,
    pub record_count: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metrics: ExportMetrics,
}

impl ExportArtifact {
    /// Bytes held in memory for this artifact (chunks + archive)
    pub fn total_size_bytes(&self) -> u64 {
        match &self.payload {
            ExportPayload::Single { data, .. } => data.len() as u64,
            ExportPayload::Chunked {
                chunks, archive, ..
            } => chunks.iter().map(|c| c.data.len() as u64).sum::<u64>() + archive.len() as u64,
        }
    }

    /// Name of the blob served by a whole-file download
    pub fn download_name(&self) -> &str {
        match &self.payload {
            ExportPayload::Single { file_name, .. } => file_name,
            ExportPayload::Chunked { archive_name, .. } => archive_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_type_round_trips_through_str() {
        for ty in [
            ExportType::Participants,
            ExportType::Payments,
            ExportType::Ambassadors,
        ] {
            let parsed: ExportType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
        assert!("certificates".parse::<ExportType>().is_err());
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: ExportRequest = serde_json::from_str(
            r#"{"template": "standard", "data": [{"id": 1, "name": "Ada"}]}"#,
        )
        .unwrap();
        assert_eq!(request.format, ExportFormat::Excel);
        assert!(!request.force_chunking);
        assert!(request.chunk_size.is_none());
        assert_eq!(request.data.len(), 1);
    }
}
