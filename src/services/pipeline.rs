//! Export pipeline
//!
//! Orchestrates one export end to end: validate the request, resolve
//! records (inline or through the data source), plan chunking, transform
//! and write each chunk in order, package multi-file results into a ZIP
//! and hand the finished artifact to the registry. A failure at any point
//! stores nothing.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::errors::{ExportError, ExportResult};
use crate::models::{
    ChunkFile, ChunkPlan, ExportArtifact, ExportFormat, ExportMetrics, ExportPayload,
    ExportRequest, ExportStrategy, ExportType, RawRecord, Template, TemplateRegistry,
};
use crate::services::planner::ChunkPlanner;
use crate::services::registry::ExportRegistry;
use crate::services::transformer::RecordTransformer;
use crate::sources::DataSource;
use crate::utils::{validate_filename, validate_sheet_name};
use crate::writers::{pack_archive, WriterSet};

/// Summary of one chunk returned to the API client
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChunkSummary {
    pub file_name: String,
    /// 1-based inclusive record range
    pub record_range: (u64, u64),
    pub size_bytes: u64,
    pub processing_ms: u64,
}

/// Archive figures for a multi-file export
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArchiveSummary {
    pub archive_name: String,
    pub total_files: u64,
    pub total_uncompressed_size: u64,
    pub compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
}

/// API-facing result of a successful export run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredExport {
    pub export_id: Uuid,
    pub export_type: ExportType,
    pub strategy: ExportStrategy,
    pub record_count: u64,
    pub file_name: String,
    pub file_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<ChunkSummary>,
    pub metrics: ExportMetrics,
    pub expires_at: chrono::DateTime<Utc>,
}

pub struct ExportPipeline {
    templates: TemplateRegistry,
    registry: Arc<ExportRegistry>,
    writers: WriterSet,
    data_source: Option<Arc<dyn DataSource>>,
    planner: ChunkPlanner,
    zip_compression_level: u32,
}

impl ExportPipeline {
    pub fn new(
        templates: TemplateRegistry,
        registry: Arc<ExportRegistry>,
        writers: WriterSet,
        data_source: Option<Arc<dyn DataSource>>,
        export_config: &ExportConfig,
    ) -> Self {
        Self {
            templates,
            registry,
            writers,
            data_source,
            planner: ChunkPlanner::new(export_config),
            zip_compression_level: export_config.zip_compression_level,
        }
    }

    pub fn registry(&self) -> &Arc<ExportRegistry> {
        &self.registry
    }

    /// Run one export request to completion.
    pub async fn run(
        &self,
        export_type: ExportType,
        request: ExportRequest,
    ) -> ExportResult<StoredExport> {
        let started = Instant::now();

        let template = self.resolve_template(export_type, &request.template)?;
        let records = self.resolve_records(export_type, &request)?;
        let record_count = records.len() as u64;

        let plan = self.planner.decide(
            record_count,
            template,
            request.force_chunking,
            request.chunk_size,
        )?;

        let base_name = self.resolve_base_name(export_type, &request, template)?;
        let sheet_name = self.resolve_sheet_name(export_type, &request)?;

        info!(
            "Export {} start: {} records, {} template '{}', {:?}, {} chunk(s)",
            export_type, record_count, request.format.extension(), template.name,
            plan.strategy, plan.chunk_count
        );

        let payload = match plan.strategy {
            ExportStrategy::SingleFile => self.process_single(
                &records,
                template,
                export_type,
                request.format,
                &base_name,
                &sheet_name,
            )?,
            ExportStrategy::MultiFile => self.process_chunked(
                &records,
                template,
                export_type,
                request.format,
                &base_name,
                &sheet_name,
                &plan,
            )?,
        };

        let total_ms = started.elapsed().as_millis() as u64;
        let metrics = build_metrics(&payload, record_count, total_ms);

        let artifact = ExportArtifact {
            export_id: Uuid::new_v4(),
            export_type,
            strategy: plan.strategy,
            payload,
            record_count,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            metrics,
        };

        let id = self.registry.store(artifact).await;
        // Read back so the summary carries the expiry the registry assigned.
        let stored = self.registry.get(id).await?;
        debug!("Export {} stored in {}ms", id, total_ms);
        Ok(summarize(&stored))
    }

    fn resolve_template(
        &self,
        export_type: ExportType,
        name: &str,
    ) -> ExportResult<&Template> {
        self.templates.get(export_type, name).ok_or_else(|| {
            debug!(
                "Unknown template '{}' for '{}', available: {:?}",
                name,
                export_type,
                self.templates.names_for(export_type)
            );
            ExportError::TemplateNotFound {
                export_type: export_type.to_string(),
                template: name.to_string(),
            }
        })
    }

    /// Resolve the record set: inline data wins; otherwise the filter goes
    /// through the data source in pages. Zero rows is always an error.
    fn resolve_records(
        &self,
        export_type: ExportType,
        request: &ExportRequest,
    ) -> ExportResult<Vec<RawRecord>> {
        if !request.data.is_empty() {
            return Ok(request.data.clone());
        }

        let Some(filter) = &request.filter else {
            return Err(ExportError::validation(
                "request must carry inline data or a filter",
            ));
        };
        let Some(source) = &self.data_source else {
            return Err(ExportError::ServiceUnavailable {
                message: "no data source is configured for filter-based exports".to_string(),
            });
        };

        let total = source.count(export_type, filter)?;
        if total == 0 {
            return Err(ExportError::data_source(format!(
                "filter matched no {export_type} records"
            )));
        }

        // Page through the source; page size bounded so a large filter never
        // asks for everything in one call.
        const PAGE_SIZE: u64 = 5_000;
        let mut records = Vec::with_capacity(total as usize);
        let mut offset = 0;
        while offset < total {
            let page = source.fetch(export_type, filter, offset, PAGE_SIZE)?;
            if page.is_empty() {
                break;
            }
            offset += page.len() as u64;
            records.extend(page);
        }
        if records.is_empty() {
            return Err(ExportError::data_source(format!(
                "filter matched no {export_type} records"
            )));
        }
        Ok(records)
    }

    fn resolve_base_name(
        &self,
        export_type: ExportType,
        request: &ExportRequest,
        template: &Template,
    ) -> ExportResult<String> {
        match &request.filename {
            Some(name) => {
                validate_filename(name).map_err(|reason| {
                    ExportError::validation_with_details(
                        "invalid filename",
                        std::collections::HashMap::from([("filename".to_string(), reason)]),
                    )
                })?;
                Ok(name.trim().to_string())
            }
            None => Ok(format!(
                "{}_{}_{}",
                export_type,
                template.name,
                Utc::now().format("%Y%m%d_%H%M%S")
            )),
        }
    }

    fn resolve_sheet_name(
        &self,
        export_type: ExportType,
        request: &ExportRequest,
    ) -> ExportResult<String> {
        match &request.sheet_name {
            Some(name) => validate_sheet_name(name).map_err(|reason| {
                ExportError::validation_with_details(
                    "invalid sheet name",
                    std::collections::HashMap::from([("sheet_name".to_string(), reason)]),
                )
            }),
            None => {
                let mut name = export_type.as_str().to_string();
                if let Some(first) = name.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                Ok(name)
            }
        }
    }

    fn process_single(
        &self,
        records: &[RawRecord],
        template: &Template,
        export_type: ExportType,
        format: ExportFormat,
        base_name: &str,
        sheet_name: &str,
    ) -> ExportResult<ExportPayload> {
        let rows = RecordTransformer::transform(records, template, export_type);
        let writer = self.writers.for_format(format);
        let blob = writer
            .write(&template.headers, &rows, sheet_name)
            .map_err(|err| ExportError::Generation {
                message: err.to_string(),
                record_range: Some((1, records.len() as u64)),
            })?;

        Ok(ExportPayload::Single {
            file_name: format!("{base_name}.{}", format.extension()),
            data: Bytes::from(blob),
        })
    }

    /// Write every chunk in record order, then package them into one ZIP.
    /// A failing chunk aborts the whole export with its record range.
    #[allow(clippy::too_many_arguments)]
    fn process_chunked(
        &self,
        records: &[RawRecord],
        template: &Template,
        export_type: ExportType,
        format: ExportFormat,
        base_name: &str,
        sheet_name: &str,
        plan: &ChunkPlan,
    ) -> ExportResult<ExportPayload> {
        let ranges = ChunkPlanner::chunk_ranges(records.len() as u64, plan.chunk_size);
        let writer = self.writers.for_format(format);
        let mut chunks = Vec::with_capacity(ranges.len());

        for (index, (start, end)) in ranges.iter().enumerate() {
            let chunk_started = Instant::now();
            let slice = &records[(*start - 1) as usize..*end as usize];
            let rows = RecordTransformer::transform(slice, template, export_type);
            let blob = writer
                .write(&template.headers, &rows, sheet_name)
                .map_err(|err| ExportError::Generation {
                    message: format!("chunk {} failed: {err}", index + 1),
                    record_range: Some((*start, *end)),
                })?;

            let processing_ms = chunk_started.elapsed().as_millis() as u64;
            debug!(
                "Chunk {}/{} written: records {}-{}, {} bytes, {}ms",
                index + 1,
                ranges.len(),
                start,
                end,
                blob.len(),
                processing_ms
            );
            chunks.push(ChunkFile {
                file_name: format!(
                    "{base_name}_part{:03}.{}",
                    index + 1,
                    format.extension()
                ),
                size_bytes: blob.len() as u64,
                data: Bytes::from(blob),
                record_range: (*start, *end),
                processing_ms,
            });
        }

        let total_uncompressed: u64 = chunks.iter().map(|c| c.size_bytes).sum();
        let archive = pack_archive(&chunks, self.zip_compression_level)
            .map_err(|err| ExportError::generation(format!("archive packaging failed: {err}")))?;
        let compressed = archive.len() as u64;

        Ok(ExportPayload::Chunked {
            chunks,
            archive_name: format!("{base_name}.zip"),
            archive: Bytes::from(archive),
            total_uncompressed,
            compressed,
        })
    }
}

fn build_metrics(payload: &ExportPayload, record_count: u64, total_ms: u64) -> ExportMetrics {
    let elapsed_secs = (total_ms as f64 / 1000.0).max(0.001);
    let (per_chunk_ms, memory_estimate_bytes, compression_ratio) = match payload {
        ExportPayload::Single { data, .. } => (Vec::new(), data.len() as u64, None),
        ExportPayload::Chunked {
            chunks,
            archive,
            total_uncompressed,
            compressed,
            ..
        } => {
            let ratio = if *total_uncompressed > 0 {
                Some((*total_uncompressed as f64 - *compressed as f64) / *total_uncompressed as f64)
            } else {
                None
            };
            let memory: u64 =
                chunks.iter().map(|c| c.data.len() as u64).sum::<u64>() + archive.len() as u64;
            (
                chunks.iter().map(|c| c.processing_ms).collect(),
                memory,
                ratio,
            )
        }
    };

    ExportMetrics {
        total_ms,
        per_chunk_ms,
        records_per_second: record_count as f64 / elapsed_secs,
        memory_estimate_bytes,
        compression_ratio,
    }
}

fn summarize(artifact: &ExportArtifact) -> StoredExport {
    let (file_name, file_size_bytes, archive, chunks) = match &artifact.payload {
        ExportPayload::Single { file_name, data } => {
            (file_name.clone(), data.len() as u64, None, Vec::new())
        }
        ExportPayload::Chunked {
            chunks,
            archive_name,
            archive,
            total_uncompressed,
            compressed,
        } => {
            let summaries = chunks
                .iter()
                .map(|c| ChunkSummary {
                    file_name: c.file_name.clone(),
                    record_range: c.record_range,
                    size_bytes: c.size_bytes,
                    processing_ms: c.processing_ms,
                })
                .collect();
            let summary = ArchiveSummary {
                archive_name: archive_name.clone(),
                total_files: chunks.len() as u64,
                total_uncompressed_size: *total_uncompressed,
                compressed_size: *compressed,
                compression_ratio: artifact.metrics.compression_ratio,
            };
            (
                archive_name.clone(),
                archive.len() as u64,
                Some(summary),
                summaries,
            )
        }
    };

    StoredExport {
        export_id: artifact.export_id,
        export_type: artifact.export_type,
        strategy: artifact.strategy,
        record_count: artifact.record_count,
        file_name,
        file_size_bytes,
        archive,
        chunks,
        metrics: artifact.metrics.clone(),
        expires_at: artifact.expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportConfig, RetentionConfig};
    use crate::sources::StaticDataSource;
    use serde_json::json;
    use std::collections::HashMap;

    fn pipeline(data_source: Option<Arc<dyn DataSource>>) -> ExportPipeline {
        let registry = Arc::new(ExportRegistry::new(RetentionConfig::default()));
        ExportPipeline::new(
            TemplateRegistry::builtin().unwrap(),
            registry,
            WriterSet::new(),
            data_source,
            &ExportConfig::default(),
        )
    }

    fn participant(id: u64, first: &str, last: &str) -> RawRecord {
        HashMap::from([
            ("id".to_string(), json!(id)),
            ("first_name".to_string(), json!(first)),
            ("last_name".to_string(), json!(last)),
            ("email".to_string(), json!(format!("{first}@example.com"))),
            ("phone".to_string(), json!("555-0100")),
            ("registration_date".to_string(), json!("2026-08-01")),
            ("status".to_string(), json!(1)),
        ])
    }

    fn request(data: Vec<RawRecord>) -> ExportRequest {
        ExportRequest {
            data,
            filter: None,
            template: "standard".to_string(),
            format: ExportFormat::Csv,
            filename: Some("export_test".to_string()),
            sheet_name: None,
            force_chunking: false,
            chunk_size: None,
        }
    }

    #[tokio::test]
    async fn small_export_becomes_a_single_csv() {
        let pipeline = pipeline(None);
        let records = vec![
            participant(1, "Ada", "Lovelace"),
            participant(2, "Grace", "Hopper"),
            participant(3, "Edsger", "Dijkstra"),
        ];
        let result = pipeline
            .run(ExportType::Participants, request(records))
            .await
            .unwrap();

        assert_eq!(result.strategy, ExportStrategy::SingleFile);
        assert_eq!(result.record_count, 3);
        assert_eq!(result.file_name, "export_test.csv");
        assert!(result.archive.is_none());
        assert!(result.chunks.is_empty());

        let (_, data) = pipeline
            .registry()
            .download_whole(result.export_id)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&data);
        assert!(text.contains("First Name"));
        assert!(text.contains("Ada"));
        // Header row plus three data rows
        assert_eq!(text.lines().count(), 4);
    }

    #[tokio::test]
    async fn large_export_is_chunked_in_order() {
        let pipeline = pipeline(None);
        let records: Vec<RawRecord> = (1..=12_000)
            .map(|i| participant(i, "Person", "Test"))
            .collect();
        let result = pipeline
            .run(ExportType::Participants, request(records))
            .await
            .unwrap();

        assert_eq!(result.strategy, ExportStrategy::MultiFile);
        assert_eq!(result.chunks.len(), 3);
        assert_eq!(result.chunks[0].record_range, (1, 4_000));
        assert_eq!(result.chunks[1].record_range, (4_001, 8_000));
        assert_eq!(result.chunks[2].record_range, (8_001, 12_000));
        assert_eq!(result.chunks[1].file_name, "export_test_part002.csv");
        assert_eq!(result.file_name, "export_test.zip");

        let archive = result.archive.unwrap();
        assert_eq!(archive.total_files, 3);
        assert!(archive.compressed_size < archive.total_uncompressed_size);

        // The middle chunk really holds records 4001-8000
        let (name, data) = pipeline
            .registry()
            .download_chunk(result.export_id, 2)
            .await
            .unwrap();
        assert_eq!(name, "export_test_part002.csv");
        let text = String::from_utf8_lossy(&data);
        assert!(text.contains("4001"));
        assert!(text.contains("8000"));
        assert!(!text.contains("8001"));
    }

    fn csv_data_lines(blob: &[u8]) -> Vec<String> {
        // Skip the UTF-8 BOM and the header row
        String::from_utf8_lossy(&blob[3..])
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn concatenated_chunks_match_single_file_order() {
        let records: Vec<RawRecord> = (1..=10)
            .map(|i| participant(i, &format!("Person{i}"), "Test"))
            .collect();

        let single = pipeline(None);
        let result = single
            .run(ExportType::Participants, request(records.clone()))
            .await
            .unwrap();
        assert_eq!(result.strategy, ExportStrategy::SingleFile);
        let (_, blob) = single
            .registry()
            .download_whole(result.export_id)
            .await
            .unwrap();
        let single_rows = csv_data_lines(&blob);
        assert_eq!(single_rows.len(), 10);

        let chunked = pipeline(None);
        let mut req = request(records);
        req.force_chunking = true;
        req.chunk_size = Some(3);
        let result = chunked
            .run(ExportType::Participants, req)
            .await
            .unwrap();
        assert_eq!(result.strategy, ExportStrategy::MultiFile);
        assert_eq!(result.chunks.len(), 4);

        let mut chunked_rows = Vec::new();
        for n in 1..=result.chunks.len() as u64 {
            let (_, blob) = chunked
                .registry()
                .download_chunk(result.export_id, n)
                .await
                .unwrap();
            chunked_rows.extend(csv_data_lines(&blob));
        }
        assert_eq!(chunked_rows, single_rows);
    }

    #[tokio::test]
    async fn unknown_template_stores_nothing() {
        let pipeline = pipeline(None);
        let mut req = request(vec![participant(1, "Ada", "Lovelace")]);
        req.template = "does_not_exist".to_string();

        let err = pipeline
            .run(ExportType::Participants, req)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "TEMPLATE_NOT_FOUND");
        assert_eq!(pipeline.registry().storage_info().await.artifact_count, 0);
    }

    #[tokio::test]
    async fn filter_requests_resolve_through_the_data_source() {
        let rows: Vec<RawRecord> = (1..=5).map(|i| participant(i, "Filt", "Ered")).collect();
        let source = StaticDataSource::new().with_rows(ExportType::Participants, rows);
        let pipeline = pipeline(Some(Arc::new(source)));

        let mut req = request(Vec::new());
        req.filter = Some(crate::models::FilterSpec::default());
        let result = pipeline
            .run(ExportType::Participants, req)
            .await
            .unwrap();
        assert_eq!(result.record_count, 5);
    }

    #[tokio::test]
    async fn empty_filter_result_is_a_data_source_error() {
        let source = StaticDataSource::new();
        let pipeline = pipeline(Some(Arc::new(source)));

        let mut req = request(Vec::new());
        req.filter = Some(crate::models::FilterSpec::default());
        let err = pipeline
            .run(ExportType::Participants, req)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DATA_SOURCE_ERROR");
    }

    #[tokio::test]
    async fn missing_data_and_filter_is_a_validation_error() {
        let pipeline = pipeline(None);
        let err = pipeline
            .run(ExportType::Participants, request(Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn zero_chunk_size_override_is_rejected() {
        let pipeline = pipeline(None);
        let mut req = request(vec![participant(1, "Ada", "Lovelace")]);
        req.force_chunking = true;
        req.chunk_size = Some(0);
        let err = pipeline
            .run(ExportType::Participants, req)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn bad_filename_is_rejected_before_processing() {
        let pipeline = pipeline(None);
        let mut req = request(vec![participant(1, "Ada", "Lovelace")]);
        req.filename = Some("../escape".to_string());
        let err = pipeline
            .run(ExportType::Participants, req)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(pipeline.registry().storage_info().await.artifact_count, 0);
    }

    #[tokio::test]
    async fn default_names_carry_type_and_template() {
        let pipeline = pipeline(None);
        let mut req = request(vec![participant(1, "Ada", "Lovelace")]);
        req.filename = None;
        let result = pipeline
            .run(ExportType::Participants, req)
            .await
            .unwrap();
        assert!(result.file_name.starts_with("participants_standard_"));
        assert!(result.file_name.ends_with(".csv"));
    }
}
