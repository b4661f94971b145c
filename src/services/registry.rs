//! In-memory artifact registry
//!
//! Owns every finished export until retention expiry or capacity eviction
//! removes it. All state sits behind a single `RwLock`; every public method
//! takes the lock exactly once, so callers can never observe a half-applied
//! cleanup pass.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::RetentionConfig;
use crate::errors::{ExportError, ExportResult};
use crate::models::{ExportArtifact, ExportPayload};

/// Aggregate view of what the registry currently holds
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StorageInfo {
    pub artifact_count: usize,
    pub total_bytes: u64,
    pub total_bytes_human: String,
    pub max_artifacts: usize,
    pub retention_period_secs: u64,
}

/// Outcome of a cleanup pass
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct CleanupReport {
    pub expired_removed: usize,
    pub capacity_evicted: usize,
    pub remaining: usize,
}

#[derive(Default)]
struct RegistryInner {
    artifacts: HashMap<Uuid, ExportArtifact>,
    last_cleanup: Option<Instant>,
}

pub struct ExportRegistry {
    inner: RwLock<RegistryInner>,
    retention: RetentionConfig,
}

impl ExportRegistry {
    pub fn new(retention: RetentionConfig) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            retention,
        }
    }

    /// Store a finished artifact and opportunistically clean up afterwards.
    pub async fn store(&self, mut artifact: ExportArtifact) -> Uuid {
        let retention = chrono::Duration::from_std(self.retention.retention_period)
            .unwrap_or_else(|_| chrono::Duration::hours(72));
        artifact.expires_at = artifact.created_at + retention;
        let id = artifact.export_id;
        let size = artifact.total_size_bytes();

        let mut inner = self.inner.write().await;
        inner.artifacts.insert(id, artifact);
        debug!(
            "Stored export {} ({} bytes), {} artifacts live",
            id,
            size,
            inner.artifacts.len()
        );
        self.cleanup_if_due(&mut inner);
        id
    }

    /// Look up a live artifact, applying expiry lazily.
    ///
    /// An expired id is removed on sight and reported exactly like an
    /// unknown one, so an expired export can never be resurrected.
    pub async fn get(&self, export_id: Uuid) -> ExportResult<ExportArtifact> {
        let mut inner = self.inner.write().await;
        match inner.artifacts.get(&export_id) {
            Some(artifact) if artifact.expires_at > Utc::now() => Ok(artifact.clone()),
            Some(_) => {
                inner.artifacts.remove(&export_id);
                debug!("Export {} expired at lookup, removed", export_id);
                Err(ExportError::NotFound {
                    export_id: export_id.to_string(),
                })
            }
            None => Err(ExportError::NotFound {
                export_id: export_id.to_string(),
            }),
        }
    }

    /// Resolve the whole-export download: the single file, or the ZIP
    /// archive for chunked exports. Returns the file name and payload.
    pub async fn download_whole(&self, export_id: Uuid) -> ExportResult<(String, Bytes)> {
        let artifact = self.get(export_id).await?;
        let (name, data) = match &artifact.payload {
            ExportPayload::Single { file_name, data } => (file_name.clone(), data.clone()),
            ExportPayload::Chunked {
                archive_name,
                archive,
                ..
            } => (archive_name.clone(), archive.clone()),
        };
        Ok((name, data))
    }

    /// Resolve a single chunk file by its 1-based index.
    pub async fn download_chunk(
        &self,
        export_id: Uuid,
        chunk_index: u64,
    ) -> ExportResult<(String, Bytes)> {
        let artifact = self.get(export_id).await?;
        // Single-file exports and out-of-range indexes both answer as
        // not-found, same as an unknown export id.
        let chunks = match &artifact.payload {
            ExportPayload::Chunked { chunks, .. } => chunks,
            ExportPayload::Single { .. } => {
                return Err(ExportError::NotFound {
                    export_id: format!("{export_id}/batch/{chunk_index}"),
                });
            }
        };
        if chunk_index == 0 || chunk_index as usize > chunks.len() {
            return Err(ExportError::NotFound {
                export_id: format!("{export_id}/batch/{chunk_index}"),
            });
        }
        let chunk = &chunks[chunk_index as usize - 1];
        Ok((chunk.file_name.clone(), chunk.data.clone()))
    }

    /// Run a full cleanup pass now, regardless of the interval gate.
    pub async fn run_cleanup(&self) -> CleanupReport {
        let mut inner = self.inner.write().await;
        let report = self.cleanup_locked(&mut inner);
        inner.last_cleanup = Some(Instant::now());
        if report.expired_removed + report.capacity_evicted > 0 {
            info!(
                "Cleanup removed {} expired and {} over-capacity artifacts, {} remain",
                report.expired_removed, report.capacity_evicted, report.remaining
            );
        }
        report
    }

    pub async fn storage_info(&self) -> StorageInfo {
        let inner = self.inner.read().await;
        let total_bytes: u64 = inner
            .artifacts
            .values()
            .map(ExportArtifact::total_size_bytes)
            .sum();
        StorageInfo {
            artifact_count: inner.artifacts.len(),
            total_bytes,
            total_bytes_human: crate::utils::format_bytes(total_bytes),
            max_artifacts: self.retention.max_artifacts,
            retention_period_secs: self.retention.retention_period.as_secs(),
        }
    }

    /// Cleanup gated on the configured interval; cheap no-op when a pass ran
    /// recently. Caller must hold the write lock.
    fn cleanup_if_due(&self, inner: &mut RegistryInner) {
        let due = match inner.last_cleanup {
            Some(at) => at.elapsed() >= self.retention.cleanup_interval,
            None => true,
        };
        if !due {
            return;
        }
        let report = self.cleanup_locked(inner);
        inner.last_cleanup = Some(Instant::now());
        if report.expired_removed + report.capacity_evicted > 0 {
            debug!(
                "Opportunistic cleanup removed {} expired, evicted {}",
                report.expired_removed, report.capacity_evicted
            );
        }
    }

    fn cleanup_locked(&self, inner: &mut RegistryInner) -> CleanupReport {
        let now = Utc::now();
        let before = inner.artifacts.len();
        inner.artifacts.retain(|_, a| a.expires_at > now);
        let expired_removed = before - inner.artifacts.len();

        // Capacity eviction: oldest first, but never anything younger than
        // the protected age. The registry may run over capacity when every
        // excess artifact is still protected.
        let mut capacity_evicted = 0;
        if inner.artifacts.len() > self.retention.max_artifacts {
            let protected = chrono::Duration::from_std(self.retention.protected_age)
                .unwrap_or_else(|_| chrono::Duration::minutes(10));
            let cutoff = now - protected;

            let mut evictable: Vec<(Uuid, chrono::DateTime<Utc>)> = inner
                .artifacts
                .values()
                .filter(|a| a.created_at <= cutoff)
                .map(|a| (a.export_id, a.created_at))
                .collect();
            evictable.sort_by_key(|(_, created)| *created);

            let excess = inner.artifacts.len() - self.retention.max_artifacts;
            for (id, _) in evictable.into_iter().take(excess) {
                inner.artifacts.remove(&id);
                capacity_evicted += 1;
            }
        }

        CleanupReport {
            expired_removed,
            capacity_evicted,
            remaining: inner.artifacts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkFile, ExportFormat, ExportMetrics, ExportStrategy, ExportType};
    use std::time::Duration;

    fn metrics() -> ExportMetrics {
        ExportMetrics {
            total_ms: 5,
            per_chunk_ms: Vec::new(),
            records_per_second: 100.0,
            memory_estimate_bytes: 64,
            compression_ratio: None,
        }
    }

    fn single_artifact() -> ExportArtifact {
        ExportArtifact {
            export_id: Uuid::new_v4(),
            export_type: ExportType::Participants,
            strategy: ExportStrategy::SingleFile,
            payload: ExportPayload::Single {
                file_name: "participants.xlsx".to_string(),
                data: Bytes::from_static(b"fake xlsx bytes"),
            },
            record_count: 3,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            metrics: metrics(),
        }
    }

    fn chunked_artifact() -> ExportArtifact {
        let chunks = vec![
            ChunkFile {
                file_name: "payments_part001.csv".to_string(),
                data: Bytes::from_static(b"chunk one"),
                record_range: (1, 2),
                size_bytes: 9,
                processing_ms: 1,
            },
            ChunkFile {
                file_name: "payments_part002.csv".to_string(),
                data: Bytes::from_static(b"chunk two"),
                record_range: (3, 4),
                size_bytes: 9,
                processing_ms: 1,
            },
        ];
        ExportArtifact {
            export_id: Uuid::new_v4(),
            export_type: ExportType::Payments,
            strategy: ExportStrategy::MultiFile,
            payload: ExportPayload::Chunked {
                chunks,
                archive_name: "payments.zip".to_string(),
                archive: Bytes::from_static(b"fake zip"),
                total_uncompressed: 18,
                compressed: 8,
            },
            record_count: 4,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            metrics: metrics(),
        }
    }

    #[tokio::test]
    async fn store_sets_expiry_and_get_returns_live_artifact() {
        let registry = ExportRegistry::new(RetentionConfig::default());
        let artifact = single_artifact();
        let created = artifact.created_at;
        let id = registry.store(artifact).await;

        let fetched = registry.get(id).await.unwrap();
        assert_eq!(fetched.expires_at, created + chrono::Duration::hours(72));
        assert_eq!(fetched.record_count, 3);
    }

    #[tokio::test]
    async fn unknown_and_expired_ids_are_indistinguishable() {
        let retention = RetentionConfig {
            retention_period: Duration::from_secs(0),
            ..Default::default()
        };
        let registry = ExportRegistry::new(retention);
        let id = registry.store(single_artifact()).await;

        let expired = registry.get(id).await.unwrap_err();
        let unknown = registry.get(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(expired.error_code(), unknown.error_code());

        // Removed on first sight, never resurrected
        assert_eq!(registry.storage_info().await.artifact_count, 0);
    }

    #[tokio::test]
    async fn chunk_download_resolves_by_one_based_index() {
        let registry = ExportRegistry::new(RetentionConfig::default());
        let id = registry.store(chunked_artifact()).await;

        let (name, data) = registry.download_chunk(id, 2).await.unwrap();
        assert_eq!(name, "payments_part002.csv");
        assert_eq!(data.as_ref(), b"chunk two");

        assert!(registry.download_chunk(id, 0).await.is_err());
        assert!(registry.download_chunk(id, 3).await.is_err());
    }

    #[tokio::test]
    async fn whole_download_serves_archive_for_chunked_exports() {
        let registry = ExportRegistry::new(RetentionConfig::default());
        let id = registry.store(chunked_artifact()).await;
        let (name, data) = registry.download_whole(id).await.unwrap();
        assert_eq!(name, "payments.zip");
        assert_eq!(data.as_ref(), b"fake zip");
    }

    #[tokio::test]
    async fn single_file_export_has_no_chunk_downloads() {
        let registry = ExportRegistry::new(RetentionConfig::default());
        let id = registry.store(single_artifact()).await;
        assert!(registry.download_chunk(id, 1).await.is_err());
    }

    #[tokio::test]
    async fn capacity_eviction_skips_protected_artifacts() {
        let retention = RetentionConfig {
            max_artifacts: 2,
            protected_age: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let registry = ExportRegistry::new(retention);

        let mut old = single_artifact();
        old.created_at = Utc::now() - chrono::Duration::hours(1);
        let old_id = registry.store(old).await;

        let fresh_a = registry.store(single_artifact()).await;
        let fresh_b = registry.store(single_artifact()).await;
        let report = registry.run_cleanup().await;

        // The only artifact past the protected age goes first
        assert_eq!(report.capacity_evicted, 1);
        assert!(registry.get(old_id).await.is_err());
        assert!(registry.get(fresh_a).await.is_ok());
        assert!(registry.get(fresh_b).await.is_ok());
    }

    #[tokio::test]
    async fn over_capacity_but_all_protected_evicts_nothing() {
        let retention = RetentionConfig {
            max_artifacts: 1,
            protected_age: Duration::from_secs(600),
            ..Default::default()
        };
        let registry = ExportRegistry::new(retention);
        registry.store(single_artifact()).await;
        registry.store(single_artifact()).await;

        let report = registry.run_cleanup().await;
        assert_eq!(report.capacity_evicted, 0);
        assert_eq!(report.remaining, 2);
    }

    #[tokio::test]
    async fn storage_info_sums_chunks_and_archive() {
        let registry = ExportRegistry::new(RetentionConfig::default());
        registry.store(chunked_artifact()).await;
        let info = registry.storage_info().await;
        assert_eq!(info.artifact_count, 1);
        // two 9-byte chunks plus the 8-byte archive
        assert_eq!(info.total_bytes, 26);
    }
}
