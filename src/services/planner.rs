//! Chunk planning
//!
//! Decides single-file vs multi-file for a record count and computes the
//! chunk size from the template's recommendation, clamped to configured
//! bounds. Range arithmetic lives here so the pipeline and tests share one
//! definition of how records partition into chunks.

use crate::config::ExportConfig;
use crate::errors::{ExportError, ExportResult};
use crate::models::{ChunkPlan, ExportStrategy, Template};

#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    chunk_size_floor: u64,
    chunk_size_ceiling: u64,
}

impl ChunkPlanner {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            chunk_size_floor: config.chunk_size_floor,
            chunk_size_ceiling: config.chunk_size_ceiling,
        }
    }

    /// Decide the strategy and chunk size for an export.
    ///
    /// Chunking is mandatory when forced or when the record count exceeds
    /// the template's single-file maximum. A positive override wins over the
    /// computed default; the default is the template recommendation clamped
    /// to the configured floor/ceiling and never above the record count.
    pub fn decide(
        &self,
        record_count: u64,
        template: &Template,
        force_chunking: bool,
        chunk_size_override: Option<u64>,
    ) -> ExportResult<ChunkPlan> {
        if record_count == 0 {
            // The pipeline rejects empty inputs before planning; guard anyway.
            return Err(ExportError::validation("cannot plan an empty export"));
        }

        let multi = force_chunking || record_count > template.max_records_single_file;
        if !multi {
            return Ok(ChunkPlan {
                strategy: ExportStrategy::SingleFile,
                chunk_size: record_count,
                chunk_count: 1,
            });
        }

        let chunk_size = match chunk_size_override {
            Some(size) if size > 0 => size,
            Some(_) => {
                return Err(ExportError::validation("chunk_size must be positive"));
            }
            None => template
                .recommended_chunk_size
                .clamp(self.chunk_size_floor, self.chunk_size_ceiling)
                .min(record_count),
        };

        let chunk_count = record_count.div_ceil(chunk_size);
        if chunk_count == 0 {
            return Err(ExportError::validation(
                "chunk size configuration produced zero chunks",
            ));
        }

        Ok(ChunkPlan {
            strategy: ExportStrategy::MultiFile,
            chunk_size,
            chunk_count,
        })
    }

    /// Partition `[1, record_count]` into 1-based inclusive chunk ranges.
    ///
    /// Ranges are contiguous, non-overlapping and preserve input order;
    /// their sizes sum to `record_count`.
    pub fn chunk_ranges(record_count: u64, chunk_size: u64) -> Vec<(u64, u64)> {
        if record_count == 0 || chunk_size == 0 {
            return Vec::new();
        }
        (0..record_count.div_ceil(chunk_size))
            .map(|i| {
                let start = i * chunk_size + 1;
                let end = ((i + 1) * chunk_size).min(record_count);
                (start, end)
            })
            .collect()
    }
}
