//! Data source seam
//!
//! When a request carries a `filter` instead of inline records, the pipeline
//! resolves rows through a [`DataSource`]. The trait is the integration
//! point for direct database sourcing; the service ships with an in-memory
//! implementation used for filter-based requests and tests.

use std::collections::HashMap;

use crate::errors::SourceError;
use crate::models::{ExportType, FilterSpec, RawRecord};

/// Row provider for filter-based exports.
///
/// Implementations report a total row count up front so the planner can run
/// before any rows are materialized, then serve rows in offset pages.
pub trait DataSource: Send + Sync {
    fn count(&self, export_type: ExportType, filter: &FilterSpec) -> Result<u64, SourceError>;

    fn fetch(
        &self,
        export_type: ExportType,
        filter: &FilterSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RawRecord>, SourceError>;
}

/// In-memory data source holding fixed row sets per export type.
///
/// Filters are applied as exact matches on the `criteria` map; a `limit`
/// caps the result. Ordering of the backing rows is preserved.
#[derive(Default)]
pub struct StaticDataSource {
    rows: HashMap<ExportType, Vec<RawRecord>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, export_type: ExportType, rows: Vec<RawRecord>) -> Self {
        self.rows.insert(export_type, rows);
        self
    }

    fn matching<'a>(
        &'a self,
        export_type: ExportType,
        filter: &'a FilterSpec,
    ) -> impl Iterator<Item = &'a RawRecord> + 'a {
        self.rows
            .get(&export_type)
            .into_iter()
            .flatten()
            .filter(move |record| {
                filter
                    .criteria
                    .iter()
                    .all(|(field, expected)| record.get(field) == Some(expected))
            })
            .take(filter.limit.unwrap_or(u64::MAX) as usize)
    }
}

impl DataSource for StaticDataSource {
    fn count(&self, export_type: ExportType, filter: &FilterSpec) -> Result<u64, SourceError> {
        Ok(self.matching(export_type, filter).count() as u64)
    }

    fn fetch(
        &self,
        export_type: ExportType,
        filter: &FilterSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self
            .matching(export_type, filter)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
