//! Spreadsheet and archive writers
//!
//! The pipeline talks to output formats through the [`SpreadsheetWriter`]
//! trait: headers plus string rows in, one finished binary blob out. Both
//! production implementations are constructed at startup; a format that
//! cannot initialize is a configuration error there, never a runtime dummy.

use std::io;

use tracing::warn;

pub mod archive;
pub mod csv_writer;
pub mod sanitize;
pub mod xlsx;

pub use archive::pack_archive;
pub use csv_writer::CsvSheetWriter;
pub use sanitize::{sanitize_cell, MAX_CELL_CHARS};
pub use xlsx::XlsxWriter;

use crate::errors::{WriterError, WriterResult};
use crate::models::ExportFormat;

/// Capability interface for turning rows + headers into a spreadsheet blob.
///
/// Rows are pre-sanitized strings in header order; writers only deal with
/// serialization, never with value cleaning.
pub trait SpreadsheetWriter: Send + Sync {
    fn write(&self, headers: &[&str], rows: &[Vec<String>], sheet_name: &str)
        -> WriterResult<Vec<u8>>;
}

/// An ordered list of named writer strategies, tried in order.
///
/// The first strategy that succeeds wins; every failed attempt is logged
/// with its strategy name before the next one runs. With every strategy
/// exhausted, the last error is returned.
pub struct FallbackWriter {
    strategies: Vec<(&'static str, Box<dyn SpreadsheetWriter>)>,
}

impl FallbackWriter {
    pub fn new(strategies: Vec<(&'static str, Box<dyn SpreadsheetWriter>)>) -> Self {
        Self { strategies }
    }
}

impl SpreadsheetWriter for FallbackWriter {
    fn write(
        &self,
        headers: &[&str],
        rows: &[Vec<String>],
        sheet_name: &str,
    ) -> WriterResult<Vec<u8>> {
        let mut last_error = None;
        for (name, strategy) in &self.strategies {
            match strategy.write(headers, rows, sheet_name) {
                Ok(blob) => return Ok(blob),
                Err(err) => {
                    warn!("Writer strategy '{}' failed: {}", name, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            WriterError::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                "no writer strategies configured",
            ))
        }))
    }
}

/// Writer set constructed once at startup and shared across requests.
pub struct WriterSet {
    excel: FallbackWriter,
    csv: CsvSheetWriter,
}

impl WriterSet {
    pub fn new() -> Self {
        Self {
            excel: FallbackWriter::new(vec![("inline-xlsx", Box::new(XlsxWriter::new()))]),
            csv: CsvSheetWriter::new(),
        }
    }

    pub fn for_format(&self, format: ExportFormat) -> &dyn SpreadsheetWriter {
        match format {
            ExportFormat::Excel => &self.excel,
            ExportFormat::Csv => &self.csv,
        }
    }
}

impl Default for WriterSet {
    fn default() -> Self {
        Self::new()
    }
}
