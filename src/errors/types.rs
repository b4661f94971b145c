//! Error type definitions for the export service
//!
//! The `ExportError` enum is the boundary type returned by the pipeline and
//! the registry. Lower layers (spreadsheet writers, data sources) have their
//! own error enums that convert into it, so internal failures are never
//! surfaced verbatim to API clients.

use std::collections::HashMap;

use thiserror::Error;

/// Top-level export error taxonomy
///
/// Each variant corresponds to one stable `error_code` in API error bodies.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Bad or missing request fields, malformed filenames or sheet names
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        /// Per-field validation failures, keyed by field name
        details: HashMap<String, String>,
    },

    /// Unknown export_type/template_name pair
    #[error("Template '{template}' not found for export type '{export_type}'")]
    TemplateNotFound {
        export_type: String,
        template: String,
    },

    /// The data source yielded zero rows or raised while resolving a filter
    #[error("Data source error: {message}")]
    DataSource { message: String },

    /// Spreadsheet or archive writer failure during processing
    #[error("Export generation failed: {message}")]
    Generation {
        message: String,
        /// 1-based record range of the failing chunk, when known
        record_range: Option<(u64, u64)>,
    },

    /// A hard dependency failed to initialize at startup
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Unknown (or expired) export id
    #[error("Export '{export_id}' not found")]
    NotFound { export_id: String },
}

impl ExportError {
    /// Stable machine-readable code carried in every error response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            Self::DataSource { .. } => "DATA_SOURCE_ERROR",
            Self::Generation { .. } => "GENERATION_FAILED",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::NotFound { .. } => "EXPORT_NOT_FOUND",
        }
    }

    /// Create a validation error with a single message and no field detail
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Create a validation error with per-field details
    pub fn validation_with_details<S: Into<String>>(
        message: S,
        details: HashMap<String, String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// Create a generation error without a record range
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation {
            message: message.into(),
            record_range: None,
        }
    }

    /// Create a data source error
    pub fn data_source<S: Into<String>>(message: S) -> Self {
        Self::DataSource {
            message: message.into(),
        }
    }
}

/// Spreadsheet/archive writer specific errors
#[derive(Error, Debug)]
pub enum WriterError {
    /// Underlying I/O failure while building a blob
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container failure (XLSX package or chunk archive)
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// CSV serialization failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header/row shape mismatch handed to a writer
    #[error("Row has {actual} cells but {expected} headers were given")]
    ShapeMismatch { expected: usize, actual: usize },
}

impl From<WriterError> for ExportError {
    fn from(err: WriterError) -> Self {
        ExportError::Generation {
            message: err.to_string(),
            record_range: None,
        }
    }
}

/// Data source layer errors, converted at the pipeline boundary
#[derive(Error, Debug)]
pub enum SourceError {
    /// The filter spec matched nothing
    #[error("Filter resolved to zero rows for export type '{export_type}'")]
    EmptyResult { export_type: String },

    /// The backing store failed; the original cause is preserved
    #[error("Data source query failed: {message}")]
    QueryFailed {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl From<SourceError> for ExportError {
    fn from(err: SourceError) -> Self {
        let message = match &err {
            SourceError::QueryFailed {
                message,
                source: Some(cause),
            } => format!("{message} (caused by: {cause})"),
            _ => err.to_string(),
        };
        ExportError::DataSource { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            ExportError::validation("bad").error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            ExportError::TemplateNotFound {
                export_type: "participants".into(),
                template: "nope".into(),
            }
            .error_code(),
            "TEMPLATE_NOT_FOUND"
        );
        assert_eq!(
            ExportError::generation("boom").error_code(),
            "GENERATION_FAILED"
        );
        assert_eq!(
            ExportError::data_source("empty").error_code(),
            "DATA_SOURCE_ERROR"
        );
    }

    #[test]
    fn source_error_keeps_original_cause() {
        let err = SourceError::QueryFailed {
            message: "select failed".into(),
            source: Some(anyhow::anyhow!("connection reset")),
        };
        let export_err: ExportError = err.into();
        assert!(export_err.to_string().contains("connection reset"));
    }
}
