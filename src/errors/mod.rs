//! Centralized error handling for the export service
//!
//! This module provides the error taxonomy used throughout the application.
//! Every failure that crosses the pipeline boundary is re-expressed as one
//! of the `ExportError` kinds, each of which carries a stable error code
//! that the web layer maps onto an HTTP status.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using ExportError
pub type ExportResult<T> = Result<T, ExportError>;

/// Convenience type alias for writer Results
pub type WriterResult<T> = Result<T, WriterError>;
