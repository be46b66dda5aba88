//! Error types for record export.

use thiserror::Error;

/// Result type alias using `ExportError`.
pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush error: {0}")]
    Flush(String),
}
