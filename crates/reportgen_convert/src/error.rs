//! Error types for document conversion.

use thiserror::Error;

/// Result type alias for conversion operations.
pub type ConvertResult<T> = Result<T, ConversionError>;

/// Errors raised while converting a rendered document.
///
/// Kept apart from template errors so callers can tell a template problem
/// from a conversion problem.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Converter not available: {0}")]
    NotAvailable(String),

    #[error("Conversion failed (exit code {exit_code:?}): {stderr}")]
    Failed { exit_code: Option<i32>, stderr: String },

    #[error("Conversion timed out after {0} seconds")]
    Timeout(u64),

    #[error("Converter produced no output file: {0}")]
    OutputMissing(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Whether retrying with the same input could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Io(_))
    }
}
