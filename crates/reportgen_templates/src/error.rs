//! Error and warning types for template rendering.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while reading or writing the document container.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Template container is not a readable archive: {0}")]
    Corrupt(String),

    #[error("Template container is missing required part: {0}")]
    MissingPart(String),

    #[error("Part {part} could not be read: {message}")]
    UnreadablePart { part: String, message: String },

    #[error("Part {part} exceeds the {limit} byte limit")]
    PartTooLarge { part: String, limit: u64 },

    #[error("Rendered container could not be written: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a render.
///
/// Per-tag problems never produce one of these on their own; they are
/// collected as [`RenderWarning`]s and only become fatal in strict mode.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Part {part} is not readable markup")]
    UnreadablePart {
        part: String,
        warnings: Vec<RenderWarning>,
    },

    #[error("Template has {} problem tag(s): {}", .0.len(), summarize(.0))]
    Unresolved(Vec<RenderWarning>),

    #[error("Invalid render context: {0}")]
    InvalidContext(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// Warnings collected before the render stopped.
    pub fn warnings(&self) -> &[RenderWarning] {
        match self {
            Self::UnreadablePart { warnings, .. } | Self::Unresolved(warnings) => warnings,
            _ => &[],
        }
    }
}

fn summarize(warnings: &[RenderWarning]) -> String {
    warnings
        .iter()
        .map(|w| format!("{} [{}]", w.raw, w.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a tag could not be substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WarningReason {
    /// The identifier has no binding in the render context.
    Unresolved,
    /// The span looked like a tag but does not follow the grammar.
    Malformed(String),
    /// An image tag is bound to a value that carries no locator.
    NotAnAsset,
    /// The asset fetch for an image tag failed.
    FetchFailed(String),
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Malformed(detail) => write!(f, "malformed: {}", detail),
            Self::NotAnAsset => write!(f, "not an image asset"),
            Self::FetchFailed(detail) => write!(f, "fetch failed: {}", detail),
        }
    }
}

/// A non-fatal problem found while rendering one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderWarning {
    /// Identifier of the tag (empty when the tag was too malformed to name one)
    pub identifier: String,
    /// Tag text as it appeared in the part, markup removed
    pub raw: String,
    /// Part the tag was found in
    pub part: String,
    pub reason: WarningReason,
}

impl RenderWarning {
    pub fn new(
        identifier: impl Into<String>,
        raw: impl Into<String>,
        part: impl Into<String>,
        reason: WarningReason,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            raw: raw.into(),
            part: part.into(),
            reason,
        }
    }
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.part, self.raw, self.reason)
    }
}
