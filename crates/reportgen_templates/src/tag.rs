//! Placeholder tag grammar.
//!
//! Two tag shapes are recognised:
//!
//! - text tags, `{{Name}}` or `{{Name:upper()}}`
//! - image tags, `{%Photo%}` or the single-brace form `{%Photo}`
//!
//! Anything after the first `:` is a formatter. It is kept for diagnostics
//! and never changes which value is bound.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a placeholder is substituted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Text,
    Image,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// A parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderTag {
    pub kind: TagKind,
    /// Top-level key looked up in the render context
    pub identifier: String,
    /// Trailing directive after `:`, if any
    pub formatter: Option<String>,
}

impl PlaceholderTag {
    /// Parse the text of one tag span.
    ///
    /// Total over its input: delimiters are stripped when present and the
    /// result is always a tag. Use [`is_well_formed`](Self::is_well_formed)
    /// to reject spans whose identifier breaks the grammar.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        let (kind, body) = if let Some(rest) = trimmed.strip_prefix("{%") {
            let rest = rest.strip_suffix('}').unwrap_or(rest).trim_end();
            (TagKind::Image, rest.strip_suffix('%').unwrap_or(rest))
        } else if let Some(rest) = trimmed.strip_prefix("{{") {
            (TagKind::Text, rest.strip_suffix("}}").unwrap_or(rest))
        } else {
            (TagKind::Text, trimmed)
        };

        let (identifier, formatter) = match body.split_once(':') {
            Some((identifier, formatter)) => (identifier, Some(formatter.trim().to_string())),
            None => (body, None),
        };

        Self {
            kind,
            identifier: identifier.trim().to_string(),
            formatter,
        }
    }

    /// Whether the identifier is non-empty and made of letters, digits and
    /// underscores only.
    pub fn is_well_formed(&self) -> bool {
        is_identifier(&self.identifier)
    }
}

impl fmt::Display for PlaceholderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.kind {
            TagKind::Text => ("{{", "}}"),
            TagKind::Image => ("{%", "%}"),
        };
        match &self.formatter {
            Some(formatter) => write!(f, "{}{}:{}{}", open, self.identifier, formatter, close),
            None => write!(f, "{}{}{}", open, self.identifier, close),
        }
    }
}

/// Check identifier syntax.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}
