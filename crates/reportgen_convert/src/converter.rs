//! Converter trait and output formats.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ConvertResult};

/// Target format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Docx,
    Odt,
    Html,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Html => "html",
        }
    }

    /// Argument passed to `soffice --convert-to`.
    pub fn filter(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx:MS Word 2007 XML",
            Self::Odt => "odt",
            Self::Html => "html",
        }
    }

    /// Whether the rendered document already is in this format.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Docx)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConversionError;

    /// Accepts `pdf`, `.pdf`, `PDF`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        match tag.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "odt" => Ok(Self::Odt),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(ConversionError::UnsupportedFormat(tag.to_string())),
        }
    }
}

/// Converts rendered document bytes into another format.
///
/// A conversion may take arbitrarily long; callers that need a bound wrap
/// the call or configure the implementation's own timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` into `format`.
    async fn convert(&self, input: &[u8], format: OutputFormat) -> ConvertResult<Vec<u8>>;

    /// Check whether the converter can run at all.
    async fn is_available(&self) -> bool;
}

#[async_trait]
impl<T: DocumentConverter + ?Sized> DocumentConverter for Arc<T> {
    async fn convert(&self, input: &[u8], format: OutputFormat) -> ConvertResult<Vec<u8>> {
        (**self).convert(input, format).await
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }
}

#[async_trait]
impl<T: DocumentConverter + ?Sized> DocumentConverter for Box<T> {
    async fn convert(&self, input: &[u8], format: OutputFormat) -> ConvertResult<Vec<u8>> {
        (**self).convert(input, format).await
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }
}
