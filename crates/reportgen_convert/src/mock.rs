//! Mock converter for testing.
//!
//! Captures every conversion request and answers with scripted output so
//! callers can be tested without LibreOffice installed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::converter::{DocumentConverter, OutputFormat};
use crate::error::{ConversionError, ConvertResult};

/// Scripted behaviour for one output format.
#[derive(Debug, Clone)]
pub enum MockConversion {
    /// Return these bytes
    Output(Vec<u8>),
    /// Fail as if the converter exited with `exit_code`
    Failure { exit_code: i32, stderr: String },
    /// Fail as if the converter ran past its timeout
    Timeout(u64),
}

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedConversion {
    pub format: OutputFormat,
    pub input_len: usize,
}

/// Mock document converter.
///
/// Formats without a scripted conversion echo the input back unchanged.
#[derive(Clone)]
pub struct MockConverter {
    available: Arc<RwLock<bool>>,
    conversions: Arc<RwLock<HashMap<OutputFormat, MockConversion>>>,
    captured_calls: Arc<RwLock<Vec<CapturedConversion>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            conversions: Arc::new(RwLock::new(HashMap::new())),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the converter as missing; every conversion fails.
    pub fn unavailable(self) -> Self {
        *self.available.write() = false;
        self
    }

    /// Return `bytes` for conversions to `format`.
    pub fn with_output(self, format: OutputFormat, bytes: impl Into<Vec<u8>>) -> Self {
        self.conversions
            .write()
            .insert(format, MockConversion::Output(bytes.into()));
        self
    }

    /// Fail conversions to `format`.
    pub fn with_failure(self, format: OutputFormat, exit_code: i32, stderr: impl Into<String>) -> Self {
        self.conversions.write().insert(
            format,
            MockConversion::Failure {
                exit_code,
                stderr: stderr.into(),
            },
        );
        self
    }

    /// Time out conversions to `format`.
    pub fn with_timeout(self, format: OutputFormat, secs: u64) -> Self {
        self.conversions
            .write()
            .insert(format, MockConversion::Timeout(secs));
        self
    }

    /// Conversions requested so far.
    pub fn calls(&self) -> Vec<CapturedConversion> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }
}

#[async_trait]
impl DocumentConverter for MockConverter {
    async fn convert(&self, input: &[u8], format: OutputFormat) -> ConvertResult<Vec<u8>> {
        self.captured_calls.write().push(CapturedConversion {
            format,
            input_len: input.len(),
        });

        if !*self.available.read() {
            return Err(ConversionError::NotAvailable("mock converter".to_string()));
        }

        match self.conversions.read().get(&format).cloned() {
            Some(MockConversion::Output(bytes)) => Ok(bytes),
            Some(MockConversion::Failure { exit_code, stderr }) => Err(ConversionError::Failed {
                exit_code: Some(exit_code),
                stderr,
            }),
            Some(MockConversion::Timeout(secs)) => Err(ConversionError::Timeout(secs)),
            None => Ok(input.to_vec()),
        }
    }

    async fn is_available(&self) -> bool {
        *self.available.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_output_and_echo() {
        let converter = MockConverter::new().with_output(OutputFormat::Pdf, b"%PDF-1.7".to_vec());

        assert_eq!(
            converter.convert(b"docx", OutputFormat::Pdf).await.unwrap(),
            b"%PDF-1.7"
        );
        assert_eq!(
            converter.convert(b"docx", OutputFormat::Odt).await.unwrap(),
            b"docx"
        );
        assert_eq!(
            converter.calls(),
            vec![
                CapturedConversion { format: OutputFormat::Pdf, input_len: 4 },
                CapturedConversion { format: OutputFormat::Odt, input_len: 4 },
            ]
        );
    }

    #[tokio::test]
    async fn test_failures() {
        let converter = MockConverter::new()
            .with_failure(OutputFormat::Pdf, 81, "bad input")
            .with_timeout(OutputFormat::Html, 3);

        let err = converter.convert(b"x", OutputFormat::Pdf).await.unwrap_err();
        assert!(matches!(err, ConversionError::Failed { exit_code: Some(81), .. }));
        let err = converter.convert(b"x", OutputFormat::Html).await.unwrap_err();
        assert!(matches!(err, ConversionError::Timeout(3)));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let converter = MockConverter::new().unavailable();
        assert!(!converter.is_available().await);
        let err = converter.convert(b"x", OutputFormat::Pdf).await.unwrap_err();
        assert!(matches!(err, ConversionError::NotAvailable(_)));
        assert_eq!(converter.call_count(), 1);
    }
}
