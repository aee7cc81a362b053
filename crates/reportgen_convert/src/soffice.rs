//! LibreOffice-backed converter.
//!
//! Each conversion runs `soffice --headless` inside its own temporary
//! directory, with a private user profile so concurrent conversions do not
//! fight over the default one.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::converter::{DocumentConverter, OutputFormat};
use crate::error::{ConversionError, ConvertResult};

/// Default converter executable.
pub const DEFAULT_SOFFICE_BINARY: &str = "soffice";

/// Default conversion timeout in seconds.
pub const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 120;

const INPUT_STEM: &str = "report";

/// Options for [`SofficeConverter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Executable name or path
    pub soffice_binary: String,
    /// Upper bound for one conversion
    pub timeout_secs: u64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            soffice_binary: DEFAULT_SOFFICE_BINARY.to_string(),
            timeout_secs: DEFAULT_CONVERT_TIMEOUT_SECS,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn soffice_binary(mut self, binary: impl Into<String>) -> Self {
        self.soffice_binary = binary.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Converter that shells out to LibreOffice.
#[derive(Debug, Clone, Default)]
pub struct SofficeConverter {
    options: ConvertOptions,
}

impl SofficeConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    fn build_args(&self, workdir: &Path, input: &Path, format: OutputFormat) -> Vec<String> {
        vec![
            format!(
                "-env:UserInstallation=file://{}",
                workdir.join("profile").display()
            ),
            "--headless".to_string(),
            "--norestore".to_string(),
            "--convert-to".to_string(),
            format.filter().to_string(),
            "--outdir".to_string(),
            workdir.join("out").display().to_string(),
            input.display().to_string(),
        ]
    }

    fn spawn_failure(&self, err: std::io::Error) -> ConversionError {
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => ConversionError::NotAvailable(
                format!("{}: {}", self.options.soffice_binary, err),
            ),
            _ => ConversionError::Io(err),
        }
    }
}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    async fn convert(&self, input: &[u8], format: OutputFormat) -> ConvertResult<Vec<u8>> {
        if format.is_identity() {
            debug!("Output format {} needs no conversion", format);
            return Ok(input.to_vec());
        }

        let workdir = tempfile::Builder::new().prefix("reportgen-").tempdir()?;
        let input_path = workdir.path().join(format!("{}.docx", INPUT_STEM));
        tokio::fs::write(&input_path, input).await?;
        tokio::fs::create_dir(workdir.path().join("out")).await?;

        let args = self.build_args(workdir.path(), &input_path, format);
        debug!("Executing: {} {}", self.options.soffice_binary, args.join(" "));

        let start = Instant::now();
        let child = Command::new(&self.options.soffice_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_failure(e))?;

        let timeout = Duration::from_secs(self.options.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    "Conversion to {} exceeded {}s, killing converter",
                    format, self.options.timeout_secs
                );
                return Err(ConversionError::Timeout(self.options.timeout_secs));
            }
        };

        if !output.status.success() {
            return Err(ConversionError::Failed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let produced = workdir
            .path()
            .join("out")
            .join(format!("{}.{}", INPUT_STEM, format.extension()));
        let bytes = match tokio::fs::read(&produced).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConversionError::OutputMissing(
                    produced.display().to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Converted {} byte(s) to {} ({} bytes) in {}ms",
            input.len(),
            format,
            bytes.len(),
            start.elapsed().as_millis()
        );
        Ok(bytes)
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.options.soffice_binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConvertOptions::default();
        assert_eq!(options.soffice_binary, "soffice");
        assert_eq!(options.timeout_secs, 120);

        let options = ConvertOptions::new().soffice_binary("/opt/lo/soffice").timeout_secs(5);
        assert_eq!(options.soffice_binary, "/opt/lo/soffice");
        assert_eq!(options.timeout_secs, 5);
    }

    #[test]
    fn test_build_args() {
        let converter = SofficeConverter::default();
        let workdir = Path::new("/tmp/work");
        let args = converter.build_args(workdir, &workdir.join("report.docx"), OutputFormat::Pdf);

        assert_eq!(args[0], "-env:UserInstallation=file:///tmp/work/profile");
        assert_eq!(
            &args[1..],
            &[
                "--headless",
                "--norestore",
                "--convert-to",
                "pdf",
                "--outdir",
                "/tmp/work/out",
                "/tmp/work/report.docx",
            ]
        );
    }

    #[tokio::test]
    async fn test_docx_is_identity_without_spawning() {
        let converter =
            SofficeConverter::new(ConvertOptions::new().soffice_binary("/nonexistent/soffice"));
        let output = converter.convert(b"PK-docx", OutputFormat::Docx).await.unwrap();
        assert_eq!(output, b"PK-docx");
    }
}
