//! Layered configuration: YAML file, then environment, then flags.

use std::path::{Path, PathBuf};

use reportgen_assets::FetchOptions;
use reportgen_convert::{ConvertOptions, OutputFormat};
use reportgen_templates::RenderOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Public link prefix, e.g. `https://reports.example.com`.
pub const ENV_PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";
pub const ENV_SOFFICE: &str = "REPORTGEN_SOFFICE";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "REPORTGEN_FETCH_TIMEOUT_SECS";

/// Default directory for generated reports.
pub const DEFAULT_OUTPUT_DIR: &str = "generated_reports";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where rendered reports go and how they are linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Directory for generated reports
    pub output_dir: PathBuf,
    /// Prefix of public links; no link is produced when unset
    pub public_base_url: Option<String>,
    /// Delivery format
    pub format: OutputFormat,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            public_base_url: None,
            format: OutputFormat::Pdf,
        }
    }
}

impl OutputOptions {
    /// Public link for a generated file, if a base URL is configured.
    pub fn link_for(&self, file_name: &str) -> Option<String> {
        self.public_base_url
            .as_deref()
            .map(|base| format!("{}/reports/{}", base.trim_end_matches('/'), file_name))
    }
}

/// Complete reportgen configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportgenConfig {
    pub render: RenderOptions,
    pub fetch: FetchOptions,
    pub convert: ConvertOptions,
    pub output: OutputOptions,
}

impl ReportgenConfig {
    /// Load from `path` (or defaults) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_PUBLIC_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.output.public_base_url = Some(url.trim().to_string());
        }

        if let Some(binary) = lookup(ENV_SOFFICE).filter(|v| !v.trim().is_empty()) {
            self.convert.soffice_binary = binary.trim().to_string();
        }

        if let Some(value) = lookup(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch.timeout_secs = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_FETCH_TIMEOUT_SECS,
                value: value.clone(),
            })?;
        }

        Ok(())
    }

    /// Reject settings no render could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.image_width_px == 0 || self.render.image_height_px == 0 {
            return Err(ConfigError::Invalid(
                "render image size must be at least 1x1 px".to_string(),
            ));
        }
        if self.render.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "render.fetch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.convert.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "convert.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.convert.soffice_binary.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "convert.soffice_binary must not be empty".to_string(),
            ));
        }
        if let Some(url) = &self.output.public_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "output.public_base_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
