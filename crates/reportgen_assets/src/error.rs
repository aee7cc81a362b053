//! Error types for asset retrieval.

use thiserror::Error;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, AssetFetchFailure>;

/// Reasons a single asset could not be retrieved.
///
/// Failures are per asset. Callers recover from them locally and never let
/// one unreachable image abort a whole render.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetFetchFailure {
    #[error("Invalid asset locator: {0}")]
    InvalidLocator(String),

    #[error("HTTP client could not be created: {0}")]
    Client(String),

    #[error("Network error fetching {locator}: {message}")]
    Network { locator: String, message: String },

    #[error("HTTP {status} fetching {locator}")]
    Status { locator: String, status: u16 },

    #[error("Timed out fetching {locator} after {seconds} seconds")]
    Timeout { locator: String, seconds: u64 },

    #[error("Asset {locator} exceeds {limit} bytes")]
    TooLarge { locator: String, limit: u64 },

    #[error("Asset {locator} has an empty body")]
    Empty { locator: String },
}

impl AssetFetchFailure {
    /// The locator this failure refers to, when known.
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::InvalidLocator(locator) => Some(locator),
            Self::Client(_) => None,
            Self::Network { locator, .. }
            | Self::Status { locator, .. }
            | Self::Timeout { locator, .. }
            | Self::TooLarge { locator, .. }
            | Self::Empty { locator } => Some(locator),
        }
    }
}
