//! HTTP-backed asset fetcher.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssetFetchFailure, FetchResult};
use crate::fetcher::AssetFetcher;

/// Options for [`HttpAssetFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Largest body accepted, in bytes
    pub max_bytes: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: 20 * 1024 * 1024,
            user_agent: concat!("reportgen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
}

/// Fetches assets over HTTP(S) with a single attempt per locator.
///
/// One instance is meant to live for one render; it owns its connection
/// pool and shares nothing with other renders.
pub struct HttpAssetFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl HttpAssetFetcher {
    /// Create a fetcher with the given options.
    pub fn new(options: FetchOptions) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| AssetFetchFailure::Client(e.to_string()))?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn parse_locator(locator: &str) -> FetchResult<Url> {
        let url = Url::parse(locator.trim())
            .map_err(|_| AssetFetchFailure::InvalidLocator(locator.to_string()))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(AssetFetchFailure::InvalidLocator(locator.to_string())),
        }
    }

    fn network_failure(&self, locator: &str, err: reqwest::Error) -> AssetFetchFailure {
        if err.is_timeout() {
            AssetFetchFailure::Timeout {
                locator: locator.to_string(),
                seconds: self.options.timeout_secs,
            }
        } else {
            AssetFetchFailure::Network {
                locator: locator.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, locator: &str) -> FetchResult<Vec<u8>> {
        let url = Self::parse_locator(locator)?;
        debug!("Fetching asset {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_failure(locator, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetFetchFailure::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.options.max_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(AssetFetchFailure::TooLarge {
                locator: locator.to_string(),
                limit,
            });
        }

        // Content-Length may be absent or wrong, so the limit is enforced
        // on the stream as well.
        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| self.network_failure(locator, e))?;
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(AssetFetchFailure::TooLarge {
                    locator: locator.to_string(),
                    limit,
                });
            }
            body.extend_from_slice(&chunk);
        }

        if body.is_empty() {
            return Err(AssetFetchFailure::Empty {
                locator: locator.to_string(),
            });
        }

        debug!("Fetched {} bytes from {}", body.len(), locator);
        Ok(body)
    }
}
