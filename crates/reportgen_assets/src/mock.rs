//! Mock asset fetcher for testing.
//!
//! Provides a scripted implementation of the AssetFetcher trait so render
//! tests run without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{AssetFetchFailure, FetchResult};
use crate::fetcher::AssetFetcher;

/// Mock asset fetcher.
///
/// Returns the bytes registered for a locator and a 404 status failure for
/// everything else. Every call is captured for later verification.
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, FetchResult<Vec<u8>>>>>,
    captured_calls: Arc<RwLock<Vec<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for `locator`.
    pub fn with_asset(self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.responses
            .write()
            .insert(locator.into(), Ok(bytes.into()));
        self
    }

    /// Fail every request for `locator` with `failure`.
    pub fn with_failure(self, locator: impl Into<String>, failure: AssetFetchFailure) -> Self {
        self.responses.write().insert(locator.into(), Err(failure));
        self
    }

    /// Hold every request for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    /// Locators requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }
}

#[async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch(&self, locator: &str) -> FetchResult<Vec<u8>> {
        self.captured_calls.write().push(locator.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .responses
            .read()
            .get(locator)
            .cloned()
            .unwrap_or_else(|| {
                Err(AssetFetchFailure::Status {
                    locator: locator.to_string(),
                    status: 404,
                })
            });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_serves_registered_assets() {
        let fetcher = MockFetcher::new().with_asset("https://x/y.png", vec![1, 2, 3]);

        assert_eq!(fetcher.fetch("https://x/y.png").await, Ok(vec![1, 2, 3]));
        assert_eq!(
            fetcher.fetch("https://x/z.png").await,
            Err(AssetFetchFailure::Status {
                locator: "https://x/z.png".to_string(),
                status: 404,
            })
        );
        assert_eq!(fetcher.calls(), vec!["https://x/y.png", "https://x/z.png"]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_scripted_failure() {
        let failure = AssetFetchFailure::Timeout {
            locator: "https://slow/a.png".to_string(),
            seconds: 30,
        };
        let fetcher = MockFetcher::new().with_failure("https://slow/a.png", failure.clone());

        assert_eq!(fetcher.fetch("https://slow/a.png").await, Err(failure));
        assert_eq!(fetcher.call_count(), 1);

        fetcher.clear_calls();
        assert_eq!(fetcher.call_count(), 0);
    }
}
