//! Asset fetcher trait and bounded concurrent retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::error::FetchResult;

/// Default number of fetches allowed in flight for one render.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Retrieves the binary content behind a resource locator.
///
/// Implementations make a single best-effort attempt and report failure
/// through [`AssetFetchFailure`](crate::AssetFetchFailure) instead of
/// panicking. There are no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the raw bytes at `locator`.
    async fn fetch(&self, locator: &str) -> FetchResult<Vec<u8>>;
}

#[async_trait]
impl<T: AssetFetcher + ?Sized> AssetFetcher for Arc<T> {
    async fn fetch(&self, locator: &str) -> FetchResult<Vec<u8>> {
        (**self).fetch(locator).await
    }
}

#[async_trait]
impl<T: AssetFetcher + ?Sized> AssetFetcher for Box<T> {
    async fn fetch(&self, locator: &str) -> FetchResult<Vec<u8>> {
        (**self).fetch(locator).await
    }
}

/// Fetch every locator with at most `concurrency` requests in flight.
///
/// Results come back in the same order as `locators`. Dropping the returned
/// future abandons whatever fetches are still pending.
pub async fn fetch_all<F>(
    fetcher: &F,
    locators: &[String],
    concurrency: usize,
) -> Vec<FetchResult<Vec<u8>>>
where
    F: AssetFetcher + ?Sized,
{
    let limit = concurrency.max(1);
    debug!("Fetching {} asset(s), concurrency {}", locators.len(), limit);

    stream::iter(locators.iter().map(|locator| fetcher.fetch(locator)))
        .buffered(limit)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetFetchFailure;

    #[tokio::test]
    async fn test_fetch_all_preserves_order() {
        let mut fetcher = MockAssetFetcher::new();
        fetcher.expect_fetch().returning(|locator| {
            if locator.ends_with("bad") {
                Err(AssetFetchFailure::Status {
                    locator: locator.to_string(),
                    status: 500,
                })
            } else {
                Ok(locator.as_bytes().to_vec())
            }
        });

        let locators = vec![
            "https://a/1".to_string(),
            "https://a/bad".to_string(),
            "https://a/3".to_string(),
        ];
        let results = fetch_all(&fetcher, &locators, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref(), Ok(&b"https://a/1"[..]));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_deref(), Ok(&b"https://a/3"[..]));
    }

    #[tokio::test]
    async fn test_fetch_all_zero_concurrency_still_runs() {
        let mut fetcher = MockAssetFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_| Ok(vec![1]));

        let results = fetch_all(&fetcher, &["https://a/1".to_string()], 0).await;
        assert_eq!(results, vec![Ok(vec![1])]);
    }
}
