//! Integration tests for HTTP asset retrieval.
//!
//! A local mockito server stands in for the remote image host.

use std::time::Duration;

use reportgen_assets::{
    fetch_all, AssetFetchFailure, AssetFetcher, FetchOptions, HttpAssetFetcher, MockFetcher,
};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[tokio::test]
async fn test_http_fetcher_returns_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/photo.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_SIGNATURE)
        .create_async()
        .await;

    let fetcher = HttpAssetFetcher::new(FetchOptions::default()).unwrap();
    let bytes = fetcher
        .fetch(&format!("{}/photo.png", server.url()))
        .await
        .unwrap();

    assert_eq!(bytes, PNG_SIGNATURE);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_fetcher_maps_404_to_status_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/missing.png")
        .with_status(404)
        .create_async()
        .await;

    let locator = format!("{}/missing.png", server.url());
    let fetcher = HttpAssetFetcher::new(FetchOptions::default()).unwrap();

    assert_eq!(
        fetcher.fetch(&locator).await,
        Err(AssetFetchFailure::Status { locator, status: 404 })
    );
}

#[tokio::test]
async fn test_http_fetcher_rejects_oversize_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/big.png")
        .with_status(200)
        .with_body(vec![0u8; 64])
        .create_async()
        .await;

    let locator = format!("{}/big.png", server.url());
    let fetcher = HttpAssetFetcher::new(FetchOptions::new().max_bytes(16)).unwrap();

    assert_eq!(
        fetcher.fetch(&locator).await,
        Err(AssetFetchFailure::TooLarge { locator, limit: 16 })
    );
}

#[tokio::test]
async fn test_http_fetcher_rejects_empty_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/empty.png")
        .with_status(200)
        .create_async()
        .await;

    let locator = format!("{}/empty.png", server.url());
    let fetcher = HttpAssetFetcher::new(FetchOptions::default()).unwrap();

    assert_eq!(
        fetcher.fetch(&locator).await,
        Err(AssetFetchFailure::Empty { locator })
    );
}

#[tokio::test]
async fn test_http_fetcher_unreachable_host_is_network_failure() {
    let fetcher = HttpAssetFetcher::new(FetchOptions::new().timeout_secs(2)).unwrap();
    // Port 9 (discard) on localhost is not expected to accept connections.
    let result = fetcher.fetch("http://127.0.0.1:9/photo.png").await;

    assert!(matches!(
        result,
        Err(AssetFetchFailure::Network { .. }) | Err(AssetFetchFailure::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_fetch_all_respects_concurrency_limit() {
    let locators: Vec<String> = (0..8).map(|i| format!("https://x/{}.png", i)).collect();
    let fetcher = locators
        .iter()
        .fold(MockFetcher::new(), |f, l| f.with_asset(l.clone(), vec![1]))
        .with_delay(Duration::from_millis(20));

    let results = fetch_all(&fetcher, &locators, 3).await;

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(fetcher.peak_in_flight() <= 3);
    assert!(fetcher.peak_in_flight() >= 2);
    assert_eq!(fetcher.call_count(), 8);
}
