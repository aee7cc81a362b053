//! # reportgen_assets
//!
//! Remote image retrieval for reportgen.
//!
//! Image placeholders in a template point at remote resources. This crate
//! fetches them:
//!
//! - **AssetFetcher**: the async seam the renderer calls, one attempt per locator
//! - **HttpAssetFetcher**: reqwest-backed implementation with timeout and size limit
//! - **MockFetcher**: scripted implementation for tests
//! - **fetch_all**: bounded concurrent retrieval that keeps result order
//!
//! ## Example
//!
//! ```rust,no_run
//! use reportgen_assets::{AssetFetcher, FetchOptions, HttpAssetFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpAssetFetcher::new(FetchOptions::new().timeout_secs(10))?;
//!     let bytes = fetcher.fetch("https://example.com/logo.png").await?;
//!     println!("{} bytes", bytes.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fetcher;
pub mod http;
pub mod mock;

pub use error::{AssetFetchFailure, FetchResult};
pub use fetcher::{fetch_all, AssetFetcher, DEFAULT_CONCURRENCY};
pub use http::{FetchOptions, HttpAssetFetcher};
pub use mock::MockFetcher;
