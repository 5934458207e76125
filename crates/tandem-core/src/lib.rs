//! # Tandem Core
//!
//! Cached, retrying, concurrent upstream fetching for the tandem
//! aggregation endpoint.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | In-memory response cache with per-entry expiry |
//! | [`config`] | Upstream URLs and pipeline constants |
//! | [`coordinator`] | Concurrent fetch of both sources |
//! | [`error`] | Failure taxonomy |
//! | [`fetcher`] | Get-or-fetch for a single source |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`persistence`] | Result sink for submitted input |
//! | [`retry`] | Retry policy with exponential backoff |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ FetchCoordinator │  try_join of two sources
//! └────────┬─────────┘
//!          │ (x2, concurrent)
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │  CachedFetcher   │────▶│  ResponseCache   │
//! └────────┬─────────┘     └──────────────────┘
//!          │ miss
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   RetryPolicy    │────▶│   HttpClient     │
//! └──────────────────┘     │ (reqwest)        │
//!                          └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tandem_core::{ApiUrls, CachedFetcher, FetchCoordinator};
//!
//! let coordinator = FetchCoordinator::new(Arc::new(CachedFetcher::default()));
//! let urls = ApiUrls::new("https://catfact.ninja/fact", "https://catfact.ninja/breeds");
//! let (first, second) = urls.requests();
//! let result = coordinator.fetch_all(&first, &second).await?;
//! println!("{} / {}", result.source1, result.source2);
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod persistence;
pub mod retry;

pub use cache::ResponseCache;
pub use config::{
    ApiUrls, API1_CACHE_KEY, API2_CACHE_KEY, DEFAULT_BACKOFF_BASE, DEFAULT_CACHE_TTL,
    DEFAULT_MAX_RETRIES,
};
pub use coordinator::{FetchCoordinator, FetchResult};
pub use error::FetchError;
pub use fetcher::{CachedFetcher, FetchFuture, FetchRequest, UpstreamFetcher};
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpFuture, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use persistence::{FileResultSink, ResultRecord, ResultSink, SinkFuture};
pub use retry::{AttemptOutcome, Backoff, RetryAttempt, RetryConfig, RetryPolicy};
