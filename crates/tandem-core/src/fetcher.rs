//! Get-or-fetch for a single logical upstream source.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::error::FetchError;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::RetryPolicy;

/// One upstream fetch: the cache slot it fills and the URL it reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub cache_key: String,
    pub url: Option<String>,
}

impl FetchRequest {
    pub fn new(cache_key: impl Into<String>, url: Option<String>) -> Self {
        Self {
            cache_key: cache_key.into(),
            url,
        }
    }
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// Fetches the body for a [`FetchRequest`], possibly from cache.
pub trait UpstreamFetcher: Send + Sync {
    fn call_api<'a>(&'a self, request: &'a FetchRequest) -> FetchFuture<'a>;
}

/// Production fetcher: cache lookup first, then a retried GET on a miss.
pub struct CachedFetcher {
    client: Arc<dyn HttpClient>,
    retry: RetryPolicy,
    cache: ResponseCache,
    ttl: Duration,
}

impl Default for CachedFetcher {
    fn default() -> Self {
        Self::new(
            Arc::new(ReqwestHttpClient::default()),
            RetryPolicy::default(),
            ResponseCache::with_default_ttl(),
        )
    }
}

impl CachedFetcher {
    pub fn new(client: Arc<dyn HttpClient>, retry: RetryPolicy, cache: ResponseCache) -> Self {
        let ttl = cache.default_ttl();
        Self {
            client,
            retry,
            cache,
            ttl,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

impl UpstreamFetcher for CachedFetcher {
    fn call_api<'a>(&'a self, request: &'a FetchRequest) -> FetchFuture<'a> {
        Box::pin(async move {
            let url = request
                .url
                .as_deref()
                .ok_or_else(|| FetchError::MissingUrl {
                    cache_key: request.cache_key.clone(),
                })?;

            let label = request.cache_key.as_str();
            self.cache
                .get_or_compute(
                    label,
                    || {
                        tracing::debug!(source = label, url, "fetching upstream");
                        self.retry.get(self.client.as_ref(), label, url)
                    },
                    self.ttl,
                )
                .await
        })
    }
}
