//! Fork-join over the two aggregated upstream sources.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::fetcher::{FetchRequest, UpstreamFetcher};

/// Bodies of both upstream sources. Only produced when both fetches succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub source1: String,
    pub source2: String,
}

/// Runs both fetches concurrently and waits for the pair.
///
/// The first failure wins: the sibling fetch is dropped at that point,
/// which also cancels any backoff wait it is sitting in. An optional
/// deadline bounds the whole join the same way.
#[derive(Clone)]
pub struct FetchCoordinator {
    fetcher: Arc<dyn UpstreamFetcher>,
    timeout: Option<Duration>,
}

impl FetchCoordinator {
    pub fn new(fetcher: Arc<dyn UpstreamFetcher>) -> Self {
        Self {
            fetcher,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn fetch_all(
        &self,
        first: &FetchRequest,
        second: &FetchRequest,
    ) -> Result<FetchResult, FetchError> {
        let joined = async {
            tokio::try_join!(self.fetcher.call_api(first), self.fetcher.call_api(second))
        };

        let (source1, source2) = match self.timeout {
            Some(after) => tokio::time::timeout(after, joined)
                .await
                .map_err(|_| FetchError::Timeout { after })??,
            None => joined.await?,
        };

        Ok(FetchResult { source1, source2 })
    }
}
