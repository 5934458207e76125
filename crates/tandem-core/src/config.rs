use std::time::Duration;

use crate::fetcher::FetchRequest;

/// How long a fetched upstream body stays in the cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Retries after the first attempt (4 attempts total).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Wait before the first retry; each later retry doubles it.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);

pub const API1_CACHE_KEY: &str = "api1Data";
pub const API2_CACHE_KEY: &str = "api2Data";

/// Upstream URLs for the two aggregated sources (`ApiUrls:Api1` and
/// `ApiUrls:Api2`). Either may be absent; fetching an absent one fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiUrls {
    pub api1: Option<String>,
    pub api2: Option<String>,
}

impl ApiUrls {
    pub fn new(api1: impl Into<String>, api2: impl Into<String>) -> Self {
        Self {
            api1: Some(api1.into()),
            api2: Some(api2.into()),
        }
    }

    /// The pair of fetches the aggregation endpoint issues.
    pub fn requests(&self) -> (FetchRequest, FetchRequest) {
        (
            FetchRequest::new(API1_CACHE_KEY, self.api1.clone()),
            FetchRequest::new(API2_CACHE_KEY, self.api2.clone()),
        )
    }
}
