//! Behavior-driven tests for the fetch pipeline
//!
//! These tests drive the real cache, retry policy and coordinator against a
//! scripted transport, on a paused tokio clock so backoff and expiry are
//! deterministic.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tandem_core::{
    ApiUrls, CachedFetcher, FetchCoordinator, FetchError, HttpClient, HttpError, HttpFuture,
    HttpRequest, HttpResponse, ResponseCache, RetryAttempt, RetryPolicy, DEFAULT_CACHE_TTL,
};
use tokio::time::Instant;

const API1: &str = "https://api1.test/fact";
const API2: &str = "https://api2.test/breeds";

/// Transport that replays scripted outcomes per URL and counts calls.
#[derive(Default)]
struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Result<HttpResponse, HttpError>>>>,
    calls: Mutex<HashMap<String, u32>>,
    latency: Duration,
}

impl ScriptedClient {
    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn script(self, url: &str, outcomes: Vec<Result<HttpResponse, HttpError>>) -> Self {
        self.scripts
            .lock()
            .expect("lock")
            .insert(url.to_string(), VecDeque::from(outcomes));
        self
    }

    fn calls(&self, url: &str) -> u32 {
        self.calls.lock().expect("lock").get(url).copied().unwrap_or(0)
    }
}

impl HttpClient for ScriptedClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        *self
            .calls
            .lock()
            .expect("lock")
            .entry(request.url.clone())
            .or_default() += 1;
        let outcome = self
            .scripts
            .lock()
            .expect("lock")
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(HttpError::other(format!("unscripted request to {}", request.url))));
        let latency = self.latency;

        Box::pin(async move {
            tokio::time::sleep(latency).await;
            outcome
        })
    }
}

struct Pipeline {
    coordinator: FetchCoordinator,
    cache: ResponseCache,
    retries: Arc<Mutex<Vec<RetryAttempt>>>,
}

fn pipeline(client: Arc<ScriptedClient>) -> Pipeline {
    let retries = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&retries);
    let policy = RetryPolicy::default()
        .with_observer(move |attempt| recorded.lock().expect("lock").push(attempt.clone()));
    let cache = ResponseCache::with_default_ttl();
    let fetcher = CachedFetcher::new(client, policy, cache.clone());

    Pipeline {
        coordinator: FetchCoordinator::new(Arc::new(fetcher)),
        cache,
        retries,
    }
}

fn urls() -> ApiUrls {
    ApiUrls::new(API1, API2)
}

fn status(code: u16) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::new(code, ""))
}

fn body(text: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok(text))
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_sources_are_requested_twice_within_a_minute_upstreams_are_called_once() {
    // Given: Both upstreams answer once
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![body("a fact")])
            .script(API2, vec![body("some breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();

    // When: The pair is fetched twice
    let initial = pipeline.coordinator.fetch_all(&first, &second).await.expect("fetch");
    let repeat = pipeline.coordinator.fetch_all(&first, &second).await.expect("cached");

    // Then: The second fetch is served from cache
    assert_eq!(initial, repeat);
    assert_eq!(initial.source1, "a fact");
    assert_eq!(initial.source2, "some breeds");
    assert_eq!(client.calls(API1), 1);
    assert_eq!(client.calls(API2), 1);
}

#[tokio::test(start_paused = true)]
async fn when_cache_entry_expires_next_request_reaches_upstream_again() {
    // Given: A source that changes between calls
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![body("old fact"), body("new fact")])
            .script(API2, vec![body("breeds"), body("breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();
    pipeline.coordinator.fetch_all(&first, &second).await.expect("fetch");

    // When: The TTL elapses
    tokio::time::advance(DEFAULT_CACHE_TTL).await;
    let refreshed = pipeline.coordinator.fetch_all(&first, &second).await.expect("refresh");

    // Then: The refreshed value replaces the old one
    assert_eq!(refreshed.source1, "new fact");
    assert_eq!(client.calls(API1), 2);
    assert_eq!(pipeline.cache.get("api1Data").await.as_deref(), Some("new fact"));
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_upstream_recovers_after_transient_failures_caller_gets_body() {
    // Given: api1 fails twice with retryable statuses
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![status(500), status(408), body("finally")])
            .script(API2, vec![body("breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();
    let started = Instant::now();

    // When: The pair is fetched
    let result = pipeline.coordinator.fetch_all(&first, &second).await.expect("recovers");

    // Then: Two retries were scheduled with 2s and 4s waits
    assert_eq!(result.source1, "finally");
    let retries = pipeline.retries.lock().expect("lock");
    let waits: Vec<(u32, Option<u16>, Duration)> =
        retries.iter().map(|r| (r.attempt, r.status, r.wait)).collect();
    assert_eq!(
        waits,
        vec![
            (1, Some(500), Duration::from_secs(2)),
            (2, Some(408), Duration::from_secs(4)),
        ]
    );
    assert_eq!(started.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn when_upstream_keeps_rate_limiting_error_keeps_429_after_four_attempts() {
    // Given: api1 answers 429 to every attempt
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![status(429); 4])
            .script(API2, vec![body("breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();

    // When: The pair is fetched
    let error = pipeline.coordinator.fetch_all(&first, &second).await.expect_err("exhausted");

    // Then: Exactly three retries happened and the 429 is preserved
    assert_eq!(client.calls(API1), 4);
    assert_eq!(pipeline.retries.lock().expect("lock").len(), 3);
    assert_eq!(error.upstream_status(), Some(429));
    assert!(matches!(error, FetchError::UpstreamTransient { attempts: 4, .. }));
    assert!(pipeline.cache.get("api1Data").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn when_upstream_rejects_request_it_is_not_retried() {
    // Given: api1 answers 403
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![status(403)])
            .script(API2, vec![body("breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();

    // When: The pair is fetched
    let error = pipeline.coordinator.fetch_all(&first, &second).await.expect_err("terminal");

    // Then: One attempt, no retries, terminal classification
    assert_eq!(client.calls(API1), 1);
    assert!(pipeline.retries.lock().expect("lock").is_empty());
    assert!(matches!(error, FetchError::UpstreamTerminal { status: Some(403), .. }));
}

#[tokio::test(start_paused = true)]
async fn when_connection_drops_transiently_request_is_retried() {
    // Given: The first api2 attempt cannot connect
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![body("fact")])
            .script(API2, vec![Err(HttpError::connect("connection reset")), body("breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();

    // When: The pair is fetched
    let result = pipeline.coordinator.fetch_all(&first, &second).await.expect("recovers");

    // Then: The retry event records a transport failure without status
    assert_eq!(result.source2, "breeds");
    let retries = pipeline.retries.lock().expect("lock");
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].status, None);
    assert!(retries[0].reason.contains("connection reset"));
}

// =============================================================================
// Fork-join
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_both_upstreams_are_slow_total_latency_is_that_of_one() {
    // Given: Each upstream takes 5 seconds
    let client = Arc::new(
        ScriptedClient::default()
            .with_latency(Duration::from_secs(5))
            .script(API1, vec![body("fact")])
            .script(API2, vec![body("breeds")]),
    );
    let pipeline = pipeline(client);
    let (first, second) = urls().requests();
    let started = Instant::now();

    // When: The pair is fetched
    pipeline.coordinator.fetch_all(&first, &second).await.expect("fetch");

    // Then: Both ran concurrently
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn when_one_source_fails_sibling_is_cancelled_and_not_cached() {
    // Given: api1 fails terminally while api2 is still retrying
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![status(404)])
            .script(API2, vec![status(503), body("breeds")]),
    );
    let pipeline = pipeline(Arc::clone(&client));
    let (first, second) = urls().requests();

    // When: The pair is fetched and the clock runs well past api2's backoff
    let error = pipeline.coordinator.fetch_all(&first, &second).await.expect_err("api1 fails");
    tokio::time::sleep(Duration::from_secs(30)).await;

    // Then: api2 never issued its retry and nothing was cached for it
    assert_eq!(error.upstream_status(), Some(404));
    assert!(client.calls(API2) < 2, "api2 must not reach its retry");
    assert!(pipeline.cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn when_request_deadline_passes_fetch_fails_with_timeout() {
    // Given: api1 keeps failing and the request has a 10 second budget
    let client = Arc::new(
        ScriptedClient::default()
            .script(API1, vec![status(503); 4])
            .script(API2, vec![body("breeds")]),
    );
    let mut pipeline = pipeline(Arc::clone(&client));
    pipeline.coordinator = pipeline.coordinator.with_timeout(Duration::from_secs(10));
    let (first, second) = urls().requests();

    // When: The pair is fetched
    let error = pipeline.coordinator.fetch_all(&first, &second).await.expect_err("deadline");

    // Then: The retry loop was cut short during its third wait
    assert!(matches!(error, FetchError::Timeout { .. }));
    assert_eq!(client.calls(API1), 3);
}
