//! Bounded retry with exponential backoff for upstream HTTP calls.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DEFAULT_BACKOFF_BASE, DEFAULT_MAX_RETRIES};
use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse};

/// Backoff strategy between retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The wait before the first retry.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: DEFAULT_BACKOFF_BASE,
            factor: 2.0,
            max: Duration::from_secs(60),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before retry `attempt` (0-based: 0 is the first retry).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds);

                if !jitter {
                    return delay;
                }

                let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                let total_ms = delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                Duration::from_millis(total_ms.max(0) as u64)
            }
        }
    }
}

/// Classification of a single upstream attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable,
    Terminal,
}

/// One scheduled retry: which retry it is, what triggered it and how long
/// the policy waits before issuing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based retry number.
    pub attempt: u32,
    /// Status of the failed attempt, `None` for transport failures.
    pub status: Option<u16>,
    pub reason: String,
    pub wait: Duration,
}

/// Configuration for the retry loop.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Non-5xx statuses that are retried (408 and 429 by default).
    pub retry_on_status: Vec<u16>,
    /// Whether every 5xx status is retried.
    pub retry_on_server_errors: bool,
    pub retry_on_timeout: bool,
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429],
            retry_on_server_errors: true,
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        (self.retry_on_server_errors && (500..600).contains(&status))
            || self.retry_on_status.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    pub fn classify(&self, outcome: &Result<HttpResponse, HttpError>) -> AttemptOutcome {
        match outcome {
            Ok(response) if response.is_success() => AttemptOutcome::Success,
            Ok(response) if self.should_retry_status(response.status) => AttemptOutcome::Retryable,
            Ok(_) => AttemptOutcome::Terminal,
            Err(error) => match error.kind() {
                HttpErrorKind::Timeout if self.retry_on_timeout => AttemptOutcome::Retryable,
                HttpErrorKind::Connect if self.retry_on_connect => AttemptOutcome::Retryable,
                _ => AttemptOutcome::Terminal,
            },
        }
    }
}

type RetryObserver = Arc<dyn Fn(&RetryAttempt) + Send + Sync>;

/// Wraps an upstream call with the retry loop described by [`RetryConfig`].
#[derive(Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
    observer: Option<RetryObserver>,
}

impl Debug for RetryPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Registers a callback invoked once per scheduled retry, before the wait.
    pub fn with_observer(mut self, observer: impl Fn(&RetryAttempt) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Issues a GET for `url` through `client`, retrying transient failures.
    ///
    /// Errors and retry logs name the request by `label`, never by `url`.
    pub async fn get(
        &self,
        client: &dyn HttpClient,
        label: &str,
        url: &str,
    ) -> Result<String, FetchError> {
        self.execute(label, || client.execute(HttpRequest::get(url)))
            .await
    }

    /// Runs `op` until it succeeds, fails terminally, or retries run out.
    ///
    /// Returns the body of the first 2xx response. `label` only shows up in
    /// logs and error messages.
    pub async fn execute<F, Fut>(&self, label: &str, mut op: F) -> Result<String, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse, HttpError>>,
    {
        let mut retries = 0u32;

        loop {
            let outcome = op().await;
            let class = self.config.classify(&outcome);

            let (status, reason) = match outcome {
                Ok(response) if class == AttemptOutcome::Success => return Ok(response.body),
                Ok(response) => (
                    Some(response.status),
                    format!("{label} responded with status {}", response.status),
                ),
                Err(error) => (None, format!("{label}: {}", error.message())),
            };

            if class == AttemptOutcome::Terminal {
                return Err(FetchError::UpstreamTerminal {
                    status,
                    message: reason,
                });
            }

            if !self.config.enabled || retries >= self.config.max_retries {
                return Err(FetchError::UpstreamTransient {
                    status,
                    attempts: retries + 1,
                    message: reason,
                });
            }

            let wait = self.config.delay_for_attempt(retries);
            retries += 1;

            let attempt = RetryAttempt {
                attempt: retries,
                status,
                reason,
                wait,
            };
            tracing::warn!(
                attempt = attempt.attempt,
                status = ?attempt.status,
                wait_secs = wait.as_secs_f64(),
                reason = %attempt.reason,
                "retrying upstream request"
            );
            if let Some(observer) = &self.observer {
                observer(&attempt);
            }

            tokio::time::sleep(wait).await;
        }
    }
}
