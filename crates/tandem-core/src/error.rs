use std::time::Duration;

use thiserror::Error;

/// Failure surfaced by the fetch pipeline.
///
/// Each variant is chosen where the failure happens (retry loop, fetcher,
/// coordinator, sink) so the HTTP boundary never has to guess from a message.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A retryable upstream failure (5xx, 408, 429, timeout, connect) that
    /// was still failing after every allowed retry.
    #[error("upstream request failed after {attempts} attempts: {message}")]
    UpstreamTransient {
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    /// A non-retryable upstream failure (other 4xx or a transport error
    /// outside the transient set). Surfaced on the first occurrence.
    #[error("upstream request failed: {message}")]
    UpstreamTerminal {
        status: Option<u16>,
        message: String,
    },

    #[error("upstream requests did not complete within {after:?}")]
    Timeout { after: Duration },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("no upstream url configured for '{cache_key}'")]
    MissingUrl { cache_key: String },

    #[error("failed to persist result: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FetchError {
    /// HTTP status observed on the upstream response, if the failure came
    /// from one.
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamTransient { status, .. } | Self::UpstreamTerminal { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Whether the failure originated at (or while waiting on) an upstream.
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTransient { .. } | Self::UpstreamTerminal { .. } | Self::Timeout { .. }
        )
    }
}
