//! # Tandem Web
//!
//! HTTP surface of the tandem aggregation service.
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `GET` | `/api/v1/frontend` | `{"Api1", "Api2"}` |
//! | `POST` | `/api/v1/frontend` | `{"Api1", "Api2", "InputData"}` after persisting the triple |
//!
//! Failures are rendered by [`error::ApiError`] as `{"error", "code"}`.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, MethodRouter};
use axum::Router;
use tandem_core::{ApiUrls, CachedFetcher, FetchCoordinator, FileResultSink, ResultSink};

use crate::config::ServerConfig;

pub use crate::error::{ApiError, ErrorBody};

/// Shared handler state. Cloned per request; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<FetchCoordinator>,
    pub urls: ApiUrls,
    pub sink: Arc<dyn ResultSink>,
}

impl AppState {
    pub fn new(coordinator: FetchCoordinator, urls: ApiUrls, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            urls,
            sink,
        }
    }

    /// Production wiring: reqwest transport, default retry policy, a fresh
    /// one-minute cache and the file sink.
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut coordinator = FetchCoordinator::new(Arc::new(CachedFetcher::default()));
        if let Some(timeout) = config.request_timeout() {
            coordinator = coordinator.with_timeout(timeout);
        }

        Self::new(
            coordinator,
            config.api_urls(),
            Arc::new(FileResultSink::new(config.results_path.clone())),
        )
    }
}

fn frontend() -> MethodRouter<AppState> {
    get(routes::get_frontend)
        .post(routes::post_frontend)
        .fallback(routes::method_not_allowed)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/frontend", frontend())
        .route("/api/v1/FrontEnd", frontend())
        .fallback(routes::not_found)
        .with_state(state)
}
