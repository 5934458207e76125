//! Handlers for `/api/v1/frontend`.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tandem_core::{FetchError, FetchResult, ResultRecord};

use crate::error::ApiError;
use crate::AppState;

pub const MIN_DATA_LEN: usize = 5;
pub const MAX_DATA_LEN: usize = 100;
pub const INVALID_DATA_MESSAGE: &str = "The data length must be between 5 and 100 characters.";

/// Combined upstream payload returned on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FrontEndResponse {
    pub api1: String,
    pub api2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<String>,
}

/// Body of the input validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationBody {
    pub error: String,
}

pub async fn get_frontend(State(state): State<AppState>) -> Result<Json<FrontEndResponse>, ApiError> {
    let started = Instant::now();
    let result = fetch_sources(&state).await?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "aggregated upstream sources"
    );
    Ok(Json(FrontEndResponse {
        api1: result.source1,
        api2: result.source2,
        input_data: None,
    }))
}

pub async fn post_frontend(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let body = std::str::from_utf8(&body)
        .map_err(|_| FetchError::InvalidArgument(String::from("request body is not valid UTF-8")))?;

    let Some(data) = parse_input(body).filter(|data| is_valid_length(data)) else {
        tracing::info!(length = body.chars().count(), "rejected input data");
        let rejection = ValidationBody {
            error: String::from(INVALID_DATA_MESSAGE),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(rejection)).into_response());
    };

    let started = Instant::now();
    let result = fetch_sources(&state).await?;

    state
        .sink
        .write(ResultRecord::new(
            result.source1.clone(),
            result.source2.clone(),
            data.clone(),
        ))
        .await?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        input_len = data.chars().count(),
        "aggregated upstream sources with input"
    );
    Ok(Json(FrontEndResponse {
        api1: result.source1,
        api2: result.source2,
        input_data: Some(data),
    })
    .into_response())
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::from(FetchError::NotFound(format!("no route for {}", uri.path())))
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::from(FetchError::MethodNotAllowed(format!("{method} {}", uri.path())))
}

async fn fetch_sources(state: &AppState) -> Result<FetchResult, FetchError> {
    let (first, second) = state.urls.requests();
    state.coordinator.fetch_all(&first, &second).await
}

/// Extracts the submitted text from a request body.
///
/// A JSON string literal is unwrapped, JSON `null` and an empty body count
/// as no input, anything else is taken verbatim.
pub fn parse_input(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(text)) => Some(text),
        Ok(serde_json::Value::Null) => None,
        _ => Some(body.to_string()),
    }
}

/// Length bounds are inclusive and counted in Unicode scalar values, so an
/// astral-plane character such as an emoji counts once rather than as a
/// UTF-16 surrogate pair.
pub fn is_valid_length(data: &str) -> bool {
    (MIN_DATA_LEN..=MAX_DATA_LEN).contains(&data.chars().count())
}
