//! Translation of pipeline failures into HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tandem_core::FetchError;
use thiserror::Error;

const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

/// Boundary error for request handlers.
///
/// Handlers propagate [`FetchError`] with `?`; conversion into a response
/// happens once, here.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] FetchError);

impl ApiError {
    /// First matching rule wins: upstream 429, other upstream failures,
    /// authorization, invalid argument, unknown route or method, everything
    /// else.
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            error if error.upstream_status() == Some(429) => StatusCode::TOO_MANY_REQUESTS,
            error if error.is_upstream() => StatusCode::BAD_GATEWAY,
            FetchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FetchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            FetchError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Unclassified failures get a generic text so
    /// io and serialization details stay in the log.
    pub fn public_message(&self) -> String {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            String::from(UNEXPECTED_ERROR_MESSAGE)
        } else {
            self.0.to_string()
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.public_message(),
            code: self.status_code().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(
            status = status.as_u16(),
            error = %self.0,
            detail = ?self.0,
            "request failed"
        );

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn status_of(error: FetchError) -> StatusCode {
        ApiError::from(error).status_code()
    }

    #[test]
    fn rate_limited_upstream_maps_to_429() {
        let exhausted = FetchError::UpstreamTransient {
            status: Some(429),
            attempts: 4,
            message: String::from("too many requests"),
        };
        let terminal = FetchError::UpstreamTerminal {
            status: Some(429),
            message: String::from("too many requests"),
        };

        assert_eq!(status_of(exhausted), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_of(terminal), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn other_upstream_failures_map_to_502() {
        let cases = [
            FetchError::UpstreamTransient {
                status: Some(503),
                attempts: 4,
                message: String::from("unavailable"),
            },
            FetchError::UpstreamTerminal {
                status: Some(401),
                message: String::from("upstream rejected credentials"),
            },
            FetchError::UpstreamTerminal {
                status: None,
                message: String::from("dns failure"),
            },
            FetchError::Timeout {
                after: Duration::from_secs(60),
            },
        ];

        for error in cases {
            assert_eq!(status_of(error), StatusCode::BAD_GATEWAY);
        }
    }

    #[test]
    fn local_failures_map_by_kind() {
        assert_eq!(
            status_of(FetchError::Unauthorized(String::from("no token"))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(FetchError::InvalidArgument(String::from("bad"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FetchError::NotFound(String::from("/nope"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(FetchError::MethodNotAllowed(String::from("PUT /api/v1/frontend"))),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            status_of(FetchError::Internal(String::from("bug"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(FetchError::MissingUrl {
                cache_key: String::from("api1Data")
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unclassified_failures_hide_details() {
        let error = ApiError::from(FetchError::Persistence(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/srv/secret/results.txt: permission denied",
        )));

        let body = error.body();

        assert_eq!(body.code, 500);
        assert_eq!(body.error, UNEXPECTED_ERROR_MESSAGE);
    }

    #[test]
    fn classified_failures_expose_message_and_code() {
        let error = ApiError::from(FetchError::UpstreamTerminal {
            status: Some(404),
            message: String::from("https://api1.test responded with status 404"),
        });

        let body = error.body();

        assert_eq!(body.code, 502);
        assert!(body.error.contains("status 404"));
    }
}
