//! Gateway error responses.
//!
//! Bodies are `{"message": ...}` with the wording a managed gateway uses, so
//! clients see the same responses locally as they would when deployed.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No route matches the path and verb.
    #[error("no route for {verb} {path}")]
    MissingAuthenticationToken { verb: String, path: String },

    /// The route needs an API key and the request has none or a wrong one.
    #[error("missing or invalid api key")]
    Forbidden,

    /// `retry_after` is whole seconds until the bucket holds a token again.
    #[error("throttled on {method}")]
    TooManyRequests { method: String, retry_after: u64 },

    #[error("invalid request body: {}", .0.join("; "))]
    InvalidBody(Vec<String>),

    /// The compute handler failed.
    #[error("handler failed: {0}")]
    BadGateway(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuthenticationToken { .. } | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingAuthenticationToken { .. } => "Missing Authentication Token",
            Self::Forbidden => "Forbidden",
            Self::TooManyRequests { .. } => "Too Many Requests",
            Self::InvalidBody(_) => "Invalid request body",
            Self::BadGateway(_) | Self::Internal(_) => "Internal server error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let mut resp = (
            status,
            Json(ErrorBody {
                message: self.public_message(),
            }),
        )
            .into_response();
        if let Self::TooManyRequests { retry_after, .. } = &self {
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after));
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let route = ApiError::MissingAuthenticationToken {
            verb: "GET".into(),
            path: "/x".into(),
        };
        assert_eq!(route.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(route.public_message(), "Missing Authentication Token");
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::TooManyRequests {
                method: "m".into(),
                retry_after: 1
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError::InvalidBody(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::BadGateway("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn throttled_response_carries_retry_after() {
        let resp = ApiError::TooManyRequests {
            method: "m".into(),
            retry_after: 3,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "3");

        let resp = ApiError::Forbidden.into_response();
        assert!(resp.headers().get(header::RETRY_AFTER).is_none());
    }
}
