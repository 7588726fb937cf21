//! Mapping of core failures onto HTTP responses

use crate::error::ArenaError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors produced by request handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error("Missing or empty x-actor-id header")]
    MissingActor,

    #[error("Malformed request body: {0}")]
    InvalidBody(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Arena(e) => match e {
                ArenaError::InsufficientPool { .. } => StatusCode::CONFLICT,
                ArenaError::InvalidVote { .. } | ArenaError::InvalidRecord { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ArenaError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                ArenaError::StoreUnavailable { .. } | ArenaError::ConcurrentModification { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ArenaError::ConfigurationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::MissingActor => StatusCode::UNAUTHORIZED,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Arena(e) => e.kind(),
            ApiError::MissingActor => "missing_actor",
            ApiError::InvalidBody(_) => "invalid_body",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });

        let retry_after = match &self {
            ApiError::Arena(ArenaError::RateLimited { retry_after }) => {
                let secs = retry_after.as_secs().max(1);
                body["retry_after_seconds"] = json!(secs);
                Some(secs)
            }
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ArenaError::InsufficientPool {
                    category: "x".into(),
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (ArenaError::invalid_vote("self"), StatusCode::BAD_REQUEST),
            (ArenaError::invalid_record("bad"), StatusCode::BAD_REQUEST),
            (
                ArenaError::RateLimited {
                    retry_after: Duration::from_secs(60),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (ArenaError::store("down"), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::MissingActor.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::from(ArenaError::RateLimited {
            retry_after: Duration::from_secs(43_200),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "43200");
    }
}
