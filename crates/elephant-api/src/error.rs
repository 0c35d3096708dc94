//! HTTP error mapping.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use elephant_core::Relationship;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by handlers, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// The pair is already linked; the stored document is returned alongside
    #[error("Relationship already exists between these items")]
    Conflict(Box<Relationship>),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Internal(elephant_core::Error),
}

impl From<elephant_core::Error> for ApiError {
    fn from(err: elephant_core::Error) -> Self {
        match err {
            elephant_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            elephant_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            elephant_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            elephant_core::Error::RelationshipExists(existing) => ApiError::Conflict(existing),
            other => ApiError::Internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(format!("Failed to read upload: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            ApiError::Conflict(existing) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Relationship already exists between these items",
                    "relationship": existing,
                }),
            ),
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
