//! API error types and JSON error response formatting.
//!
//! ApiError gives every endpoint the same JSON error shape and maps chat
//! engine failures to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use huddle_chat::ChatError;
use huddle_core::error::HuddleError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - invalid parameters.
    BadRequest(String),
    /// 404 Not Found - resource does not exist.
    NotFound(String),
    /// 409 Conflict - unique value already in use.
    Conflict(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            ChatError::ConversationNotFound(_) => {
                ApiError::NotFound("Conversation not found".to_string())
            }
            ChatError::UnsupportedTopic(_) => ApiError::BadRequest("Sport not supported".to_string()),
            ChatError::InvalidUsername => ApiError::BadRequest(err.to_string()),
            ChatError::UsernameTaken(_) => ApiError::Conflict(err.to_string()),
            ChatError::StorageError(msg) => {
                tracing::error!(error = %msg, "Storage failure while handling request");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<HuddleError> for ApiError {
    fn from(err: HuddleError) -> Self {
        ApiError::from(ChatError::from(err))
    }
}
