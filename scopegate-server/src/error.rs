//! Error types for the HTTP API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scopegate_core::{DenyReason, ScopeGateError};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),

    /// The authorization procedure denied the request
    Denied(DenyReason),

    /// ScopeGate core error
    Core(ScopeGateError),

    /// Serialization error
    SerializationError(serde_json::Error),
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::Denied(reason) => write!(f, "Denied: {:?}", reason),
            ApiError::Core(e) => write!(f, "ScopeGate error: {}", e),
            ApiError::SerializationError(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ScopeGateError> for ApiError {
    fn from(err: ScopeGateError) -> Self {
        ApiError::Core(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::SerializationError(err)
    }
}

const GENERIC_INTERNAL: &str = "an internal error occurred";

fn core_error_parts(err: ScopeGateError) -> (StatusCode, &'static str, String) {
    match err {
        ScopeGateError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
        ScopeGateError::InvalidToken => (
            StatusCode::FORBIDDEN,
            "invalid_token",
            ScopeGateError::InvalidToken.to_string(),
        ),
        ScopeGateError::Unauthorized => (
            StatusCode::FORBIDDEN,
            "forbidden",
            ScopeGateError::Unauthorized.to_string(),
        ),
        e if e.is_client_error() => (StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
        e => {
            // upstream detail stays in the logs
            error!("internal error: {}", e);
            crate::metrics::record_error("internal_error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                GENERIC_INTERNAL.to_string(),
            )
        }
    }
}

fn denied_parts(reason: DenyReason) -> (StatusCode, &'static str, String) {
    match reason {
        DenyReason::InvalidRequest => (
            StatusCode::BAD_REQUEST,
            "bad_request",
            "invalid method or URI".to_string(),
        ),
        DenyReason::InvalidToken => (
            StatusCode::FORBIDDEN,
            "invalid_token",
            "invalid token".to_string(),
        ),
        DenyReason::Unauthorized => (
            StatusCode::FORBIDDEN,
            "forbidden",
            "access: invalid token or unauthorized".to_string(),
        ),
        DenyReason::IntrospectionFailed | DenyReason::PolicyUnavailable => {
            crate::metrics::record_error("collaborator_unavailable");
            (
                StatusCode::FORBIDDEN,
                "internal_error",
                GENERIC_INTERNAL.to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
            ApiError::Denied(reason) => denied_parts(reason),
            ApiError::Core(e) => core_error_parts(e),
            ApiError::SerializationError(e) => {
                let msg = format!("Invalid JSON: {}", e);
                (StatusCode::BAD_REQUEST, "invalid_json", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
