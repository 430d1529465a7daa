//! Error types and handling
//!
//! Two layers live here:
//! - [`AccessError`] is returned by the access engine, the cascade editor and the
//!   role registry. It carries the domain taxonomy (configuration, conflict,
//!   persistence, invariant violations).
//! - [`AppError`] is the HTTP-facing error. Every `AccessError` converts into it and
//!   is rendered as a consistent JSON response.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors raised by the module access engine and role registry
#[derive(Debug, Error)]
pub enum AccessError {
    /// The module tree or service configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A role with the same slug already exists, or the name is reserved
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Update or delete attempted on a built-in role
    #[error("Cannot modify system role '{0}'")]
    SystemRoleProtected(String),

    /// Input could not be accepted (empty slug, malformed role name)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Module or role does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access store or role table could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A store call did not complete within the configured timeout
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// An edit targeted the admin role, the unauthenticated role or the logout module
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl AccessError {
    /// Whether this error came from the storage boundary
    pub fn is_persistence(&self) -> bool {
        matches!(self, AccessError::Persistence(_) | AccessError::Timeout(_))
    }
}

impl From<anyhow::Error> for AccessError {
    fn from(err: anyhow::Error) -> Self {
        AccessError::Persistence(format!("{:#}", err))
    }
}

/// Result type alias for engine and registry operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized - authentication required (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden - insufficient permissions (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict - resource already exists or state conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unprocessable entity - validation failed (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service unavailable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    /// Status code and error type identifier for this error
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::ValidationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
        }
    }

    /// Render the error with a `details` payload attached
    pub fn into_response_with_details(self, details: Option<serde_json::Value>) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() || status == StatusCode::FORBIDDEN {
            error!(error = %self, error_type = error_type, "Request error");
        }

        let mut body = ErrorResponse::new(error_type, self.to_string());
        body.details = details;

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with_details(None)
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        let message = err.to_string();
        match err {
            AccessError::Config(_) => AppError::Config(message),
            AccessError::Conflict(_) => AppError::Conflict(message),
            AccessError::SystemRoleProtected(_) => AppError::Forbidden(message),
            AccessError::Validation(_) => AppError::ValidationError(message),
            AccessError::NotFound(_) => AppError::NotFound(message),
            AccessError::Persistence(_) => AppError::Database(message),
            AccessError::Timeout(_) => AppError::ServiceUnavailable(message),
            AccessError::InvariantViolation(_) => AppError::BadRequest(message),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.message().contains("UNIQUE constraint failed") {
                    AppError::Conflict("Resource already exists".to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
