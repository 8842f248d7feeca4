//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Web Shell                          │
//! │                                                                         │
//! │  Handler                                                                │
//! │  Result<Json<T>, ApiError>                                              │
//! │         │                                                               │
//! │         ├── ValidationError ───────────────► 400 VALIDATION_ERROR       │
//! │         ├── missing / bad token ───────────► 401 UNAUTHORIZED           │
//! │         ├── wrong role ────────────────────► 403 FORBIDDEN              │
//! │         ├── DbError::NotFound ─────────────► 404 NOT_FOUND              │
//! │         ├── duplicate / occupied / closed ─► 409 CONFLICT               │
//! │         └── storage fault ─────────────────► 500 INTERNAL (logged only) │
//! │                                                                         │
//! │  Body: { "code": "CONFLICT", "message": "Slot S101 is occupied" }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use park_core::{ErrorClass, ValidationError};
use park_db::{DbError, LedgerError};

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Vehicle not found: 12"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Not logged in or bad credentials (401)
    Unauthorized,

    /// Logged in with the wrong role (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// State conflict: duplicate, occupied slot, closed session (409)
    Conflict,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorClass> for ErrorCode {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Validation => ErrorCode::ValidationError,
            ErrorClass::Conflict => ErrorCode::Conflict,
            ErrorClass::NotFound => ErrorCode::NotFound,
            ErrorClass::Unauthorized => ErrorCode::Unauthorized,
            ErrorClass::Forbidden => ErrorCode::Forbidden,
            ErrorClass::Storage => ErrorCode::Internal,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden() -> Self {
        ApiError::new(ErrorCode::Forbidden, "You do not have access to this page")
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Conflict, message)
    }

    /// Creates an internal error. The detail is logged, not returned.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        ApiError::new(ErrorCode::Internal, "Something went wrong, please try again")
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err.class() {
            ErrorClass::Storage => ApiError::internal(&err),
            class => ApiError::new(class.into(), err.to_string()),
        }
    }
}

/// Converts ledger errors to API errors.
impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Db(e) => e.into(),
            other => match other.class() {
                ErrorClass::Storage => ApiError::internal(&other),
                class => ApiError::new(class.into(), other.to_string()),
            },
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use park_db::StartFailure;

    #[test]
    fn test_db_errors_map_to_status() {
        let err: ApiError = DbError::not_found("Vehicle", 12).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Vehicle not found: 12");

        let err: ApiError = DbError::duplicate("email", "jane@example.com").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_ledger_errors_map_to_status() {
        let err: ApiError = LedgerError::SessionStartFailed {
            cause: StartFailure::SlotUnavailable,
            message: "Slot S101 is already occupied".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.message.contains("S101"));

        let err: ApiError = LedgerError::SessionStartFailed {
            cause: StartFailure::MissingFields,
            message: "slot is required".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = LedgerError::SessionNotFound { session_id: 9 }.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = LedgerError::SessionEndFailed {
            session_id: 9,
            message: "slot was not occupied".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let err: ApiError = ValidationError::required("email").into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
