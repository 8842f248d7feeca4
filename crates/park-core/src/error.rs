//! # Error Types
//!
//! Domain-specific error types for park-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  park-core errors (this file)                                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── FeeError         - Fee calculation failures                       │
//! │  └── ErrorClass       - Taxonomy shared by every layer                 │
//! │                                                                         │
//! │  park-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - Session start/end failures                     │
//! │                                                                         │
//! │  web errors (in app)                                                   │
//! │  └── ApiError         - What the client sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError/DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Error Class
// =============================================================================

/// Coarse classification of every error the service can produce.
///
/// Each layer's error type exposes a `class()` so the HTTP shell can pick a
/// status code without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or malformed input. Caller's fault, no store access made.
    Validation,
    /// Business-rule violation (slot occupied, session closed, duplicate).
    Conflict,
    /// Referenced entity does not exist.
    NotFound,
    /// No valid credentials.
    Unauthorized,
    /// Authenticated but not allowed.
    Forbidden,
    /// The store could not complete the operation.
    Storage,
}

// =============================================================================
// Fee Error
// =============================================================================

/// Fee calculation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// Exit timestamp precedes the entry timestamp (clock skew).
    ///
    /// A negative or silently-zeroed fee is never produced.
    #[error("Exit time {exit} is before entry time {entry}")]
    InvalidDuration { entry: String, exit: String },

    /// The fee does not fit in the money representation.
    #[error("Fee overflow for {hours} billable hours")]
    Overflow { hours: i64 },
}

impl FeeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FeeError::InvalidDuration { .. } => ErrorClass::Validation,
            FeeError::Overflow { .. } => ErrorClass::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., malformed phone number or email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields that must agree do not.
    #[error("{field} does not match {other}")]
    Mismatch { field: String, other: String },

    /// A time window whose end is not after its start.
    #[error("{field} must end after it starts")]
    InvalidWindow { field: String },
}

impl ValidationError {
    /// Shorthand for a [`ValidationError::Required`] on `field`.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("email");
        assert_eq!(err.to_string(), "email is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "password must be at least 8 characters");

        let err = ValidationError::Mismatch {
            field: "confirm password".to_string(),
            other: "password".to_string(),
        };
        assert_eq!(err.to_string(), "confirm password does not match password");
    }

    #[test]
    fn test_fee_error_message() {
        let err = FeeError::InvalidDuration {
            entry: "10:00".to_string(),
            exit: "09:00".to_string(),
        };
        assert_eq!(err.to_string(), "Exit time 09:00 is before entry time 10:00");
        assert_eq!(err.class(), ErrorClass::Validation);
    }
}
