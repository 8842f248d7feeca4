//! # Database Error Types
//!
//! Error types for database operations and the session ledger.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► LedgerError (this module) ← start/end transition failures   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in web app) ← Serialized for the client                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use park_core::{ErrorClass, FeeError};
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering an email or phone that is taken
    /// - Adding a slot number twice
    /// - Same plate twice for one customer
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a vehicle that has recorded sessions
    /// - Referencing a slot or customer that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A business rule checked against stored state failed
    /// (overlapping reservation and similar).
    #[error("{0}")]
    Conflict(String),

    /// A stored row decodes to no valid domain value.
    #[error("Corrupt {entity} row: {id}")]
    CorruptRow { entity: String, id: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DbError::NotFound { .. } => ErrorClass::NotFound,
            DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::Conflict(_) => ErrorClass::Conflict,
            _ => ErrorClass::Storage,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error codes for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Errors
// =============================================================================

/// Why a session could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    /// Vehicle or slot reference absent. No store access was made.
    MissingFields,
    /// Slot missing or already occupied, including a lost race.
    SlotUnavailable,
    /// Vehicle missing or already parked in another slot.
    VehicleUnavailable,
    /// The transaction could not be completed.
    StorageFailure,
}

impl fmt::Display for StartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StartFailure::MissingFields => "missing fields",
            StartFailure::SlotUnavailable => "slot unavailable",
            StartFailure::VehicleUnavailable => "vehicle unavailable",
            StartFailure::StorageFailure => "storage failure",
        };
        f.write_str(s)
    }
}

/// Errors from the session ledger's start and end transitions.
///
/// Every variant is returned only after the transaction has been rolled back.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Could not start session ({cause}): {message}")]
    SessionStartFailed { cause: StartFailure, message: String },

    #[error("Session {session_id} not found")]
    SessionNotFound { session_id: i64 },

    #[error("Session {session_id} is already closed")]
    SessionAlreadyClosed { session_id: i64 },

    /// The fee could not be computed (exit before entry, overflow).
    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error("Could not end session {session_id}: {message}")]
    SessionEndFailed { session_id: i64, message: String },

    /// A read-only ledger query failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl LedgerError {
    pub(crate) fn start(cause: StartFailure, message: impl Into<String>) -> Self {
        LedgerError::SessionStartFailed {
            cause,
            message: message.into(),
        }
    }

    pub(crate) fn end(session_id: i64, message: impl Into<String>) -> Self {
        LedgerError::SessionEndFailed {
            session_id,
            message: message.into(),
        }
    }

    /// The start failure cause, if this is a start failure.
    pub fn start_cause(&self) -> Option<StartFailure> {
        match self {
            LedgerError::SessionStartFailed { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::SessionStartFailed { cause, .. } => match cause {
                StartFailure::MissingFields => ErrorClass::Validation,
                StartFailure::SlotUnavailable | StartFailure::VehicleUnavailable => {
                    ErrorClass::Conflict
                }
                StartFailure::StorageFailure => ErrorClass::Storage,
            },
            LedgerError::SessionNotFound { .. } => ErrorClass::NotFound,
            LedgerError::SessionAlreadyClosed { .. } => ErrorClass::Conflict,
            LedgerError::Fee(e) => e.class(),
            LedgerError::SessionEndFailed { .. } => ErrorClass::Storage,
            LedgerError::Db(e) => e.class(),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
