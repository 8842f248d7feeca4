//! # park-db: Database Layer for the Parking Service
//!
//! This crate provides database access for the parking service, including
//! the session ledger that keeps slot occupancy and parking sessions in step.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parking Service Data Flow                        │
//! │                                                                         │
//! │  HTTP handler (POST /sessions/start)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     park-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ customers     │    │  (embedded)  │  │   │
//! │  │   │               │    │ vehicles      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ slots         │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ sessions      │    │              │  │   │
//! │  │   │ Management    │    │ reservations  │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────▼──────────────────────────────────────────────────┐ │   │
//! │  │   │  SessionLedger (ledger.rs)                                │ │   │
//! │  │   │  start_session / end_session / check_consistency          │ │   │
//! │  │   │  sole writer of is_occupied, exit_time, total_fee_cents   │ │   │
//! │  │   └──────────────────────────────────────────────────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`ledger`] - Session start/end transitions and the consistency check
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use park_core::{FeePolicy, SystemClock};
//! use park_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("parking.db")).await?;
//! let ledger = db.ledger(FeePolicy::default(), Arc::new(SystemClock));
//!
//! let session_id = ledger.start_session(Some(vehicle_id), Some(slot_id)).await?;
//! let receipt = ledger.end_session(session_id).await?;
//! println!("fee: {}", receipt.fee);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult, StartFailure};
pub use ledger::{ConsistencyReport, SessionLedger, SessionReceipt, SlotViolation};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerCredentials, CustomerRepository, NewCustomer};
pub use repository::reservation::{NewReservation, ReservationDetails, ReservationRepository};
pub use repository::session::{SessionDetails, SessionRepository};
pub use repository::slot::{SlotOverview, SlotRepository};
pub use repository::stats::{
    CustomerDashboard, HistoryEntry, SessionHistory, StaffDashboard, StatsRepository,
};
pub use repository::vehicle::{NewVehicle, VehicleRepository, VehicleWithOwner};
