//! # park-core: Pure Domain Logic for the Parking Service
//!
//! This crate holds the domain model of the parking lot: slots, vehicles,
//! parking sessions, reservations and accounts, plus the fee calculator and
//! input validation. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parking Service Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/web (axum)                              │   │
//! │  │    register, login, vehicles, sessions/start, sessions/end ...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ park-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    fee    │  │ validation│  │   │
//! │  │   │  Slot     │  │   Money   │  │ FeePolicy │  │   rules   │  │   │
//! │  │   │  Session  │  │           │  │  Rounding │  │   checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    park-db (Database Layer)                     │   │
//! │  │         SQLite queries, migrations, Session Ledger              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ParkingSlot, ParkingSession, Vehicle, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`fee`] - Parking fee calculation
//! - [`clock`] - Time source abstraction
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use park_core::fee::FeePolicy;
//!
//! let policy = FeePolicy::default(); // 100.00 per started hour
//! let entry = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
//! let exit = entry + Duration::minutes(61);
//!
//! let fee = policy.calculate(entry, exit).unwrap();
//! assert_eq!(fee.cents(), 20_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod fee;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorClass, FeeError, ValidationError};
pub use fee::{FeePolicy, Rounding};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default hourly parking rate in minor units (100.00).
pub const DEFAULT_HOURLY_RATE_CENTS: i64 = 10_000;

/// Minimum password length for customer accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;
