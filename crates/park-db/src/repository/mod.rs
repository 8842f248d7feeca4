//! # Repository Module
//!
//! Database repository implementations for the parking service.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.vehicles().list_for_customer(42)                           │
//! │       ▼                                                                 │
//! │  VehicleRepository                                                     │
//! │  ├── create(&self, new)                                                │
//! │  ├── delete(&self, id, owner)                                          │
//! │  └── set_default(&self, id, owner)                                     │
//! │       │                                                                 │
//! │       │  SQL Query (FromRow row struct → domain type)                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Occupancy and session exit/fee are NOT written here: only the         │
//! │  SessionLedger (crate::ledger) touches those columns.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerRepository`](customer::CustomerRepository) - Accounts and credentials
//! - [`VehicleRepository`](vehicle::VehicleRepository) - Vehicles and default flags
//! - [`SlotRepository`](slot::SlotRepository) - Slot catalogue
//! - [`SessionRepository`](session::SessionRepository) - Session reads
//! - [`ReservationRepository`](reservation::ReservationRepository) - Bookings
//! - [`StatsRepository`](stats::StatsRepository) - Dashboard aggregates

pub mod customer;
pub mod reservation;
pub mod session;
pub mod slot;
pub mod stats;
pub mod vehicle;
