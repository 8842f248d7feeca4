//! # Domain Types
//!
//! Core domain types used throughout the parking service.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Vehicle     │   │   ParkingSlot   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  customer_id    │◄──│  customer_id    │   │  slot_id        │       │
//! │  │  email (unique) │   │  license_plate  │   │  slot_number    │       │
//! │  │  phone (unique) │   │  is_default     │   │  slot_type      │       │
//! │  │  role           │   │                 │   │  is_occupied    │       │
//! │  └─────────────────┘   └────────▲────────┘   └────────▲────────┘       │
//! │                                 │                     │                 │
//! │                        ┌────────┴─────────────────────┴────────┐       │
//! │                        │           ParkingSession              │       │
//! │                        │  ───────────────────────────────────  │       │
//! │                        │  vehicle_id, slot_id, entry_time      │       │
//! │                        │  state: Active | Closed{exit, fee}    │       │
//! │                        └───────────────────────────────────────┘       │
//! │                                                                         │
//! │  Reservation: customer + vehicle + slot over [start_time, end_time)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Occupancy Invariant
//! `ParkingSlot.is_occupied` is true iff exactly one session referencing the
//! slot is in [`SessionState::Active`]. Only the session ledger in park-db
//! writes either side of that relation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Account role. Operators and admins are "staff".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Operator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Operator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Operator => "operator",
            Role::Admin => "admin",
        }
    }

    /// Operators and admins may run the lot.
    #[inline]
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Operator | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Slot Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    #[default]
    Compact,
    Large,
    Motorcycle,
}

impl SlotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::Compact => "compact",
            SlotType::Large => "large",
            SlotType::Motorcycle => "motorcycle",
        }
    }

    /// Maps the values offered by the slot form onto stored slot types.
    ///
    /// `standard` and anything unrecognised become `Compact`; `handicap`
    /// and `electric` bays are `Large`.
    ///
    /// ```rust
    /// use park_core::SlotType;
    ///
    /// assert_eq!(SlotType::from_form("electric"), SlotType::Large);
    /// assert_eq!(SlotType::from_form("standard"), SlotType::Compact);
    /// assert_eq!(SlotType::from_form("hovercraft"), SlotType::Compact);
    /// ```
    pub fn from_form(value: &str) -> SlotType {
        match value.trim().to_ascii_lowercase().as_str() {
            "large" | "handicap" | "electric" => SlotType::Large,
            "motorcycle" => SlotType::Motorcycle,
            _ => SlotType::Compact,
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered account. The password hash never leaves park-db.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub customer_id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
    #[ts(as = "String")]
    pub registered_at: DateTime<Utc>,
}

// =============================================================================
// Vehicle
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Vehicle {
    pub vehicle_id: i64,
    pub customer_id: i64,
    /// Always upper-case.
    pub license_plate: String,
    pub vehicle_type: String,
    pub is_default: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Parking Slot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParkingSlot {
    pub slot_id: i64,
    /// Human-facing label such as `S101`. Unique and stable.
    pub slot_number: String,
    pub slot_type: SlotType,
    pub is_occupied: bool,
}

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle of a parking session.
///
/// ```text
///   start_session            end_session
///  ─────────────► Active ─────────────────► Closed { exit_time, fee }
///                                               (immutable)
/// ```
///
/// Storage keeps this as two nullable columns; [`SessionState::from_columns`]
/// accepts only the two combinations that correspond to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Closed {
        #[ts(as = "String")]
        exit_time: DateTime<Utc>,
        fee: Money,
    },
}

impl SessionState {
    /// Decodes the nullable `exit_time` / `total_fee_cents` pair.
    ///
    /// Returns `None` when exactly one of the two is present.
    pub fn from_columns(exit_time: Option<DateTime<Utc>>, fee_cents: Option<i64>) -> Option<Self> {
        match (exit_time, fee_cents) {
            (None, None) => Some(SessionState::Active),
            (Some(exit_time), Some(cents)) => Some(SessionState::Closed {
                exit_time,
                fee: Money::from_cents(cents),
            }),
            _ => None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    /// Label used by session history views.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Active => "Active",
            SessionState::Closed { .. } => "Completed",
        }
    }
}

// =============================================================================
// Parking Session
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParkingSession {
    pub session_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    #[ts(as = "String")]
    pub entry_time: DateTime<Utc>,
    #[serde(flatten)]
    #[ts(flatten)]
    pub state: SessionState,
}

impl ParkingSession {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn exit_time(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            SessionState::Active => None,
            SessionState::Closed { exit_time, .. } => Some(*exit_time),
        }
    }

    pub fn fee(&self) -> Option<Money> {
        match &self.state {
            SessionState::Active => None,
            SessionState::Closed { fee, .. } => Some(*fee),
        }
    }

    /// Whole minutes parked. Active sessions are measured up to `now`.
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let until = self.exit_time().unwrap_or(now);
        (until - self.entry_time).num_minutes().max(0)
    }
}

// =============================================================================
// Reservation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reservation {
    pub reservation_id: i64,
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_time: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Half-open interval overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
