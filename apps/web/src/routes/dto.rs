//! # Response DTOs
//!
//! camelCase views of the domain types for the frontend. Money is sent
//! twice: `...Cents` for arithmetic and a formatted string for display.

use chrono::{DateTime, Utc};
use serde::Serialize;

use park_core::{Customer, Money, ParkingSlot, Role, SlotType, Vehicle};
use park_db::{
    ConsistencyReport, HistoryEntry, ReservationDetails, SessionDetails, SessionReceipt,
    SlotOverview, SlotViolation, VehicleWithOwner,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub customer_id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

impl From<Customer> for CustomerDto {
    fn from(c: Customer) -> Self {
        CustomerDto {
            customer_id: c.customer_id,
            full_name: c.full_name,
            phone: c.phone,
            email: c.email,
            role: c.role,
            registered_at: c.registered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub vehicle_id: i64,
    pub customer_id: i64,
    pub license_plate: String,
    pub vehicle_type: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    /// Only on staff lists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

impl From<Vehicle> for VehicleDto {
    fn from(v: Vehicle) -> Self {
        VehicleDto {
            vehicle_id: v.vehicle_id,
            customer_id: v.customer_id,
            license_plate: v.license_plate,
            vehicle_type: v.vehicle_type,
            is_default: v.is_default,
            created_at: v.created_at,
            owner_name: None,
        }
    }
}

impl From<VehicleWithOwner> for VehicleDto {
    fn from(v: VehicleWithOwner) -> Self {
        VehicleDto {
            owner_name: Some(v.owner_name),
            ..v.vehicle.into()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub slot_id: i64,
    pub slot_number: String,
    pub slot_type: SlotType,
    pub is_occupied: bool,
    /// Plate of the vehicle parked here, on the staff slot list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_plate: Option<String>,
}

impl From<ParkingSlot> for SlotDto {
    fn from(s: ParkingSlot) -> Self {
        SlotDto {
            slot_id: s.slot_id,
            slot_number: s.slot_number,
            slot_type: s.slot_type,
            is_occupied: s.is_occupied,
            current_plate: None,
        }
    }
}

impl From<SlotOverview> for SlotDto {
    fn from(s: SlotOverview) -> Self {
        SlotDto {
            current_plate: s.current_plate,
            ..s.slot.into()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub session_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    pub license_plate: String,
    pub slot_number: String,
    pub customer_id: i64,
    pub customer_name: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    /// `Active` or `Completed`
    pub status: &'static str,
    pub fee_cents: Option<i64>,
    pub fee: Option<String>,
}

impl From<SessionDetails> for SessionDto {
    fn from(d: SessionDetails) -> Self {
        let fee = d.session.fee();
        SessionDto {
            session_id: d.session.session_id,
            vehicle_id: d.session.vehicle_id,
            slot_id: d.session.slot_id,
            license_plate: d.license_plate,
            slot_number: d.slot_number,
            customer_id: d.customer_id,
            customer_name: d.customer_name,
            entry_time: d.session.entry_time,
            exit_time: d.session.exit_time(),
            status: d.session.state.label(),
            fee_cents: fee.map(|m| m.cents()),
            fee: fee.map(|m| m.to_string()),
        }
    }
}

/// A row of the customer's session history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDto {
    #[serde(flatten)]
    pub session: SessionDto,
    pub duration_minutes: i64,
}

impl From<HistoryEntry> for HistoryDto {
    fn from(h: HistoryEntry) -> Self {
        HistoryDto {
            duration_minutes: h.duration_minutes,
            session: h.details.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDto {
    pub session_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub fee_cents: i64,
    pub fee: String,
}

impl From<SessionReceipt> for ReceiptDto {
    fn from(r: SessionReceipt) -> Self {
        ReceiptDto {
            session_id: r.session_id,
            vehicle_id: r.vehicle_id,
            slot_id: r.slot_id,
            entry_time: r.entry_time,
            exit_time: r.exit_time,
            fee_cents: r.fee.cents(),
            fee: r.fee.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub reservation_id: i64,
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    pub customer_name: String,
    pub license_plate: String,
    pub slot_number: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<ReservationDetails> for ReservationDto {
    fn from(d: ReservationDetails) -> Self {
        ReservationDto {
            reservation_id: d.reservation.reservation_id,
            customer_id: d.reservation.customer_id,
            vehicle_id: d.reservation.vehicle_id,
            slot_id: d.reservation.slot_id,
            customer_name: d.customer_name,
            license_plate: d.license_plate,
            slot_number: d.slot_number,
            start_time: d.reservation.start_time,
            end_time: d.reservation.end_time,
            created_at: d.reservation.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotViolationDto {
    pub slot_id: i64,
    pub slot_number: String,
    pub is_occupied: bool,
    pub active_sessions: i64,
}

impl From<SlotViolation> for SlotViolationDto {
    fn from(v: SlotViolation) -> Self {
        SlotViolationDto {
            slot_id: v.slot_id,
            slot_number: v.slot_number,
            is_occupied: v.is_occupied,
            active_sessions: v.active_sessions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyDto {
    pub consistent: bool,
    pub slots_checked: i64,
    pub violations: Vec<SlotViolationDto>,
    pub corrupt_sessions: Vec<i64>,
}

impl From<ConsistencyReport> for ConsistencyDto {
    fn from(r: ConsistencyReport) -> Self {
        ConsistencyDto {
            consistent: r.is_consistent(),
            slots_checked: r.slots_checked,
            violations: r.violations.into_iter().map(Into::into).collect(),
            corrupt_sessions: r.corrupt_sessions,
        }
    }
}

/// Money in both forms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountDto {
    pub cents: i64,
    pub display: String,
}

impl From<Money> for AmountDto {
    fn from(m: Money) -> Self {
        AmountDto {
            cents: m.cents(),
            display: m.to_string(),
        }
    }
}
