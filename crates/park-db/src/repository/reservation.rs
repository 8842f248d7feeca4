//! # Reservation Repository
//!
//! Bookings of a slot for a time window. Two reservations on the same slot
//! may not overlap; windows are half-open, so one booking may start exactly
//! when another ends.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use park_core::Reservation;

#[derive(Debug, FromRow)]
struct ReservationRow {
    reservation_id: i64,
    customer_id: i64,
    vehicle_id: i64,
    slot_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            reservation_id: row.reservation_id,
            customer_id: row.customer_id,
            vehicle_id: row.vehicle_id,
            slot_id: row.slot_id,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReservationDetailsRow {
    #[sqlx(flatten)]
    reservation: ReservationRow,
    customer_name: String,
    license_plate: String,
    slot_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub customer_name: String,
    pub license_plate: String,
    pub slot_number: String,
}

impl From<ReservationDetailsRow> for ReservationDetails {
    fn from(row: ReservationDetailsRow) -> Self {
        ReservationDetails {
            reservation: row.reservation.into(),
            customer_name: row.customer_name,
            license_plate: row.license_plate,
            slot_number: row.slot_number,
        }
    }
}

/// Input for [`ReservationRepository::create`]. The window is already
/// validated (`end_time > start_time`).
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

const SELECT_DETAILS: &str = r#"
    SELECT r.reservation_id, r.customer_id, r.vehicle_id, r.slot_id,
           r.start_time, r.end_time, r.created_at,
           c.full_name AS customer_name, v.license_plate, p.slot_number
    FROM reservations r
    JOIN customers c ON c.customer_id = r.customer_id
    JOIN vehicles v ON v.vehicle_id = r.vehicle_id
    JOIN parking_slots p ON p.slot_id = r.slot_id
"#;

#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Books a slot.
    ///
    /// ## Errors
    /// - `NotFound` if the vehicle is not the customer's, or the slot is missing
    /// - `Conflict` if the slot is already booked for an overlapping window
    pub async fn create(&self, new: &NewReservation) -> DbResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let owns_vehicle: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE vehicle_id = ?1 AND customer_id = ?2)",
        )
        .bind(new.vehicle_id)
        .bind(new.customer_id)
        .fetch_one(&mut *tx)
        .await?;
        if !owns_vehicle {
            return Err(DbError::not_found("Vehicle", new.vehicle_id));
        }

        let slot_number: Option<String> =
            sqlx::query_scalar("SELECT slot_number FROM parking_slots WHERE slot_id = ?1")
                .bind(new.slot_id)
                .fetch_optional(&mut *tx)
                .await?;
        let slot_number = slot_number.ok_or_else(|| DbError::not_found("Slot", new.slot_id))?;

        let overlapping: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE slot_id = ?1 AND start_time < ?3 AND ?2 < end_time
            )
            "#,
        )
        .bind(new.slot_id)
        .bind(new.start_time)
        .bind(new.end_time)
        .fetch_one(&mut *tx)
        .await?;
        if overlapping {
            warn!(slot_id = new.slot_id, "Reservation overlaps an existing booking");
            return Err(DbError::Conflict(format!(
                "Slot {} is already reserved for that time",
                slot_number
            )));
        }

        let now = Utc::now();
        let reservation_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reservations (customer_id, vehicle_id, slot_id, start_time, end_time, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING reservation_id
            "#,
        )
        .bind(new.customer_id)
        .bind(new.vehicle_id)
        .bind(new.slot_id)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(reservation_id, slot_id = new.slot_id, customer_id = new.customer_id, "Reservation created");

        Ok(Reservation {
            reservation_id,
            customer_id: new.customer_id,
            vehicle_id: new.vehicle_id,
            slot_id: new.slot_id,
            start_time: new.start_time,
            end_time: new.end_time,
            created_at: now,
        })
    }

    /// Every reservation, latest start first.
    pub async fn list_all(&self) -> DbResult<Vec<ReservationDetails>> {
        let rows: Vec<ReservationDetailsRow> = sqlx::query_as(&format!(
            "{} ORDER BY r.start_time DESC, r.reservation_id DESC",
            SELECT_DETAILS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReservationDetails::from).collect())
    }

    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<ReservationDetails>> {
        let rows: Vec<ReservationDetailsRow> = sqlx::query_as(&format!(
            "{} WHERE r.customer_id = ?1 ORDER BY r.start_time DESC, r.reservation_id DESC",
            SELECT_DETAILS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReservationDetails::from).collect())
    }

    /// Reservations of the customer that start after `now`.
    pub async fn count_upcoming(&self, customer_id: i64, now: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE customer_id = ?1 AND start_time > ?2",
        )
        .bind(customer_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
