//! # Slot Repository
//!
//! The slot catalogue. This repository creates slots and changes their
//! type; it never writes `is_occupied`, which belongs to the session ledger.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use park_core::{ParkingSlot, SlotType};

#[derive(Debug, FromRow)]
struct SlotRow {
    slot_id: i64,
    slot_number: String,
    slot_type: SlotType,
    is_occupied: bool,
}

impl From<SlotRow> for ParkingSlot {
    fn from(row: SlotRow) -> Self {
        ParkingSlot {
            slot_id: row.slot_id,
            slot_number: row.slot_number,
            slot_type: row.slot_type,
            is_occupied: row.is_occupied,
        }
    }
}

#[derive(Debug, FromRow)]
struct SlotPlateRow {
    #[sqlx(flatten)]
    slot: SlotRow,
    current_plate: Option<String>,
}

/// A slot and the plate of the vehicle parked in it, if any.
#[derive(Debug, Clone, Serialize)]
pub struct SlotOverview {
    #[serde(flatten)]
    pub slot: ParkingSlot,
    pub current_plate: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlotRepository {
    pool: SqlitePool,
}

impl SlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SlotRepository { pool }
    }

    /// Adds a slot. New slots are always unoccupied.
    pub async fn create(&self, slot_number: &str, slot_type: SlotType) -> DbResult<ParkingSlot> {
        let slot_id: i64 = sqlx::query_scalar(
            "INSERT INTO parking_slots (slot_number, slot_type, is_occupied) VALUES (?1, ?2, 0) RETURNING slot_id",
        )
        .bind(slot_number)
        .bind(slot_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("slot number", slot_number),
            other => other,
        })?;

        info!(slot_id, slot_number, slot_type = %slot_type, "Slot added");

        Ok(ParkingSlot {
            slot_id,
            slot_number: slot_number.to_string(),
            slot_type,
            is_occupied: false,
        })
    }

    pub async fn update_type(&self, slot_id: i64, slot_type: SlotType) -> DbResult<()> {
        let result = sqlx::query("UPDATE parking_slots SET slot_type = ?1 WHERE slot_id = ?2")
            .bind(slot_type)
            .bind(slot_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Slot", slot_id));
        }
        info!(slot_id, slot_type = %slot_type, "Slot type changed");
        Ok(())
    }

    pub async fn get_by_id(&self, slot_id: i64) -> DbResult<Option<ParkingSlot>> {
        let row: Option<SlotRow> = sqlx::query_as(
            "SELECT slot_id, slot_number, slot_type, is_occupied FROM parking_slots WHERE slot_id = ?1",
        )
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ParkingSlot::from))
    }

    pub async fn list_available(&self) -> DbResult<Vec<ParkingSlot>> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            r#"
            SELECT slot_id, slot_number, slot_type, is_occupied
            FROM parking_slots
            WHERE is_occupied = 0
            ORDER BY slot_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ParkingSlot::from).collect())
    }

    /// Every slot with the plate currently parked there.
    pub async fn list_with_current_plate(&self) -> DbResult<Vec<SlotOverview>> {
        let rows: Vec<SlotPlateRow> = sqlx::query_as(
            r#"
            SELECT p.slot_id, p.slot_number, p.slot_type, p.is_occupied,
                   v.license_plate AS current_plate
            FROM parking_slots p
            LEFT JOIN parking_sessions s ON s.slot_id = p.slot_id AND s.exit_time IS NULL
            LEFT JOIN vehicles v ON v.vehicle_id = s.vehicle_id
            ORDER BY p.slot_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SlotOverview {
                slot: row.slot.into(),
                current_plate: row.current_plate,
            })
            .collect())
    }

    /// Returns (total, available).
    pub async fn counts(&self) -> DbResult<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_occupied = 0), 0) FROM parking_slots",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let db = testing::database().await;
        let slot = db.slots().create("S101", SlotType::Large).await.unwrap();
        assert!(!slot.is_occupied);

        let err = db.slots().create("S101", SlotType::Compact).await.unwrap_err();
        assert!(
            matches!(err, DbError::UniqueViolation { ref field, .. } if field == "slot number")
        );
    }

    #[tokio::test]
    async fn test_update_type_leaves_occupancy() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let car = testing::vehicle(&db, jane, "KAA 001A").await;
        let slot = testing::slot(&db, "S101").await;
        ledger.start_session(Some(car), Some(slot)).await.unwrap();

        db.slots().update_type(slot, SlotType::Motorcycle).await.unwrap();

        let stored = db.slots().get_by_id(slot).await.unwrap().unwrap();
        assert_eq!(stored.slot_type, SlotType::Motorcycle);
        assert!(stored.is_occupied);

        let err = db.slots().update_type(999, SlotType::Large).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_overview_shows_current_plate() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let car = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;
        testing::slot(&db, "S102").await;

        let session = ledger.start_session(Some(car), Some(s1)).await.unwrap();

        let overview = db.slots().list_with_current_plate().await.unwrap();
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].current_plate.as_deref(), Some("KAA 001A"));
        assert_eq!(overview[1].current_plate, None);
        assert_eq!(db.slots().counts().await.unwrap(), (2, 1));

        ledger.end_session(session).await.unwrap();
        let overview = db.slots().list_with_current_plate().await.unwrap();
        assert!(overview.iter().all(|o| o.current_plate.is_none()));
        assert_eq!(db.slots().list_available().await.unwrap().len(), 2);
    }
}
