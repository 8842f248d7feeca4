//! # Vehicle Repository
//!
//! Vehicles belong to one customer. A customer may mark at most one of
//! their vehicles as default; changing the default is done in one
//! transaction (unset all, set one) so readers never see two defaults.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use park_core::Vehicle;

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct VehicleRow {
    vehicle_id: i64,
    customer_id: i64,
    license_plate: String,
    vehicle_type: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Vehicle {
            vehicle_id: row.vehicle_id,
            customer_id: row.customer_id,
            license_plate: row.license_plate,
            vehicle_type: row.vehicle_type,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct VehicleOwnerRow {
    #[sqlx(flatten)]
    vehicle: VehicleRow,
    owner_name: String,
}

/// A vehicle with its owner's display name (staff lists).
#[derive(Debug, Clone, Serialize)]
pub struct VehicleWithOwner {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub owner_name: String,
}

impl From<VehicleOwnerRow> for VehicleWithOwner {
    fn from(row: VehicleOwnerRow) -> Self {
        VehicleWithOwner {
            vehicle: row.vehicle.into(),
            owner_name: row.owner_name,
        }
    }
}

/// Input for [`VehicleRepository::create`]. The plate is already upper-cased.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub customer_id: i64,
    pub license_plate: String,
    pub vehicle_type: String,
    pub set_as_default: bool,
}

const SELECT_WITH_OWNER: &str = r#"
    SELECT v.vehicle_id, v.customer_id, v.license_plate, v.vehicle_type,
           v.is_default, v.created_at, c.full_name AS owner_name
    FROM vehicles v
    JOIN customers c ON c.customer_id = v.customer_id
"#;

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VehicleRepository { pool }
    }

    /// Adds a vehicle for a customer.
    ///
    /// ## Errors
    /// - `NotFound` if the customer does not exist
    /// - `UniqueViolation` if the customer already has this plate
    pub async fn create(&self, new: &NewVehicle) -> DbResult<Vehicle> {
        let mut tx = self.pool.begin().await?;

        let owner_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE customer_id = ?1)")
                .bind(new.customer_id)
                .fetch_one(&mut *tx)
                .await?;
        if !owner_exists {
            return Err(DbError::not_found("Customer", new.customer_id));
        }

        let plate_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE customer_id = ?1 AND license_plate = ?2)",
        )
        .bind(new.customer_id)
        .bind(&new.license_plate)
        .fetch_one(&mut *tx)
        .await?;
        if plate_taken {
            return Err(DbError::duplicate("license plate", new.license_plate.clone()));
        }

        if new.set_as_default {
            sqlx::query("UPDATE vehicles SET is_default = 0 WHERE customer_id = ?1")
                .bind(new.customer_id)
                .execute(&mut *tx)
                .await?;
        }

        let now = Utc::now();
        let vehicle_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO vehicles (customer_id, license_plate, vehicle_type, is_default, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING vehicle_id
            "#,
        )
        .bind(new.customer_id)
        .bind(&new.license_plate)
        .bind(&new.vehicle_type)
        .bind(new.set_as_default)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(vehicle_id, customer_id = new.customer_id, plate = %new.license_plate, "Vehicle added");

        Ok(Vehicle {
            vehicle_id,
            customer_id: new.customer_id,
            license_plate: new.license_plate.clone(),
            vehicle_type: new.vehicle_type.clone(),
            is_default: new.set_as_default,
            created_at: now,
        })
    }

    pub async fn get_by_id(&self, vehicle_id: i64) -> DbResult<Option<Vehicle>> {
        let row: Option<VehicleRow> = sqlx::query_as(
            r#"
            SELECT vehicle_id, customer_id, license_plate, vehicle_type, is_default, created_at
            FROM vehicles WHERE vehicle_id = ?1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Vehicle::from))
    }

    /// Deletes a vehicle. With `owner` set, only that customer's vehicle
    /// matches.
    ///
    /// ## Errors
    /// - `NotFound` if no matching vehicle
    /// - `Conflict` if the vehicle has recorded parking sessions
    pub async fn delete(&self, vehicle_id: i64, owner: Option<i64>) -> DbResult<()> {
        let result = sqlx::query(
            "DELETE FROM vehicles WHERE vehicle_id = ?1 AND (?2 IS NULL OR customer_id = ?2)",
        )
        .bind(vehicle_id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::Conflict("Vehicle has recorded parking sessions".to_string())
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Vehicle", vehicle_id));
        }
        info!(vehicle_id, "Vehicle deleted");
        Ok(())
    }

    /// Makes `vehicle_id` the customer's only default vehicle.
    pub async fn set_default(&self, vehicle_id: i64, customer_id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE vehicles SET is_default = 0 WHERE customer_id = ?1")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "UPDATE vehicles SET is_default = 1 WHERE vehicle_id = ?1 AND customer_id = ?2",
        )
        .bind(vehicle_id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the unset.
            return Err(DbError::not_found("Vehicle", vehicle_id));
        }

        tx.commit().await?;
        debug!(vehicle_id, customer_id, "Default vehicle set");
        Ok(())
    }

    /// A customer's vehicles, default first.
    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<Vehicle>> {
        let rows: Vec<VehicleRow> = sqlx::query_as(
            r#"
            SELECT vehicle_id, customer_id, license_plate, vehicle_type, is_default, created_at
            FROM vehicles
            WHERE customer_id = ?1
            ORDER BY is_default DESC, created_at DESC, vehicle_id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    /// Every vehicle with its owner's name.
    pub async fn list_with_owner(&self) -> DbResult<Vec<VehicleWithOwner>> {
        let rows: Vec<VehicleOwnerRow> = sqlx::query_as(&format!(
            "{} ORDER BY c.full_name, v.license_plate",
            SELECT_WITH_OWNER
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VehicleWithOwner::from).collect())
    }

    /// Vehicles that are not currently parked.
    pub async fn list_available(&self) -> DbResult<Vec<VehicleWithOwner>> {
        let rows: Vec<VehicleOwnerRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE NOT EXISTS (
                SELECT 1 FROM parking_sessions s
                WHERE s.vehicle_id = v.vehicle_id AND s.exit_time IS NULL
            )
            ORDER BY v.license_plate"#,
            SELECT_WITH_OWNER
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VehicleWithOwner::from).collect())
    }

    /// Counts vehicles, optionally for one customer.
    pub async fn count(&self, customer_id: Option<i64>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vehicles WHERE ?1 IS NULL OR customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
