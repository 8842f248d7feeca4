//! Fixtures shared by the unit tests in this crate.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use park_core::{FeePolicy, ManualClock, Role, SlotType};

use crate::ledger::SessionLedger;
use crate::repository::customer::NewCustomer;
use crate::repository::vehicle::NewVehicle;
use crate::{Database, DbConfig};

/// 08:00 UTC, so an hour or two of parking stays on the same day.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

pub async fn database() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// In-memory database plus a ledger on a manual clock with the default
/// fee policy (100.00 per started hour).
pub async fn ledger() -> (Database, Arc<ManualClock>, SessionLedger) {
    let db = database().await;
    let clock = Arc::new(ManualClock::new(start_time()));
    let ledger = db.ledger(FeePolicy::default(), clock.clone());
    (db, clock, ledger)
}

pub async fn customer(db: &Database, email: &str, phone: &str) -> i64 {
    db.customers()
        .create(&NewCustomer {
            full_name: "Test Customer".to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::Customer,
        })
        .await
        .unwrap()
        .customer_id
}

pub async fn vehicle(db: &Database, customer_id: i64, plate: &str) -> i64 {
    db.vehicles()
        .create(&NewVehicle {
            customer_id,
            license_plate: plate.to_string(),
            vehicle_type: "sedan".to_string(),
            set_as_default: false,
        })
        .await
        .unwrap()
        .vehicle_id
}

pub async fn slot(db: &Database, number: &str) -> i64 {
    db.slots()
        .create(number, SlotType::Compact)
        .await
        .unwrap()
        .slot_id
}
