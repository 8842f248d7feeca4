//! Shared fixtures for handler tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use park_core::{ManualClock, Role, SlotType};
use park_db::{Database, DbConfig, NewCustomer, NewVehicle};

use crate::auth::{ensure_staff_accounts, hash_password, AuthUser};
use crate::{AppState, WebConfig};

/// In-memory state with the staff accounts bootstrapped and a manual clock
/// at 2024-05-01 08:00 UTC.
pub async fn state() -> (Arc<AppState>, Arc<ManualClock>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = WebConfig {
        session_secret: "test-secret".to_string(),
        ..WebConfig::default()
    };
    ensure_staff_accounts(&db, &config).await.unwrap();

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    ));
    let state = AppState::new(db, config, clock.clone());
    (Arc::new(state), clock)
}

/// Registers a customer (password `password1`) and returns them logged in.
pub async fn customer(state: &AppState, email: &str, phone: &str) -> AuthUser {
    let customer = state
        .db
        .customers()
        .create(&NewCustomer {
            full_name: "Test Customer".to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            password_hash: hash_password("password1").unwrap(),
            role: Role::Customer,
        })
        .await
        .unwrap();
    AuthUser {
        customer_id: customer.customer_id,
        role: customer.role,
        name: customer.full_name,
    }
}

/// The bootstrapped admin or operator.
pub async fn staff(state: &AppState, role: Role) -> AuthUser {
    let email = match role {
        Role::Admin => &state.config.admin_email,
        _ => &state.config.operator_email,
    };
    let credentials = state
        .db
        .customers()
        .find_credentials_by_email(email)
        .await
        .unwrap()
        .unwrap();
    let customer = credentials.customer;
    AuthUser {
        customer_id: customer.customer_id,
        role: customer.role,
        name: customer.full_name,
    }
}

pub async fn vehicle(state: &AppState, owner: &AuthUser, plate: &str) -> i64 {
    state
        .db
        .vehicles()
        .create(&NewVehicle {
            customer_id: owner.customer_id,
            license_plate: plate.to_string(),
            vehicle_type: "sedan".to_string(),
            set_as_default: false,
        })
        .await
        .unwrap()
        .vehicle_id
}

pub async fn slot(state: &AppState, number: &str) -> i64 {
    state
        .db
        .slots()
        .create(number, SlotType::Compact)
        .await
        .unwrap()
        .slot_id
}
