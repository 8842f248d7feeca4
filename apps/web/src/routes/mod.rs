//! # HTTP Routes
//!
//! One module per area. Every handler returns `ApiResult<..>`; role checks
//! happen at the top of the handler through [`AuthUser`](crate::AuthUser).
//!
//! | Area          | Module            | Who                          |
//! |---------------|-------------------|------------------------------|
//! | Accounts      | [`account`]       | public / any logged-in user  |
//! | Dashboards    | [`dashboard`]     | role-dispatched              |
//! | Vehicles      | [`vehicles`]      | owner, or staff              |
//! | Slots         | [`slots`]         | staff                        |
//! | Sessions      | [`sessions`]      | staff (history: customer)    |
//! | Reservations  | [`reservations`]  | owner, or staff              |
//! | Customers     | [`customers`]     | admin                        |

pub mod account;
pub mod customers;
pub mod dashboard;
pub mod dto;
pub mod reservations;
pub mod sessions;
pub mod slots;
pub mod vehicles;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

/// All routes, before state is attached.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/logout", post(account::logout))
        .route("/user/profile", get(account::profile))
        .route("/profile", post(account::update_profile))
        .route("/profile/password", post(account::change_password))
        // Dashboards
        .route("/dashboard", get(dashboard::dashboard))
        .route("/user/dashboard", get(dashboard::customer_dashboard))
        .route("/admin/dashboard", get(dashboard::staff_dashboard))
        // Vehicles
        .route("/user/vehicles", get(vehicles::my_vehicles))
        .route("/admin/vehicles", get(vehicles::all_vehicles))
        .route("/vehicles", post(vehicles::add_vehicle))
        .route("/vehicles/{id}", delete(vehicles::delete_vehicle))
        .route("/vehicles/{id}/default", post(vehicles::set_default_vehicle))
        // Slots
        .route("/admin/slots", get(slots::list_slots))
        .route("/slots", post(slots::add_slot))
        .route("/slots/{id}", post(slots::update_slot))
        // Sessions
        .route("/admin/sessions", get(sessions::session_board))
        .route("/sessions/start", post(sessions::start_session))
        .route("/sessions/{id}/end", post(sessions::end_session))
        .route("/user/sessions", get(sessions::my_sessions))
        .route("/admin/consistency", get(sessions::consistency))
        // Reservations
        .route("/admin/reservations", get(reservations::all_reservations))
        .route("/user/reservations", get(reservations::my_reservations))
        .route("/reservations", post(reservations::create_reservation))
        // Customers
        .route("/admin/customers", get(customers::list_customers))
        .route("/customers/{id}/role", post(customers::update_role))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}
