//! Reservation routes. Customers book with their own vehicles; staff book
//! on behalf of a chosen customer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use park_core::validation::validate_reservation_window;
use park_db::NewReservation;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::dto::ReservationDto;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub vehicle_id: Option<i64>,
    pub slot_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Only read for staff callers.
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreatedDto {
    pub reservation_id: i64,
    pub slot_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// GET /admin/reservations
pub async fn all_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ReservationDto>>> {
    user.require_staff()?;
    let reservations = state.db.reservations().list_all().await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

/// GET /user/reservations
pub async fn my_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ReservationDto>>> {
    let reservations = state
        .db
        .reservations()
        .list_for_customer(user.customer_id)
        .await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

/// POST /reservations
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReservationRequest>,
) -> ApiResult<(StatusCode, Json<ReservationCreatedDto>)> {
    let (Some(vehicle_id), Some(slot_id), Some(start_time), Some(end_time)) =
        (req.vehicle_id, req.slot_id, req.start_time, req.end_time)
    else {
        return Err(ApiError::validation(
            "Vehicle, slot, start time and end time are required",
        ));
    };
    validate_reservation_window(start_time, end_time)?;

    let customer_id = if user.is_staff() {
        req.customer_id
            .ok_or_else(|| ApiError::validation("Customer is required"))?
    } else {
        user.customer_id
    };

    let reservation = state
        .db
        .reservations()
        .create(&NewReservation {
            customer_id,
            vehicle_id,
            slot_id,
            start_time,
            end_time,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationCreatedDto {
            reservation_id: reservation.reservation_id,
            slot_id: reservation.slot_id,
            start_time: reservation.start_time,
            end_time: reservation.end_time,
        }),
    ))
}
