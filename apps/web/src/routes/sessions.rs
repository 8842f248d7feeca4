//! # Session Routes
//!
//! Staff start and end parking sessions through the
//! [`SessionLedger`](park_db::SessionLedger); customers read their history.
//!
//! ```text
//! POST /sessions/start   { vehicleId, slotId } ──► ledger.start_session ──► 201 { sessionId }
//!                          occupied slot / parked vehicle ─────────────────► 409
//! POST /sessions/{id}/end                       ──► ledger.end_session   ──► 200 receipt
//!                          unknown ──► 404, already closed ──► 409
//! GET  /admin/consistency                       ──► ledger.check_consistency
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::routes::dto::{AmountDto, ConsistencyDto, HistoryDto, ReceiptDto, SessionDto, SlotDto, VehicleDto};
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub vehicle_id: Option<i64>,
    pub slot_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedDto {
    pub session_id: i64,
}

/// Everything the staff session page needs in one call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBoardDto {
    pub active_sessions: Vec<SessionDto>,
    /// Vehicles not currently parked.
    pub available_vehicles: Vec<VehicleDto>,
    pub available_slots: Vec<SlotDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryDto {
    pub sessions: Vec<HistoryDto>,
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub total_spent: AmountDto,
}

/// GET /admin/sessions
pub async fn session_board(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<SessionBoardDto>> {
    user.require_staff()?;

    let active_sessions = state.db.sessions().list_active().await?;
    let available_vehicles = state.db.vehicles().list_available().await?;
    let available_slots = state.db.slots().list_available().await?;

    Ok(Json(SessionBoardDto {
        active_sessions: active_sessions.into_iter().map(Into::into).collect(),
        available_vehicles: available_vehicles.into_iter().map(Into::into).collect(),
        available_slots: available_slots.into_iter().map(Into::into).collect(),
    }))
}

/// POST /sessions/start
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionStartedDto>)> {
    user.require_staff()?;

    let session_id = state
        .ledger
        .start_session(req.vehicle_id, req.slot_id)
        .await
        .inspect_err(|e| warn!(by = user.customer_id, error = %e, "Session start rejected"))?;

    Ok((StatusCode::CREATED, Json(SessionStartedDto { session_id })))
}

/// POST /sessions/{id}/end
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> ApiResult<Json<ReceiptDto>> {
    user.require_staff()?;

    let receipt = state
        .ledger
        .end_session(session_id)
        .await
        .inspect_err(|e| warn!(by = user.customer_id, error = %e, "Session end rejected"))?;

    Ok(Json(receipt.into()))
}

/// GET /user/sessions
pub async fn my_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<SessionHistoryDto>> {
    user.require_customer()?;

    let history = state
        .db
        .stats()
        .customer_history(user.customer_id, state.now())
        .await?;

    Ok(Json(SessionHistoryDto {
        total_sessions: history.total_sessions,
        active_sessions: history.active_sessions,
        total_spent: history.total_spent.into(),
        sessions: history.sessions.into_iter().map(Into::into).collect(),
    }))
}

/// GET /admin/consistency
pub async fn consistency(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ConsistencyDto>> {
    user.require_staff()?;
    let report = state.ledger.check_consistency().await?;
    if !report.is_consistent() {
        warn!(
            violations = report.violations.len(),
            corrupt = report.corrupt_sessions.len(),
            "Occupancy ledger is inconsistent"
        );
    }
    Ok(Json(report.into()))
}
