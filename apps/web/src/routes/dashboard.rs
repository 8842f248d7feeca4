//! # Dashboards
//!
//! `/dashboard` sends each role to its own overview: customers get their
//! vehicles, active sessions and upcoming reservations; operators and
//! admins get the lot-wide numbers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::routes::dto::{AmountDto, SessionDto};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboardDto {
    pub name: String,
    pub vehicle_count: i64,
    pub active_sessions: i64,
    pub upcoming_reservations: i64,
    pub recent_sessions: Vec<SessionDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDashboardDto {
    pub name: String,
    /// Every account for admins, customers only for operators.
    pub customer_count: i64,
    pub vehicle_count: i64,
    pub available_slots: i64,
    pub total_slots: i64,
    pub active_sessions: i64,
    pub today_revenue: AmountDto,
    pub recent_sessions: Vec<SessionDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum DashboardDto {
    Customer(CustomerDashboardDto),
    Staff(StaffDashboardDto),
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<DashboardDto>> {
    if user.is_staff() {
        let Json(dto) = staff_dashboard(State(state), user).await?;
        Ok(Json(DashboardDto::Staff(dto)))
    } else {
        let Json(dto) = customer_dashboard(State(state), user).await?;
        Ok(Json(DashboardDto::Customer(dto)))
    }
}

/// GET /user/dashboard
pub async fn customer_dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<CustomerDashboardDto>> {
    user.require_customer()?;

    let stats = state
        .db
        .stats()
        .customer_dashboard(user.customer_id, state.now())
        .await?;

    Ok(Json(CustomerDashboardDto {
        name: user.name,
        vehicle_count: stats.vehicle_count,
        active_sessions: stats.active_sessions,
        upcoming_reservations: stats.upcoming_reservations,
        recent_sessions: stats.recent_sessions.into_iter().map(Into::into).collect(),
    }))
}

/// GET /admin/dashboard
pub async fn staff_dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<StaffDashboardDto>> {
    user.require_staff()?;

    let stats = state.db.stats().staff_dashboard(user.role, state.now()).await?;

    Ok(Json(StaffDashboardDto {
        name: user.name,
        customer_count: stats.customer_count,
        vehicle_count: stats.vehicle_count,
        available_slots: stats.available_slots,
        total_slots: stats.total_slots,
        active_sessions: stats.active_sessions,
        today_revenue: stats.today_revenue.into(),
        recent_sessions: stats.recent_sessions.into_iter().map(Into::into).collect(),
    }))
}
