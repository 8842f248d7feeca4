//! Account administration (admin only).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use park_core::Role;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::account::MessageResponse;
use crate::routes::dto::CustomerDto;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub role: Option<String>,
}

/// GET /admin/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CustomerDto>>> {
    user.require_admin()?;
    let customers = state.db.customers().list_all().await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// POST /customers/{id}/role
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(customer_id): Path<i64>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<MessageResponse>> {
    user.require_admin()?;

    let role: Role = req
        .role
        .as_deref()
        .ok_or_else(|| ApiError::validation("Role is required"))?
        .parse()?;

    state.db.customers().set_role(customer_id, role).await?;
    info!(customer_id, %role, by = user.customer_id, "Role updated");
    Ok(MessageResponse::new(format!("Role updated to {}", role)))
}
