//! # Vehicle Routes
//!
//! Customers manage their own vehicles. Staff see every vehicle and add
//! vehicles on behalf of a chosen customer.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use park_core::validation::{normalize_license_plate, validate_vehicle_type};
use park_db::NewVehicle;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::account::MessageResponse;
use crate::routes::dto::VehicleDto;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddVehicleRequest {
    pub license_plate: Option<String>,
    pub vehicle_type: Option<String>,
    /// Owner; only read for staff callers.
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub set_as_default: bool,
}

/// GET /user/vehicles
pub async fn my_vehicles(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<VehicleDto>>> {
    let vehicles = state.db.vehicles().list_for_customer(user.customer_id).await?;
    Ok(Json(vehicles.into_iter().map(Into::into).collect()))
}

/// GET /admin/vehicles
pub async fn all_vehicles(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<VehicleDto>>> {
    user.require_staff()?;
    let vehicles = state.db.vehicles().list_with_owner().await?;
    Ok(Json(vehicles.into_iter().map(Into::into).collect()))
}

/// POST /vehicles
pub async fn add_vehicle(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddVehicleRequest>,
) -> ApiResult<(StatusCode, Json<VehicleDto>)> {
    let (Some(plate), Some(vehicle_type)) = (req.license_plate.as_deref(), req.vehicle_type.as_deref())
    else {
        return Err(ApiError::validation("License plate and vehicle type are required"));
    };
    let license_plate = normalize_license_plate(plate)?;
    let vehicle_type = validate_vehicle_type(vehicle_type)?;

    let customer_id = if user.is_staff() {
        req.customer_id
            .ok_or_else(|| ApiError::validation("Customer is required"))?
    } else {
        user.customer_id
    };

    let vehicle = state
        .db
        .vehicles()
        .create(&NewVehicle {
            customer_id,
            license_plate,
            vehicle_type,
            set_as_default: req.set_as_default,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(vehicle.into())))
}

/// DELETE /vehicles/{id}
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(vehicle_id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let owner = (!user.is_staff()).then_some(user.customer_id);
    state.db.vehicles().delete(vehicle_id, owner).await?;
    info!(vehicle_id, by = user.customer_id, "Vehicle removed");
    Ok(MessageResponse::new("Vehicle deleted successfully"))
}

/// POST /vehicles/{id}/default
pub async fn set_default_vehicle(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(vehicle_id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let vehicles = state.db.vehicles();

    let owner = if user.is_staff() {
        vehicles
            .get_by_id(vehicle_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Vehicle", vehicle_id))?
            .customer_id
    } else {
        user.customer_id
    };

    vehicles.set_default(vehicle_id, owner).await?;
    Ok(MessageResponse::new("Default vehicle updated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use park_core::Role;

    fn car(plate: &str) -> AddVehicleRequest {
        AddVehicleRequest {
            license_plate: Some(plate.to_string()),
            vehicle_type: Some("sedan".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_customer_adds_to_self_with_uppercase_plate() {
        let (state, _clock) = testing::state().await;
        let jane = testing::customer(&state, "jane@example.com", "0712345678").await;
        let tom = testing::customer(&state, "tom@example.com", "0711111111").await;

        let mut req = car("kaa 001a");
        // Ignored for customers.
        req.customer_id = Some(tom.customer_id);
        let (status, Json(vehicle)) = add_vehicle(State(state.clone()), jane.clone(), Json(req))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(vehicle.license_plate, "KAA 001A");
        assert_eq!(vehicle.customer_id, jane.customer_id);

        let err = add_vehicle(State(state.clone()), jane.clone(), Json(car("KAA 001A")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let err = add_vehicle(State(state.clone()), jane.clone(), Json(AddVehicleRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let Json(mine) = my_vehicles(State(state.clone()), jane).await.unwrap();
        assert_eq!(mine.len(), 1);
        let Json(toms) = my_vehicles(State(state), tom).await.unwrap();
        assert!(toms.is_empty());
    }

    #[tokio::test]
    async fn test_staff_picks_owner() {
        let (state, _clock) = testing::state().await;
        let jane = testing::customer(&state, "jane@example.com", "0712345678").await;
        let operator = testing::staff(&state, Role::Operator).await;

        let err = add_vehicle(State(state.clone()), operator.clone(), Json(car("KAA 001A")))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Customer is required");

        let mut req = car("KAA 001A");
        req.customer_id = Some(jane.customer_id);
        let (_, Json(vehicle)) = add_vehicle(State(state.clone()), operator.clone(), Json(req))
            .await
            .unwrap();
        assert_eq!(vehicle.customer_id, jane.customer_id);

        let Json(all) = all_vehicles(State(state.clone()), operator).await.unwrap();
        assert_eq!(all[0].owner_name.as_deref(), Some("Test Customer"));

        let err = all_vehicles(State(state), jane).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_delete_and_default_respect_ownership() {
        let (state, _clock) = testing::state().await;
        let jane = testing::customer(&state, "jane@example.com", "0712345678").await;
        let tom = testing::customer(&state, "tom@example.com", "0711111111").await;
        let admin = testing::staff(&state, Role::Admin).await;

        let first = testing::vehicle(&state, &jane, "KAA 001A").await;
        let second = testing::vehicle(&state, &jane, "KAA 002A").await;

        let err = delete_vehicle(State(state.clone()), tom.clone(), Path(first))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = set_default_vehicle(State(state.clone()), tom, Path(first))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        set_default_vehicle(State(state.clone()), jane.clone(), Path(second))
            .await
            .unwrap();
        set_default_vehicle(State(state.clone()), admin.clone(), Path(first))
            .await
            .unwrap();
        let Json(mine) = my_vehicles(State(state.clone()), jane.clone()).await.unwrap();
        let defaults: Vec<i64> = mine.iter().filter(|v| v.is_default).map(|v| v.vehicle_id).collect();
        assert_eq!(defaults, vec![first]);

        // A vehicle with a recorded session cannot be removed.
        let slot = testing::slot(&state, "S101").await;
        state.ledger.start_session(Some(second), Some(slot)).await.unwrap();
        let err = delete_vehicle(State(state.clone()), jane.clone(), Path(second))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        delete_vehicle(State(state.clone()), admin, Path(first)).await.unwrap();
        let Json(mine) = my_vehicles(State(state), jane).await.unwrap();
        assert_eq!(mine.len(), 1);
    }
}
