//! Slot management (staff). Occupancy is never set here; only the session
//! ledger flips `is_occupied`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use park_core::validation::validate_slot_number;
use park_core::SlotType;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::account::MessageResponse;
use crate::routes::dto::SlotDto;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSlotRequest {
    pub slot_number: Option<String>,
    /// Form value: standard, handicap, electric, large, motorcycle.
    pub slot_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlotRequest {
    pub slot_type: Option<String>,
}

/// GET /admin/slots
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<SlotDto>>> {
    user.require_staff()?;
    let slots = state.db.slots().list_with_current_plate().await?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}

/// POST /slots
pub async fn add_slot(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddSlotRequest>,
) -> ApiResult<(StatusCode, Json<SlotDto>)> {
    user.require_staff()?;

    let number = req
        .slot_number
        .as_deref()
        .ok_or_else(|| ApiError::validation("Slot number is required"))?;
    let number = validate_slot_number(number)?;
    let slot_type = SlotType::from_form(req.slot_type.as_deref().unwrap_or_default());

    let slot = state.db.slots().create(&number, slot_type).await?;
    Ok((StatusCode::CREATED, Json(slot.into())))
}

/// POST /slots/{id}
pub async fn update_slot(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(slot_id): Path<i64>,
    Json(req): Json<UpdateSlotRequest>,
) -> ApiResult<Json<MessageResponse>> {
    user.require_staff()?;

    let slot_type = req
        .slot_type
        .as_deref()
        .map(SlotType::from_form)
        .ok_or_else(|| ApiError::validation("Slot type is required"))?;

    state.db.slots().update_type(slot_id, slot_type).await?;
    Ok(MessageResponse::new("Slot updated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use park_core::Role;

    fn slot(number: &str, slot_type: &str) -> AddSlotRequest {
        AddSlotRequest {
            slot_number: Some(number.to_string()),
            slot_type: Some(slot_type.to_string()),
        }
    }

    #[tokio::test]
    async fn test_add_and_update_slot() {
        let (state, _clock) = testing::state().await;
        let operator = testing::staff(&state, Role::Operator).await;

        let (status, Json(created)) = add_slot(State(state.clone()), operator.clone(), Json(slot("s101", "electric")))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.slot_number, "S101");
        assert_eq!(created.slot_type, SlotType::Large);
        assert!(!created.is_occupied);

        let err = add_slot(State(state.clone()), operator.clone(), Json(slot("S101", "standard")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        update_slot(
            State(state.clone()),
            operator.clone(),
            Path(created.slot_id),
            Json(UpdateSlotRequest {
                slot_type: Some("motorcycle".to_string()),
            }),
        )
        .await
        .unwrap();

        let err = update_slot(
            State(state.clone()),
            operator.clone(),
            Path(999),
            Json(UpdateSlotRequest {
                slot_type: Some("standard".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let Json(slots) = list_slots(State(state), operator).await.unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_type, SlotType::Motorcycle);
    }

    #[tokio::test]
    async fn test_slots_are_staff_only() {
        let (state, _clock) = testing::state().await;
        let jane = testing::customer(&state, "jane@example.com", "0712345678").await;

        let err = add_slot(State(state.clone()), jane.clone(), Json(slot("S101", "standard")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        let err = list_slots(State(state), jane).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_list_shows_parked_plate() {
        let (state, _clock) = testing::state().await;
        let jane = testing::customer(&state, "jane@example.com", "0712345678").await;
        let admin = testing::staff(&state, Role::Admin).await;
        let car = testing::vehicle(&state, &jane, "KAA 001A").await;
        let s101 = testing::slot(&state, "S101").await;
        testing::slot(&state, "S102").await;

        state.ledger.start_session(Some(car), Some(s101)).await.unwrap();

        let Json(slots) = list_slots(State(state), admin).await.unwrap();
        let parked = slots.iter().find(|s| s.slot_id == s101).unwrap();
        assert!(parked.is_occupied);
        assert_eq!(parked.current_plate.as_deref(), Some("KAA 001A"));
        assert!(slots.iter().any(|s| !s.is_occupied && s.current_plate.is_none()));
    }
}
