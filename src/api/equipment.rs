//! Equipment API endpoints (read-only registry)

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::equipment::EquipmentItem};

use super::AuthenticatedUser;

/// List all equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Equipment list", body = Vec<EquipmentItem>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<EquipmentItem>>> {
    claims.require_read_equipment()?;
    let equipment = state.services.equipment.list().await?;
    Ok(Json(equipment))
}

/// List equipment without an active exclusive assignment
#[utoipa::path(
    get,
    path = "/equipment/available",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Assignable equipment", body = Vec<EquipmentItem>)
    )
)]
pub async fn list_available_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<EquipmentItem>>> {
    claims.require_read_equipment()?;
    let equipment = state.services.equipment.list_available().await?;
    Ok(Json(equipment))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = EquipmentItem),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_read_equipment()?;
    let equipment = state.services.equipment.get_status(id).await?;
    Ok(Json(equipment))
}
