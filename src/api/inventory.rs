//! Equivalent device inventory endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::device::{
        DeviceMovement, DeviceQuery, DispatchRequest, DispatchResponse, EquivalentDevice,
    },
};

use super::AuthenticatedUser;

/// List equivalent devices
#[utoipa::path(
    get,
    path = "/inventory/devices",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(DeviceQuery),
    responses(
        (status = 200, description = "Devices with their resolved location", body = Vec<EquivalentDevice>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_devices(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<DeviceQuery>,
) -> AppResult<Json<Vec<EquivalentDevice>>> {
    let devices = state.services.inventory.list_devices(&query).await?;
    Ok(Json(devices))
}

/// Get one device
#[utoipa::path(
    get,
    path = "/inventory/devices/{id}",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device", body = EquivalentDevice),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EquivalentDevice>> {
    let device = state.services.inventory.get_device(id).await?;
    Ok(Json(device))
}

/// Movement ledger of a device, newest first
#[utoipa::path(
    get,
    path = "/inventory/devices/{id}/movements",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Ledger entries", body = Vec<DeviceMovement>),
        (status = 404, description = "Device not found")
    )
)]
pub async fn list_movements(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<DeviceMovement>>> {
    let movements = state.services.inventory.movements(id).await?;
    Ok(Json(movements))
}

/// Move devices to a location in one transaction
#[utoipa::path(
    post,
    path = "/inventory/dispatch",
    tag = "inventory",
    security(("bearer_auth" = [])),
    request_body = DispatchRequest,
    responses(
        (status = 200, description = "Devices moved", body = DispatchResponse),
        (status = 400, description = "Empty device list"),
        (status = 404, description = "Target location not found")
    )
)]
pub async fn dispatch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<DispatchRequest>,
) -> AppResult<Json<DispatchResponse>> {
    request.validate()?;

    let moved = state
        .services
        .inventory
        .dispatch(&request, &claims.actor())
        .await?;

    Ok(Json(DispatchResponse {
        moved,
        target_location_id: request.target_location_id,
    }))
}
