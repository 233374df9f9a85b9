//! Cargo record endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::cargo::{CargoDetails, CargoQuery, CreateCargo, UpdateCargo, UpdateRepairDetails},
};

use super::AuthenticatedUser;

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of records
    pub items: Vec<T>,
    /// Total number of records
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Records per page
    pub per_page: i64,
}

/// List cargo records with filters and pagination
#[utoipa::path(
    get,
    path = "/cargo",
    tag = "cargo",
    security(("bearer_auth" = [])),
    params(CargoQuery),
    responses(
        (status = 200, description = "Cargo records, record status derived", body = PaginatedResponse<CargoDetails>),
        (status = 400, description = "Unknown record status filter"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_cargo(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<CargoQuery>,
) -> AppResult<Json<PaginatedResponse<CargoDetails>>> {
    let (items, total) = state.services.cargo.list(&query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(20).clamp(1, 200),
    }))
}

/// Get cargo details by ID
#[utoipa::path(
    get,
    path = "/cargo/{id}",
    tag = "cargo",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cargo ID")),
    responses(
        (status = 200, description = "Cargo details", body = CargoDetails),
        (status = 404, description = "Cargo not found")
    )
)]
pub async fn get_cargo(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CargoDetails>> {
    let cargo = state.services.cargo.get(id).await?;
    Ok(Json(cargo))
}

/// Create a cargo record
#[utoipa::path(
    post,
    path = "/cargo",
    tag = "cargo",
    security(("bearer_auth" = [])),
    request_body = CreateCargo,
    responses(
        (status = 201, description = "Cargo created", body = CargoDetails),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Tracking number already exists")
    )
)]
pub async fn create_cargo(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<CreateCargo>,
) -> AppResult<(StatusCode, Json<CargoDetails>)> {
    let created = state.services.cargo.create(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a cargo record
#[utoipa::path(
    patch,
    path = "/cargo/{id}",
    tag = "cargo",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = UpdateCargo,
    responses(
        (status = 200, description = "Cargo updated", body = CargoDetails),
        (status = 400, description = "Invalid input or device not at headquarters"),
        (status = 404, description = "Cargo not found"),
        (status = 409, description = "Tracking number already exists")
    )
)]
pub async fn update_cargo(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCargo>,
) -> AppResult<Json<CargoDetails>> {
    let updated = state.services.cargo.update(id, &request).await?;
    Ok(Json(updated))
}

/// Set repair details of a cargo
#[utoipa::path(
    put,
    path = "/cargo/{id}/repair",
    tag = "cargo",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = UpdateRepairDetails,
    responses(
        (status = 200, description = "Repair details updated", body = CargoDetails),
        (status = 404, description = "Cargo not found")
    )
)]
pub async fn update_repair_details(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRepairDetails>,
) -> AppResult<Json<CargoDetails>> {
    let updated = state.services.cargo.update_repair_details(id, &request).await?;
    Ok(Json(updated))
}
