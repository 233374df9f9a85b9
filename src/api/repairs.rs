//! Repair ticket endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::repair::{CreateRepair, LinkRepairRequest, RepairTicketDetails, UpdateRepair},
};

use super::AuthenticatedUser;

/// Get a repair ticket
#[utoipa::path(
    get,
    path = "/repairs/{id}",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Repair ticket ID")),
    responses(
        (status = 200, description = "Repair ticket", body = RepairTicketDetails),
        (status = 404, description = "Repair ticket not found")
    )
)]
pub async fn get_repair(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RepairTicketDetails>> {
    let ticket = state.services.repairs.get(id).await?;
    Ok(Json(ticket))
}

/// Create a repair ticket
#[utoipa::path(
    post,
    path = "/repairs",
    tag = "repairs",
    security(("bearer_auth" = [])),
    request_body = CreateRepair,
    responses(
        (status = 201, description = "Repair ticket created", body = RepairTicketDetails),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_repair(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<CreateRepair>,
) -> AppResult<(StatusCode, Json<RepairTicketDetails>)> {
    let ticket = state.services.repairs.create(&request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Update a repair ticket; the linked cargo is reconciled afterwards
#[utoipa::path(
    patch,
    path = "/repairs/{id}",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Repair ticket ID")),
    request_body = UpdateRepair,
    responses(
        (status = 200, description = "Repair ticket updated", body = RepairTicketDetails),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Repair ticket not found")
    )
)]
pub async fn update_repair(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRepair>,
) -> AppResult<Json<RepairTicketDetails>> {
    let ticket = state.services.repairs.update(id, &request).await?;
    Ok(Json(ticket))
}

/// Link a repair ticket to a cargo record
#[utoipa::path(
    post,
    path = "/repairs/{id}/link",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Repair ticket ID")),
    request_body = LinkRepairRequest,
    responses(
        (status = 200, description = "Repair ticket linked", body = RepairTicketDetails),
        (status = 404, description = "Repair ticket or cargo not found")
    )
)]
pub async fn link_repair(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<LinkRepairRequest>,
) -> AppResult<Json<RepairTicketDetails>> {
    let ticket = state.services.repairs.link(id, request.cargo_id).await?;
    Ok(Json(ticket))
}
