//! Location registry endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::location::{Location, LocationQuery},
};

use super::AuthenticatedUser;

/// List locations
#[utoipa::path(
    get,
    path = "/locations",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(LocationQuery),
    responses(
        (status = 200, description = "Known locations", body = Vec<Location>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_locations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<Location>>> {
    let locations = state
        .services
        .locations
        .list(query.active.unwrap_or(true))
        .await?;
    Ok(Json(locations))
}

/// Resolve the headquarters location
#[utoipa::path(
    get,
    path = "/locations/headquarters",
    tag = "locations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Headquarters location", body = Location),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No headquarters location")
    )
)]
pub async fn get_headquarters(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Location>> {
    let location = state
        .services
        .locations
        .resolve_headquarters()
        .await?
        .ok_or_else(|| AppError::NotFound("No headquarters location".to_string()))?;
    Ok(Json(location))
}
