//! Reconciliation maintenance endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::repair::ReconcileSummary};

use super::AuthenticatedUser;

/// Retry pending cargo reconciliations
#[utoipa::path(
    post,
    path = "/reconcile/pending",
    tag = "reconcile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Outbox drained", body = ReconcileSummary),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn drain_pending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReconcileSummary>> {
    tracing::info!("Reconciliation drain requested by {}", claims.sub);
    let summary = state.services.reconciler.drain_outbox().await?;
    Ok(Json(summary))
}
