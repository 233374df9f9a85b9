//! Repair ticket model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::repair_status_is_closed;
use super::repair_metadata::RepairMetadata;
use crate::notes;

/// Repair ticket row from database
#[derive(Debug, Clone, FromRow)]
pub struct RepairTicket {
    pub id: Uuid,
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub customer_name: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    /// Cargo link mirrored from the `[CARGO:<id>]` tag in notes
    pub cargo_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepairTicket {
    pub fn is_closed(&self) -> bool {
        repair_status_is_closed(&self.status)
    }
}

/// Repair ticket as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairTicketDetails {
    pub id: Uuid,
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub customer_name: Option<String>,
    pub status: String,
    pub closed: bool,
    /// Notes without the metadata line
    pub notes: Option<String>,
    pub cargo_id: Option<Uuid>,
    /// Technician, operations and cost detail carried in the notes
    pub details: Option<RepairMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RepairTicket> for RepairTicketDetails {
    fn from(ticket: RepairTicket) -> Self {
        let closed = ticket.is_closed();
        let decoded = ticket.notes.as_deref().map(notes::decode);
        let cargo_id = ticket
            .cargo_id
            .or_else(|| ticket.notes.as_deref().and_then(notes::extract_cargo_link));
        Self {
            id: ticket.id,
            device_name: ticket.device_name,
            model: ticket.model,
            serial_number: ticket.serial_number,
            customer_name: ticket.customer_name,
            status: ticket.status,
            closed,
            notes: decoded.as_ref().map(|d| d.clean_text.clone()),
            cargo_id,
            details: decoded.and_then(|d| d.metadata),
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// Create repair ticket request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepair {
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub customer_name: Option<String>,
    /// Defaults to RECEIVED
    pub status: Option<String>,
    pub notes: Option<String>,
    /// Structured detail, stored as the metadata line of the notes
    pub details: Option<RepairMetadata>,
}

/// Update repair ticket request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepair {
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub customer_name: Option<String>,
    #[validate(length(min = 1, message = "Status cannot be empty"))]
    pub status: Option<String>,
    /// Replaces the notes body; an existing metadata line is kept unless `details` is set
    pub notes: Option<String>,
    pub details: Option<RepairMetadata>,
}

/// Link a repair ticket to a cargo
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkRepairRequest {
    pub cargo_id: Uuid,
}

/// Outcome of a pass over pending reconciliations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReconcileSummary {
    /// Outbox entries settled
    pub processed: u64,
    /// Outbox entries left pending after a failed attempt
    pub failed: u64,
}
