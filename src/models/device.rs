//! Equivalent device and movement ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Equivalent (loaner) device with its resolved location name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquivalentDevice {
    pub id: Uuid,
    pub name: String,
    pub model: Option<String>,
    pub serial_number: String,
    /// IN_WAREHOUSE, AT_CUSTOMER, AT_SERVICE_CENTER, WITH_INSTALLATION_TEAM, IN_TRANSIT
    pub current_location: String,
    /// AVAILABLE, IN_USE, IN_MAINTENANCE, RESERVED, RETIRED
    pub current_status: String,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub location: Option<String>,
    pub status: Option<String>,
    pub location_id: Option<Uuid>,
    pub serial_number: Option<String>,
}

/// Immutable ledger row: one per location/status change of a device
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMovement {
    pub id: Uuid,
    pub device_id: Uuid,
    pub previous_location: Option<String>,
    pub new_location: String,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub previous_location_id: Option<Uuid>,
    pub new_location_id: Option<Uuid>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger row to be written
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub device_id: Uuid,
    pub previous_location: Option<String>,
    pub new_location: String,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub previous_location_id: Option<Uuid>,
    pub new_location_id: Option<Uuid>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub note: Option<String>,
}

/// Who caused a movement
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: None,
            name: Some("system".to_string()),
        }
    }
}

/// Dispatch request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[validate(length(min = 1, message = "At least one device id is required"))]
    pub device_ids: Vec<Uuid>,
    pub target_location_id: Uuid,
    pub note: Option<String>,
    /// Person the devices are handed to
    pub assignee_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub moved: u64,
    pub target_location_id: Uuid,
}
