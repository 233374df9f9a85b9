//! Cargo (shipment) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::RecordStatus;
use super::repair_metadata::{ApprovalState, RepairCosts, RepairMetadata, SparePart};
use crate::notes;

/// Cargo row from database
#[derive(Debug, Clone, FromRow)]
pub struct Cargo {
    pub id: Uuid,
    pub tracking_number: String,
    pub cargo_type: String,
    pub status: String,
    /// NULL when the schema has no record_status column
    pub record_status: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub target_location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Device line of a cargo
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CargoDevice {
    pub id: Uuid,
    pub cargo_id: Uuid,
    /// Inventory device resolved from the serial number when the line was written
    pub device_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i32,
    pub condition: Option<String>,
    pub purpose: Option<String>,
    pub from_equivalent_pool: bool,
    pub created_at: DateTime<Utc>,
}

/// Device line as submitted by clients
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CargoDeviceInput {
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub condition: Option<String>,
    pub purpose: Option<String>,
    /// Line refers to a unit of the equivalent-device pool
    #[serde(default)]
    pub from_equivalent_pool: bool,
}

impl CargoDeviceInput {
    pub fn trimmed_serial(&self) -> Option<&str> {
        self.serial_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Create cargo request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCargo {
    pub tracking_number: String,
    #[serde(rename = "type")]
    pub cargo_type: Option<String>,
    pub status: Option<String>,
    /// open, on_hold, device_repair or closed
    pub record_status: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    /// Where inbound equivalent devices are placed (default: headquarters)
    pub target_location_id: Option<Uuid>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub devices: Vec<CargoDeviceInput>,
}

/// Update cargo request. `devices`, when present, replaces every line.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCargo {
    pub tracking_number: Option<String>,
    #[serde(rename = "type")]
    pub cargo_type: Option<String>,
    pub status: Option<String>,
    pub record_status: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub target_location_id: Option<Uuid>,
    pub notes: Option<String>,
    #[validate(nested)]
    pub devices: Option<Vec<CargoDeviceInput>>,
}

/// Repair detail update for a cargo
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepairDetails {
    pub technician: Option<String>,
    pub operations: Option<Vec<String>>,
    pub spare_parts: Option<Vec<SparePart>>,
    pub costs: Option<RepairCosts>,
    pub approval_state: Option<ApprovalState>,
    /// When set, one history entry is appended with this action
    #[validate(length(min = 1, message = "History action cannot be empty"))]
    pub history_action: Option<String>,
    pub history_note: Option<String>,
}

/// Cargo as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CargoDetails {
    pub id: Uuid,
    pub tracking_number: String,
    #[serde(rename = "type")]
    pub cargo_type: String,
    pub status: String,
    /// Derived from repair metadata, never the raw column
    pub record_status: RecordStatus,
    pub stored_record_status: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub target_location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub devices: Vec<CargoDevice>,
    pub repair: Option<RepairMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CargoDetails {
    /// Assemble the API view. Structured metadata wins; a legacy tag line in
    /// the notes is reported when the cargo has no structured state.
    pub fn build(
        cargo: Cargo,
        devices: Vec<CargoDevice>,
        repair: Option<RepairMetadata>,
    ) -> Self {
        let decoded = cargo.notes.as_deref().map(notes::decode);
        let (notes, legacy) = match decoded {
            Some(d) => (Some(d.clean_text), d.metadata),
            None => (None, None),
        };
        let repair = repair.or(legacy);
        let active = repair.as_ref().map(|m| m.active).unwrap_or(false);

        Self {
            id: cargo.id,
            record_status: RecordStatus::derive(cargo.record_status.as_deref(), active),
            stored_record_status: cargo.record_status,
            tracking_number: cargo.tracking_number,
            cargo_type: cargo.cargo_type,
            status: cargo.status,
            sender: cargo.sender,
            receiver: cargo.receiver,
            target_location_id: cargo.target_location_id,
            notes,
            devices,
            repair,
            created_at: cargo.created_at,
            updated_at: cargo.updated_at,
        }
    }
}

/// Cargo list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CargoQuery {
    pub status: Option<String>,
    /// Filter on the derived record status
    pub record_status: Option<String>,
    #[serde(rename = "type")]
    pub cargo_type: Option<String>,
    /// Matches tracking number, sender or receiver
    pub search: Option<String>,
    /// created_at (default), tracking_number or record_status
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cargo(record_status: Option<&str>, notes: Option<&str>) -> Cargo {
        Cargo {
            id: Uuid::new_v4(),
            tracking_number: "TK900".to_string(),
            cargo_type: "OUTGOING".to_string(),
            status: "PENDING".to_string(),
            record_status: record_status.map(str::to_string),
            sender: None,
            receiver: None,
            target_location_id: None,
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_details_derive_device_repair_from_metadata() {
        let metadata = RepairMetadata::started(RepairMetadata::ENTER_REPAIR_ACTION);
        let details = CargoDetails::build(cargo(Some("ON_HOLD"), None), Vec::new(), Some(metadata));
        assert_eq!(details.record_status, RecordStatus::DeviceRepair);
        assert_eq!(details.stored_record_status.as_deref(), Some("ON_HOLD"));
    }

    #[test]
    fn test_details_fall_back_to_legacy_notes() {
        let metadata = RepairMetadata::started(RepairMetadata::ENTER_REPAIR_ACTION);
        let text = notes::encode("fragile, handle with care", &metadata);
        let details = CargoDetails::build(cargo(Some("ON_HOLD"), Some(&text)), Vec::new(), None);

        assert_eq!(details.notes.as_deref(), Some("fragile, handle with care"));
        assert_eq!(details.record_status, RecordStatus::DeviceRepair);
        assert_eq!(details.repair, Some(metadata));
    }

    #[test]
    fn test_details_without_metadata() {
        let details = CargoDetails::build(cargo(None, Some("plain")), Vec::new(), None);
        assert_eq!(details.record_status, RecordStatus::Open);
        assert_eq!(details.notes.as_deref(), Some("plain"));
        assert!(details.repair.is_none());
    }
}
