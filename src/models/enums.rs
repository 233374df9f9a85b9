//! Shared domain enums and the lookup tables that normalize client input.
//!
//! Status columns are stored as canonical upper-case text. Client input is
//! matched case-insensitively against fixed alias tables; anything unknown is
//! passed through upper-cased so that values added by newer clients survive.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lower-case, trim and fold spaces/hyphens to underscores.
fn lookup_key(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Map `input` through an alias table, falling back to an upper-cased pass-through.
fn canonical(input: &str, table: &[(&str, &'static str)]) -> String {
    let key = lookup_key(input);
    table
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| key.to_uppercase())
}

// ---------------------------------------------------------------------------
// RecordStatus
// ---------------------------------------------------------------------------

const RECORD_STATUS_TABLE: &[(&str, &str)] = &[
    ("open", "OPEN"),
    ("opened", "OPEN"),
    ("reopen", "OPEN"),
    ("on_hold", "ON_HOLD"),
    ("onhold", "ON_HOLD"),
    ("hold", "ON_HOLD"),
    ("device_repair", "ON_HOLD"),
    ("devicerepair", "ON_HOLD"),
    ("repair", "ON_HOLD"),
    ("closed", "CLOSED"),
    ("close", "CLOSED"),
];

/// Observed cargo workflow status, as reported to clients.
///
/// `DeviceRepair` is never stored: it is derived from active repair metadata
/// and persisted as `ON_HOLD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Open,
    OnHold,
    DeviceRepair,
    Closed,
}

impl RecordStatus {
    pub fn parse(input: &str) -> Option<Self> {
        match lookup_key(input).as_str() {
            "open" | "opened" | "reopen" => Some(RecordStatus::Open),
            "on_hold" | "onhold" | "hold" => Some(RecordStatus::OnHold),
            "device_repair" | "devicerepair" | "repair" => Some(RecordStatus::DeviceRepair),
            "closed" | "close" => Some(RecordStatus::Closed),
            _ => None,
        }
    }

    /// Value written to the `record_status` column
    pub fn stored(self) -> &'static str {
        match self {
            RecordStatus::Open => "OPEN",
            RecordStatus::OnHold | RecordStatus::DeviceRepair => "ON_HOLD",
            RecordStatus::Closed => "CLOSED",
        }
    }

    /// Derive the observed status from the stored column and the metadata flag.
    pub fn derive(stored: Option<&str>, repair_active: bool) -> Self {
        if repair_active {
            return RecordStatus::DeviceRepair;
        }
        match stored.map(|s| s.to_uppercase()).as_deref() {
            Some("ON_HOLD") => RecordStatus::OnHold,
            Some("CLOSED") => RecordStatus::Closed,
            _ => RecordStatus::Open,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Open => "open",
            RecordStatus::OnHold => "on_hold",
            RecordStatus::DeviceRepair => "device_repair",
            RecordStatus::Closed => "closed",
        }
    }
}

/// Canonical stored value for a client-supplied record status
pub fn normalize_record_status(input: &str) -> String {
    canonical(input, RECORD_STATUS_TABLE)
}

// ---------------------------------------------------------------------------
// CargoStatus
// ---------------------------------------------------------------------------

const CARGO_STATUS_TABLE: &[(&str, &str)] = &[
    ("pending", "PENDING"),
    ("created", "PENDING"),
    ("preparing", "PREPARING"),
    ("in_transit", "IN_TRANSIT"),
    ("intransit", "IN_TRANSIT"),
    ("shipped", "IN_TRANSIT"),
    ("delivered", "DELIVERED"),
    ("returned", "RETURNED"),
    ("cancelled", "CANCELLED"),
    ("canceled", "CANCELLED"),
];

/// Canonical stored value for a cargo delivery status
pub fn normalize_cargo_status(input: &str) -> String {
    canonical(input, CARGO_STATUS_TABLE)
}

// ---------------------------------------------------------------------------
// CargoType
// ---------------------------------------------------------------------------

const CARGO_TYPE_TABLE: &[(&str, &str)] = &[
    ("incoming", "INCOMING"),
    ("inbound", "INCOMING"),
    ("in", "INCOMING"),
    ("outgoing", "OUTGOING"),
    ("outbound", "OUTGOING"),
    ("out", "OUTGOING"),
    ("transfer", "TRANSFER"),
];

/// Canonical stored value for a cargo type
pub fn normalize_cargo_type(input: &str) -> String {
    canonical(input, CARGO_TYPE_TABLE)
}

pub const CARGO_TYPE_INCOMING: &str = "INCOMING";

// ---------------------------------------------------------------------------
// LocationType
// ---------------------------------------------------------------------------

/// Location type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Warehouse,
    Headquarters,
    Branch,
    Customer,
    ServiceCenter,
    InstallationTeam,
    Other,
}

const LOCATION_TYPE_TABLE: &[(&str, &str)] = &[
    ("warehouse", "WAREHOUSE"),
    ("depot", "WAREHOUSE"),
    ("headquarters", "HEADQUARTERS"),
    ("hq", "HEADQUARTERS"),
    ("merkez", "HEADQUARTERS"),
    ("branch", "BRANCH"),
    ("customer", "CUSTOMER"),
    ("service_center", "SERVICE_CENTER"),
    ("service", "SERVICE_CENTER"),
    ("servis", "SERVICE_CENTER"),
    ("installation_team", "INSTALLATION_TEAM"),
    ("installation", "INSTALLATION_TEAM"),
    ("team", "INSTALLATION_TEAM"),
    ("other", "OTHER"),
];

impl LocationType {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_location_type(input).as_str() {
            "WAREHOUSE" => Some(LocationType::Warehouse),
            "HEADQUARTERS" => Some(LocationType::Headquarters),
            "BRANCH" => Some(LocationType::Branch),
            "CUSTOMER" => Some(LocationType::Customer),
            "SERVICE_CENTER" => Some(LocationType::ServiceCenter),
            "INSTALLATION_TEAM" => Some(LocationType::InstallationTeam),
            "OTHER" => Some(LocationType::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::Warehouse => "WAREHOUSE",
            LocationType::Headquarters => "HEADQUARTERS",
            LocationType::Branch => "BRANCH",
            LocationType::Customer => "CUSTOMER",
            LocationType::ServiceCenter => "SERVICE_CENTER",
            LocationType::InstallationTeam => "INSTALLATION_TEAM",
            LocationType::Other => "OTHER",
        }
    }
}

pub fn normalize_location_type(input: &str) -> String {
    canonical(input, LOCATION_TYPE_TABLE)
}

// ---------------------------------------------------------------------------
// DeviceLocation
// ---------------------------------------------------------------------------

/// Where an equivalent device physically is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceLocation {
    InWarehouse,
    AtCustomer,
    AtServiceCenter,
    WithInstallationTeam,
    InTransit,
}

const DEVICE_LOCATION_TABLE: &[(&str, &str)] = &[
    ("in_warehouse", "IN_WAREHOUSE"),
    ("warehouse", "IN_WAREHOUSE"),
    ("at_customer", "AT_CUSTOMER"),
    ("customer", "AT_CUSTOMER"),
    ("at_service_center", "AT_SERVICE_CENTER"),
    ("at_service", "AT_SERVICE_CENTER"),
    ("service", "AT_SERVICE_CENTER"),
    ("with_installation_team", "WITH_INSTALLATION_TEAM"),
    ("installation_team", "WITH_INSTALLATION_TEAM"),
    ("in_transit", "IN_TRANSIT"),
    ("transit", "IN_TRANSIT"),
];

impl DeviceLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceLocation::InWarehouse => "IN_WAREHOUSE",
            DeviceLocation::AtCustomer => "AT_CUSTOMER",
            DeviceLocation::AtServiceCenter => "AT_SERVICE_CENTER",
            DeviceLocation::WithInstallationTeam => "WITH_INSTALLATION_TEAM",
            DeviceLocation::InTransit => "IN_TRANSIT",
        }
    }
}

pub fn normalize_device_location(input: &str) -> String {
    canonical(input, DEVICE_LOCATION_TABLE)
}

// ---------------------------------------------------------------------------
// DeviceStatus
// ---------------------------------------------------------------------------

/// Availability of an equivalent device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Available,
    InUse,
    InMaintenance,
    Reserved,
    Retired,
}

const DEVICE_STATUS_TABLE: &[(&str, &str)] = &[
    ("available", "AVAILABLE"),
    ("free", "AVAILABLE"),
    ("in_use", "IN_USE"),
    ("inuse", "IN_USE"),
    ("used", "IN_USE"),
    ("in_maintenance", "IN_MAINTENANCE"),
    ("maintenance", "IN_MAINTENANCE"),
    ("reserved", "RESERVED"),
    ("retired", "RETIRED"),
];

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Available => "AVAILABLE",
            DeviceStatus::InUse => "IN_USE",
            DeviceStatus::InMaintenance => "IN_MAINTENANCE",
            DeviceStatus::Reserved => "RESERVED",
            DeviceStatus::Retired => "RETIRED",
        }
    }
}

pub fn normalize_device_status(input: &str) -> String {
    canonical(input, DEVICE_STATUS_TABLE)
}

// ---------------------------------------------------------------------------
// RepairStatus
// ---------------------------------------------------------------------------

// RECEIVED, DIAGNOSING, WAITING_APPROVAL, WAITING_PARTS, REPAIRING, TESTING,
// COMPLETED, UNREPAIRABLE
const REPAIR_STATUS_TABLE: &[(&str, &str)] = &[
    ("received", "RECEIVED"),
    ("new", "RECEIVED"),
    ("diagnosing", "DIAGNOSING"),
    ("diagnosis", "DIAGNOSING"),
    ("waiting_approval", "WAITING_APPROVAL"),
    ("awaiting_approval", "WAITING_APPROVAL"),
    ("waiting_parts", "WAITING_PARTS"),
    ("awaiting_parts", "WAITING_PARTS"),
    ("repairing", "REPAIRING"),
    ("in_repair", "REPAIRING"),
    ("testing", "TESTING"),
    ("completed", "COMPLETED"),
    ("done", "COMPLETED"),
    ("unrepairable", "UNREPAIRABLE"),
    ("irreparable", "UNREPAIRABLE"),
];

pub fn normalize_repair_status(input: &str) -> String {
    canonical(input, REPAIR_STATUS_TABLE)
}

/// A ticket counts as closed only when COMPLETED or UNREPAIRABLE.
pub fn repair_status_is_closed(stored: &str) -> bool {
    matches!(
        stored.trim().to_uppercase().as_str(),
        "COMPLETED" | "UNREPAIRABLE"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_status_storage_mapping() {
        assert_eq!(normalize_record_status("device_repair"), "ON_HOLD");
        assert_eq!(normalize_record_status("Device Repair"), "ON_HOLD");
        assert_eq!(normalize_record_status("OPEN"), "OPEN");
        assert_eq!(normalize_record_status("on-hold"), "ON_HOLD");
        assert_eq!(normalize_record_status("closed"), "CLOSED");
        assert_eq!(RecordStatus::DeviceRepair.stored(), "ON_HOLD");
    }

    #[test]
    fn test_unknown_values_pass_through_uppercased() {
        assert_eq!(normalize_record_status("archived"), "ARCHIVED");
        assert_eq!(normalize_cargo_status("lost at sea"), "LOST_AT_SEA");
        assert_eq!(normalize_device_status("scrapped"), "SCRAPPED");
        assert_eq!(normalize_repair_status(""), "");
    }

    #[test]
    fn test_derive_record_status() {
        assert_eq!(RecordStatus::derive(Some("ON_HOLD"), true), RecordStatus::DeviceRepair);
        assert_eq!(RecordStatus::derive(Some("OPEN"), true), RecordStatus::DeviceRepair);
        assert_eq!(RecordStatus::derive(Some("ON_HOLD"), false), RecordStatus::OnHold);
        assert_eq!(RecordStatus::derive(Some("closed"), false), RecordStatus::Closed);
        assert_eq!(RecordStatus::derive(None, false), RecordStatus::Open);
    }

    #[test]
    fn test_record_status_parse() {
        assert_eq!(RecordStatus::parse("DEVICE_REPAIR"), Some(RecordStatus::DeviceRepair));
        assert_eq!(RecordStatus::parse(" open "), Some(RecordStatus::Open));
        assert_eq!(RecordStatus::parse("whatever"), None);
    }

    #[test]
    fn test_cargo_and_device_tables() {
        assert_eq!(normalize_cargo_type("Incoming"), CARGO_TYPE_INCOMING);
        assert_eq!(normalize_cargo_type("outbound"), "OUTGOING");
        assert_eq!(normalize_cargo_status("in transit"), "IN_TRANSIT");
        assert_eq!(normalize_device_location("in_warehouse"), "IN_WAREHOUSE");
        assert_eq!(normalize_device_status("maintenance"), "IN_MAINTENANCE");
    }

    #[test]
    fn test_location_type_parse() {
        assert_eq!(LocationType::parse("service center"), Some(LocationType::ServiceCenter));
        assert_eq!(LocationType::parse("HQ"), Some(LocationType::Headquarters));
        assert_eq!(LocationType::parse("moon base"), None);
    }

    #[test]
    fn test_repair_closed_definition() {
        assert!(repair_status_is_closed("COMPLETED"));
        assert!(repair_status_is_closed("unrepairable"));
        assert!(!repair_status_is_closed("REPAIRING"));
        assert!(!repair_status_is_closed("RECEIVED"));
        assert!(!repair_status_is_closed("SOMETHING_NEW"));
    }
}
