//! Repair-workflow metadata attached to a cargo record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Progress of the repair workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl MetadataStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataStatus::Pending => "pending",
            MetadataStatus::InProgress => "in_progress",
            MetadataStatus::Completed => "completed",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "in_progress" => MetadataStatus::InProgress,
            "completed" => MetadataStatus::Completed,
            _ => MetadataStatus::Pending,
        }
    }
}

/// Customer approval of the repair quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    #[default]
    NotRequired,
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalState::NotRequired => "not_required",
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "pending" => ApprovalState::Pending,
            "approved" => ApprovalState::Approved,
            "rejected" => ApprovalState::Rejected,
            _ => ApprovalState::NotRequired,
        }
    }
}

/// Cost breakdown of a repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RepairCosts {
    #[serde(default)]
    pub labor: Decimal,
    #[serde(default)]
    pub parts: Decimal,
    /// Labor plus parts, recomputed whenever costs are written
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

impl RepairCosts {
    /// Same costs with `total` recomputed from labor and parts
    pub fn totaled(mut self) -> Self {
        self.total = self.labor + self.parts;
        self
    }
}

/// One spare part consumed by a repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SparePart {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

fn default_quantity() -> i32 {
    1
}

/// Append-only history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl HistoryEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            technician: None,
            operations: Vec::new(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// Structured repair metadata of a cargo record.
///
/// `active` alone decides whether the cargo reports `device_repair`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RepairMetadata {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub status: MetadataStatus,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub spare_parts: Vec<SparePart>,
    #[serde(default)]
    pub costs: RepairCosts,
    #[serde(default)]
    pub approval_state: ApprovalState,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl RepairMetadata {
    pub const ENTER_REPAIR_ACTION: &'static str = "moved to device-repair state";
    pub const CREATED_IN_REPAIR_ACTION: &'static str = "created in device-repair state";
    pub const REOPEN_ACTION: &'static str = "left device-repair state (reopened)";
    pub const CLOSE_ACTION: &'static str = "left device-repair state (closed)";

    /// Fresh metadata for a cargo entering the repair workflow
    pub fn started(action: &str) -> Self {
        let mut metadata = Self::default();
        metadata.enter_repair(HistoryEntry::new(action));
        metadata
    }

    /// Push exactly one history entry. Prior entries are never touched.
    pub fn append_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn enter_repair(&mut self, entry: HistoryEntry) {
        self.active = true;
        self.status = MetadataStatus::InProgress;
        self.append_history(entry);
    }

    /// Leave the repair workflow, either completed (closed) or back to pending.
    pub fn leave_repair(&mut self, completed: bool, entry: HistoryEntry) {
        self.active = false;
        self.status = if completed {
            MetadataStatus::Completed
        } else {
            MetadataStatus::Pending
        };
        self.append_history(entry);
    }
}

/// Stored repair state row (metadata without history)
#[derive(Debug, Clone, FromRow)]
pub struct RepairStateRow {
    pub cargo_id: Uuid,
    pub active: bool,
    pub status: String,
    pub technician: Option<String>,
    pub operations: sqlx::types::Json<Vec<String>>,
    pub spare_parts: sqlx::types::Json<Vec<SparePart>>,
    pub costs: sqlx::types::Json<RepairCosts>,
    pub approval_state: String,
    pub updated_at: DateTime<Utc>,
}

/// Stored history row
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub cargo_id: Uuid,
    pub action: String,
    pub technician: Option<String>,
    pub operations: sqlx::types::Json<Vec<String>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            timestamp: row.created_at,
            action: row.action,
            technician: row.technician,
            operations: row.operations.0,
            note: row.note,
        }
    }
}

impl RepairStateRow {
    pub fn into_metadata(self, history: Vec<HistoryEntry>) -> RepairMetadata {
        RepairMetadata {
            active: self.active,
            status: MetadataStatus::from_db(&self.status),
            technician: self.technician,
            operations: self.operations.0,
            spare_parts: self.spare_parts.0,
            costs: self.costs.0,
            approval_state: ApprovalState::from_db(&self.approval_state),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_metadata() {
        let m = RepairMetadata::started(RepairMetadata::ENTER_REPAIR_ACTION);
        assert!(m.active);
        assert_eq!(m.status, MetadataStatus::InProgress);
        assert_eq!(m.history.len(), 1);
        assert_eq!(m.history[0].action, RepairMetadata::ENTER_REPAIR_ACTION);
    }

    #[test]
    fn test_append_preserves_prior_entries() {
        let mut m = RepairMetadata::started("first");
        let first = m.history[0].clone();
        m.append_history(HistoryEntry::new("second").with_note(Some("swap board".into())));
        assert_eq!(m.history.len(), 2);
        assert_eq!(m.history[0], first);
        assert_eq!(m.history[1].note.as_deref(), Some("swap board"));
    }

    #[test]
    fn test_leave_repair() {
        let mut m = RepairMetadata::started("start");
        m.leave_repair(true, HistoryEntry::new(RepairMetadata::CLOSE_ACTION));
        assert!(!m.active);
        assert_eq!(m.status, MetadataStatus::Completed);

        m.enter_repair(HistoryEntry::new("again"));
        m.leave_repair(false, HistoryEntry::new(RepairMetadata::REOPEN_ACTION));
        assert_eq!(m.status, MetadataStatus::Pending);
        assert_eq!(m.history.len(), 4);
    }

    #[test]
    fn test_costs_total() {
        let costs = RepairCosts {
            labor: Decimal::new(15000, 2),
            parts: Decimal::new(4550, 2),
            total: Decimal::new(1, 0),
            currency: Some("TRY".into()),
        }
        .totaled();
        assert_eq!(costs.total, Decimal::new(19550, 2));

        let json = serde_json::to_value(&costs).unwrap();
        assert_eq!(json["total"], serde_json::json!("195.50"));
    }
}
