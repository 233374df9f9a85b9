//! Cargo records, device lines and the record-status workflow

use std::collections::HashMap;

use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        cargo::{
            CargoDetails, CargoDevice, CargoDeviceInput, CargoQuery, CreateCargo,
            UpdateCargo, UpdateRepairDetails,
        },
        enums::{
            normalize_cargo_status, normalize_cargo_type, normalize_record_status, RecordStatus,
            CARGO_TYPE_INCOMING,
        },
        repair_metadata::{HistoryEntry, RepairMetadata},
    },
    notes,
    repository::{
        cargo::{CargoChanges, CargoRepository, NewCargo, NewCargoDevice},
        devices::DevicesRepository,
        repair_metadata::RepairMetadataRepository,
        Repository,
    },
};

use super::{
    gating::{LineRef, LocationGate},
    inventory::InventoryService,
};

/// What a record-status request does to a cargo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    NoOp,
    /// Gate, activate metadata, store ON_HOLD
    EnterRepair,
    /// Deactivate metadata and store the requested value
    LeaveRepair { completed: bool, stored: &'static str },
    /// Plain column write, metadata untouched
    SetStored(String),
}

impl Transition {
    fn stored_value(&self) -> Option<String> {
        match self {
            Transition::NoOp => None,
            Transition::EnterRepair => Some(RecordStatus::DeviceRepair.stored().to_string()),
            Transition::LeaveRepair { stored, .. } => Some(stored.to_string()),
            Transition::SetStored(value) => Some(value.clone()),
        }
    }
}

/// Plan the effect of requesting `requested` on a cargo currently observed as `current`.
///
/// Unknown values are stored as their upper-cased pass-through.
pub fn plan_transition(current: RecordStatus, requested: &str) -> Transition {
    let Some(target) = RecordStatus::parse(requested) else {
        return Transition::SetStored(normalize_record_status(requested));
    };

    if target == current {
        Transition::NoOp
    } else if target == RecordStatus::DeviceRepair {
        Transition::EnterRepair
    } else if current == RecordStatus::DeviceRepair {
        Transition::LeaveRepair {
            completed: target == RecordStatus::Closed,
            stored: target.stored(),
        }
    } else {
        Transition::SetStored(target.stored().to_string())
    }
}

/// Trim and require a tracking number
fn clean_tracking_number(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Tracking number is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Metadata being edited plus the history entries not written yet
struct PendingMetadata {
    metadata: RepairMetadata,
    /// Index of the first history entry to append
    unsaved_from: usize,
    /// Already has a row in cargo_repair_states
    persisted: bool,
}

impl PendingMetadata {
    fn stored(metadata: RepairMetadata) -> Self {
        let unsaved_from = metadata.history.len();
        Self {
            metadata,
            unsaved_from,
            persisted: true,
        }
    }

    /// Metadata that exists only in notes; all of its history is new
    fn adopted(metadata: RepairMetadata) -> Self {
        Self {
            metadata,
            unsaved_from: 0,
            persisted: false,
        }
    }

    async fn save(&self, conn: &mut PgConnection, cargo_id: Uuid) -> AppResult<()> {
        RepairMetadataRepository::save_state(conn, cargo_id, &self.metadata).await?;
        for entry in &self.metadata.history[self.unsaved_from..] {
            RepairMetadataRepository::append_history(conn, cargo_id, entry).await?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct CargoService {
    repository: Repository,
    gate: LocationGate,
    inventory: InventoryService,
}

impl CargoService {
    pub fn new(repository: Repository, gate: LocationGate, inventory: InventoryService) -> Self {
        Self {
            repository,
            gate,
            inventory,
        }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get cargo with its lines and repair metadata
    pub async fn get(&self, id: Uuid) -> AppResult<CargoDetails> {
        let cargo = self.repository.cargo.get_by_id(id).await?;
        let devices = self.repository.cargo.devices(id).await?;
        let repair = self.repository.repair_metadata.load(id).await?;
        Ok(CargoDetails::build(cargo, devices, repair))
    }

    /// List cargo; every record reports its derived record status
    pub async fn list(&self, query: &CargoQuery) -> AppResult<(Vec<CargoDetails>, i64)> {
        let (rows, total) = self.repository.cargo.list(query).await?;
        let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();

        let mut devices: HashMap<Uuid, Vec<CargoDevice>> = HashMap::new();
        for line in self.repository.cargo.devices_for(&ids).await? {
            devices.entry(line.cargo_id).or_default().push(line);
        }
        let mut repairs = self.repository.repair_metadata.load_many(&ids).await?;

        let details = rows
            .into_iter()
            .map(|cargo| {
                let lines = devices.remove(&cargo.id).unwrap_or_default();
                let repair = repairs.remove(&cargo.id);
                CargoDetails::build(cargo, lines, repair)
            })
            .collect();
        Ok((details, total))
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Create a cargo record.
    ///
    /// `device_repair` at creation initializes the metadata without gating.
    /// Incoming cargo relocates its pool devices once committed.
    pub async fn create(&self, request: &CreateCargo) -> AppResult<CargoDetails> {
        request.validate()?;
        let tracking_number = clean_tracking_number(&request.tracking_number)?;

        if self
            .repository
            .cargo
            .tracking_number_exists(&tracking_number, None)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Tracking number {} already exists",
                tracking_number
            )));
        }

        let decoded = request.notes.as_deref().map(notes::decode);
        let (clean_notes, mut metadata) = match decoded {
            Some(d) => (Some(d.clean_text), d.metadata),
            None => (None, None),
        };

        let stored_status = match request.record_status.as_deref() {
            None => RecordStatus::Open.stored().to_string(),
            Some(raw) => match RecordStatus::parse(raw) {
                Some(RecordStatus::DeviceRepair) => {
                    let mut m = metadata.take().unwrap_or_default();
                    if !m.active {
                        m.enter_repair(HistoryEntry::new(RepairMetadata::CREATED_IN_REPAIR_ACTION));
                    }
                    metadata = Some(m);
                    RecordStatus::DeviceRepair.stored().to_string()
                }
                Some(status) => status.stored().to_string(),
                None => normalize_record_status(raw),
            },
        };

        let new_cargo = NewCargo {
            tracking_number,
            cargo_type: request
                .cargo_type
                .as_deref()
                .map(normalize_cargo_type)
                .unwrap_or_else(|| "OUTGOING".to_string()),
            status: request
                .status
                .as_deref()
                .map(normalize_cargo_status)
                .unwrap_or_else(|| "PENDING".to_string()),
            record_status: stored_status,
            sender: request.sender.clone(),
            receiver: request.receiver.clone(),
            target_location_id: request.target_location_id,
            notes: clean_notes,
        };

        let mut tx = self.repository.begin().await?;
        let cargo = self.repository.cargo.insert(&mut tx, &new_cargo).await?;
        let lines = Self::link_lines(&mut tx, &request.devices).await?;
        let devices = CargoRepository::insert_devices(&mut tx, cargo.id, &lines).await?;
        if let Some(ref m) = metadata {
            PendingMetadata::adopted(m.clone()).save(&mut tx, cargo.id).await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Created cargo {} ({}, {} device line(s))",
            cargo.tracking_number,
            cargo.id,
            devices.len()
        );

        if cargo.cargo_type == CARGO_TYPE_INCOMING {
            self.inventory.relocate_inbound(&cargo, &devices).await;
        }

        Ok(CargoDetails::build(cargo, devices, metadata))
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Update a cargo record in one transaction.
    ///
    /// A request to enter device repair is gated before anything is written.
    pub async fn update(&self, id: Uuid, request: &UpdateCargo) -> AppResult<CargoDetails> {
        request.validate()?;

        let current = self.get(id).await?;
        let transition = request
            .record_status
            .as_deref()
            .map(|raw| plan_transition(current.record_status, raw))
            .unwrap_or(Transition::NoOp);

        if transition == Transition::EnterRepair {
            match request.devices {
                Some(ref lines) => {
                    let refs: Vec<LineRef> = lines.iter().map(LineRef::from).collect();
                    self.gate.check(id, &refs).await?;
                }
                None => self.gate.check_cargo(id).await?,
            }
        }

        let tracking_number = match request.tracking_number.as_deref() {
            Some(raw) => {
                let cleaned = clean_tracking_number(raw)?;
                if self
                    .repository
                    .cargo
                    .tracking_number_exists(&cleaned, Some(id))
                    .await?
                {
                    return Err(AppError::Conflict(format!(
                        "Tracking number {} already exists",
                        cleaned
                    )));
                }
                Some(cleaned)
            }
            None => None,
        };

        let submitted = request.notes.as_deref().map(notes::decode);

        let mut tx = self.repository.begin().await?;
        let locked = self.repository.cargo.lock(&mut tx, id).await?;

        let mut pending = match RepairMetadataRepository::load_in(&mut tx, id).await? {
            Some(m) => Some(PendingMetadata::stored(m)),
            None => submitted
                .as_ref()
                .and_then(|d| d.metadata.clone())
                .or_else(|| locked.notes.as_deref().and_then(|n| notes::decode(n).metadata))
                .map(PendingMetadata::adopted),
        };
        let mut metadata_dirty = pending.as_ref().map(|p| !p.persisted).unwrap_or(false);

        // Notes are stored clean once their metadata lives in the tables
        let notes_value = match submitted {
            Some(d) => Some(d.clean_text),
            None if metadata_dirty => locked.notes.as_deref().map(|n| notes::strip(n).into_owned()),
            None => None,
        };

        let changes = CargoChanges {
            tracking_number,
            cargo_type: request.cargo_type.as_deref().map(normalize_cargo_type),
            status: request.status.as_deref().map(normalize_cargo_status),
            record_status: transition.stored_value(),
            sender: request.sender.clone(),
            receiver: request.receiver.clone(),
            target_location_id: request.target_location_id,
            notes: notes_value,
        };
        self.repository.cargo.update(&mut tx, id, &changes).await?;

        if let Some(ref inputs) = request.devices {
            let lines = Self::link_lines(&mut tx, inputs).await?;
            CargoRepository::replace_devices(&mut tx, id, &lines).await?;
        }

        match transition {
            Transition::EnterRepair => {
                let mut p = pending
                    .take()
                    .unwrap_or_else(|| PendingMetadata::adopted(RepairMetadata::default()));
                p.metadata
                    .enter_repair(HistoryEntry::new(RepairMetadata::ENTER_REPAIR_ACTION));
                pending = Some(p);
                metadata_dirty = true;
            }
            Transition::LeaveRepair { completed, .. } => {
                if let Some(p) = pending.as_mut() {
                    let action = if completed {
                        RepairMetadata::CLOSE_ACTION
                    } else {
                        RepairMetadata::REOPEN_ACTION
                    };
                    p.metadata.leave_repair(completed, HistoryEntry::new(action));
                    metadata_dirty = true;
                }
            }
            Transition::NoOp | Transition::SetStored(_) => {}
        }

        if metadata_dirty {
            if let Some(ref p) = pending {
                p.save(&mut tx, id).await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Updated cargo {} ({}), record status {:?}",
            locked.tracking_number,
            id,
            transition
        );

        self.get(id).await
    }

    /// Set repair detail fields and optionally append one history entry
    pub async fn update_repair_details(
        &self,
        id: Uuid,
        request: &UpdateRepairDetails,
    ) -> AppResult<CargoDetails> {
        request.validate()?;

        let mut tx = self.repository.begin().await?;
        let locked = self.repository.cargo.lock(&mut tx, id).await?;

        let mut pending = match RepairMetadataRepository::load_in(&mut tx, id).await? {
            Some(m) => PendingMetadata::stored(m),
            None => PendingMetadata::adopted(
                locked
                    .notes
                    .as_deref()
                    .and_then(|n| notes::decode(n).metadata)
                    .unwrap_or_default(),
            ),
        };

        let metadata = &mut pending.metadata;
        if let Some(ref technician) = request.technician {
            metadata.technician = Some(technician.trim().to_string()).filter(|t| !t.is_empty());
        }
        if let Some(ref operations) = request.operations {
            metadata.operations = operations.clone();
        }
        if let Some(ref parts) = request.spare_parts {
            metadata.spare_parts = parts.clone();
        }
        if let Some(ref costs) = request.costs {
            metadata.costs = costs.clone().totaled();
        }
        if let Some(approval) = request.approval_state {
            metadata.approval_state = approval;
        }
        if let Some(ref action) = request.history_action {
            let mut entry = HistoryEntry::new(action.trim()).with_note(request.history_note.clone());
            entry.technician = metadata.technician.clone();
            entry.operations = request.operations.clone().unwrap_or_default();
            metadata.append_history(entry);
        }

        pending.save(&mut tx, id).await?;
        if locked.notes.as_deref().map(|n| n.contains(notes::METADATA_TAG)).unwrap_or(false) {
            let changes = CargoChanges {
                notes: locked.notes.as_deref().map(|n| notes::strip(n).into_owned()),
                ..Default::default()
            };
            self.repository.cargo.update(&mut tx, id, &changes).await?;
        }
        tx.commit().await?;

        tracing::info!("Updated repair details of cargo {} ({})", locked.tracking_number, id);
        self.get(id).await
    }

    /// Move metadata still embedded in cargo notes into the repair tables.
    ///
    /// Record-status filters read the tables only, so this runs at startup.
    /// Notes whose tag line does not parse are left as they are.
    pub async fn adopt_legacy_notes(&self) -> AppResult<u64> {
        let mut adopted = 0;
        for id in self.repository.cargo.with_legacy_metadata().await? {
            let mut tx = self.repository.begin().await?;
            let locked = self.repository.cargo.lock(&mut tx, id).await?;
            if RepairMetadataRepository::load_in(&mut tx, id).await?.is_some() {
                continue;
            }
            let Some(decoded) = locked.notes.as_deref().map(notes::decode) else {
                continue;
            };
            let Some(metadata) = decoded.metadata else {
                tracing::debug!("Cargo {}: unparsable metadata line left in notes", id);
                continue;
            };

            PendingMetadata::adopted(metadata).save(&mut tx, id).await?;
            let changes = CargoChanges {
                notes: Some(decoded.clean_text),
                ..Default::default()
            };
            self.repository.cargo.update(&mut tx, id, &changes).await?;
            tx.commit().await?;
            adopted += 1;
        }

        if adopted > 0 {
            tracing::info!("Adopted repair metadata from the notes of {} cargo record(s)", adopted);
        }
        Ok(adopted)
    }

    /// Build device lines, capturing the inventory link of each serial number
    async fn link_lines(
        conn: &mut PgConnection,
        inputs: &[CargoDeviceInput],
    ) -> AppResult<Vec<NewCargoDevice>> {
        let serials: Vec<String> = inputs
            .iter()
            .filter_map(|line| line.trimmed_serial())
            .map(str::to_string)
            .collect();
        let links: HashMap<String, Uuid> = DevicesRepository::ids_by_serials(conn, &serials)
            .await?
            .into_iter()
            .map(|(id, serial)| (serial, id))
            .collect();

        Ok(inputs
            .iter()
            .map(|line| {
                let serial = line.trimmed_serial().map(str::to_string);
                NewCargoDevice {
                    device_id: serial.as_ref().and_then(|s| links.get(s).copied()),
                    device_name: line.device_name.clone(),
                    model: line.model.clone(),
                    serial_number: serial,
                    quantity: line.quantity.unwrap_or(1),
                    condition: line.condition.clone(),
                    purpose: line.purpose.clone(),
                    from_equivalent_pool: line.from_equivalent_pool,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_repair_from_open_or_hold() {
        assert_eq!(plan_transition(RecordStatus::Open, "device_repair"), Transition::EnterRepair);
        assert_eq!(plan_transition(RecordStatus::OnHold, "DEVICE_REPAIR"), Transition::EnterRepair);
        assert_eq!(
            Transition::EnterRepair.stored_value().as_deref(),
            Some("ON_HOLD")
        );
    }

    #[test]
    fn test_same_status_is_noop() {
        assert_eq!(plan_transition(RecordStatus::DeviceRepair, "device_repair"), Transition::NoOp);
        assert_eq!(plan_transition(RecordStatus::Open, "open"), Transition::NoOp);
        assert_eq!(Transition::NoOp.stored_value(), None);
    }

    #[test]
    fn test_leave_repair() {
        assert_eq!(
            plan_transition(RecordStatus::DeviceRepair, "closed"),
            Transition::LeaveRepair { completed: true, stored: "CLOSED" }
        );
        assert_eq!(
            plan_transition(RecordStatus::DeviceRepair, "open"),
            Transition::LeaveRepair { completed: false, stored: "OPEN" }
        );
        assert_eq!(
            plan_transition(RecordStatus::DeviceRepair, "on_hold"),
            Transition::LeaveRepair { completed: false, stored: "ON_HOLD" }
        );
    }

    #[test]
    fn test_plain_and_unknown_values() {
        assert_eq!(
            plan_transition(RecordStatus::Open, "closed"),
            Transition::SetStored("CLOSED".to_string())
        );
        assert_eq!(
            plan_transition(RecordStatus::Open, "archived"),
            Transition::SetStored("ARCHIVED".to_string())
        );
    }

    #[test]
    fn test_tracking_number_is_required() {
        assert_eq!(clean_tracking_number("  TK-0001 ").unwrap(), "TK-0001");
        assert!(matches!(
            clean_tracking_number("   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_pending_metadata_tracks_new_entries() {
        let mut stored = PendingMetadata::stored(RepairMetadata::started("first"));
        stored.metadata.append_history(HistoryEntry::new("second"));
        assert_eq!(stored.metadata.history[stored.unsaved_from..].len(), 1);

        let adopted = PendingMetadata::adopted(RepairMetadata::started("legacy"));
        assert_eq!(adopted.metadata.history[adopted.unsaved_from..].len(), 1);
    }

    #[test]
    fn test_legacy_notes_stored_clean() {
        let legacy = notes::encode("Fragile, two boxes", &RepairMetadata::started("legacy"));
        assert_eq!(notes::strip(&legacy), "Fragile, two boxes");
        assert_eq!(notes::strip("no metadata here"), "no metadata here");
    }
}
