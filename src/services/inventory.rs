//! Equivalent device inventory: dispatch and the movement ledger

use std::collections::{BTreeSet, HashSet};

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        cargo::{Cargo, CargoDevice},
        device::{Actor, DeviceMovement, DeviceQuery, DispatchRequest, EquivalentDevice, NewMovement},
        enums::{DeviceLocation, DeviceStatus, LocationType},
        location::Location,
    },
    repository::{devices::DevicesRepository, movements::MovementsRepository, Repository},
};

use super::locations::LocationsService;

/// Placement a device takes when sent to a location of the given type
pub fn placement_for(location_type: Option<LocationType>) -> (DeviceLocation, DeviceStatus) {
    match location_type {
        Some(LocationType::InstallationTeam) => {
            (DeviceLocation::WithInstallationTeam, DeviceStatus::InUse)
        }
        Some(LocationType::ServiceCenter) => {
            (DeviceLocation::AtServiceCenter, DeviceStatus::InMaintenance)
        }
        Some(LocationType::Customer) => (DeviceLocation::AtCustomer, DeviceStatus::Available),
        _ => (DeviceLocation::InWarehouse, DeviceStatus::Available),
    }
}

/// Ledger note of a dispatch
fn dispatch_note(note: Option<&str>, assignee_name: Option<&str>) -> Option<String> {
    let note = note.map(str::trim).filter(|s| !s.is_empty());
    let assignee = assignee_name.map(str::trim).filter(|s| !s.is_empty());
    match (note, assignee) {
        (Some(n), Some(a)) => Some(format!("{} (assigned to {})", n, a)),
        (Some(n), None) => Some(n.to_string()),
        (None, Some(a)) => Some(format!("Assigned to {}", a)),
        (None, None) => None,
    }
}

/// Distinct ids in the order their rows are locked.
///
/// Concurrent dispatches sharing devices always lock them in the same order.
fn lock_order(ids: &[Uuid]) -> Vec<Uuid> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Ledger note of an inbound relocation
fn inbound_note(tracking_number: &str) -> String {
    format!("Incoming cargo {}", tracking_number)
}

/// Split the pool lines of a cargo into linked device ids and the serials of
/// lines that still need a lookup
fn inbound_lines(lines: &[CargoDevice]) -> (Vec<Uuid>, Vec<String>) {
    let pool_lines = lines.iter().filter(|line| line.from_equivalent_pool);
    let mut ids = Vec::new();
    let mut serials = Vec::new();
    for line in pool_lines {
        match (line.device_id, line.serial_number.as_deref().map(str::trim)) {
            (Some(id), _) => ids.push(id),
            (None, Some(serial)) if !serial.is_empty() => serials.push(serial.to_string()),
            (None, _) => {}
        }
    }
    (ids, serials)
}

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
    locations: LocationsService,
}

impl InventoryService {
    pub fn new(repository: Repository, locations: LocationsService) -> Self {
        Self { repository, locations }
    }

    pub async fn list_devices(&self, query: &DeviceQuery) -> AppResult<Vec<EquivalentDevice>> {
        self.repository.devices.list(query).await
    }

    pub async fn get_device(&self, id: Uuid) -> AppResult<EquivalentDevice> {
        self.repository.devices.get_by_id(id).await
    }

    /// Ledger of one device, newest first
    pub async fn movements(&self, device_id: Uuid) -> AppResult<Vec<DeviceMovement>> {
        self.repository.devices.get_by_id(device_id).await?;
        self.repository.movements.list_for_device(device_id).await
    }

    /// Move devices to a location in one all-or-nothing transaction.
    ///
    /// Unknown device ids are skipped. Returns the number of devices moved,
    /// which equals the number of ledger entries written.
    pub async fn dispatch(&self, request: &DispatchRequest, actor: &Actor) -> AppResult<u64> {
        let target = self
            .repository
            .locations
            .get_by_id(request.target_location_id)
            .await?;
        let note = dispatch_note(request.note.as_deref(), request.assignee_name.as_deref());

        let device_ids = lock_order(&request.device_ids);
        let mut tx = self.repository.begin().await?;
        let mut moved = 0;

        for &device_id in &device_ids {
            match Self::move_device(&mut tx, device_id, &target, note.clone(), actor).await? {
                Some(_) => moved += 1,
                None => tracing::debug!("Dispatch: device {} not found, skipped", device_id),
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Dispatched {}/{} device(s) to '{}' ({})",
            moved,
            device_ids.len(),
            target.name,
            target.id
        );
        Ok(moved)
    }

    /// Place inbound pool devices of a freshly created incoming cargo.
    ///
    /// Runs after the cargo is committed. Failures are logged per device and
    /// never reach the caller.
    pub async fn relocate_inbound(&self, cargo: &Cargo, lines: &[CargoDevice]) -> u64 {
        let (linked, serials) = inbound_lines(lines);
        if linked.is_empty() && serials.is_empty() {
            return 0;
        }

        let target = match self.inbound_target(cargo).await {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(
                    "Incoming cargo {}: cannot resolve target location: {}",
                    cargo.tracking_number,
                    e
                );
                return 0;
            }
        };

        let device_ids = match self.inbound_device_ids(linked, &serials).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    "Incoming cargo {}: cannot resolve devices: {}",
                    cargo.tracking_number,
                    e
                );
                return 0;
            }
        };

        let note = Some(inbound_note(&cargo.tracking_number));
        let actor = Actor::system();
        let mut moved = 0;

        for device_id in device_ids {
            match self.relocate_one(device_id, &target, note.clone(), &actor).await {
                Ok(true) => moved += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    "Incoming cargo {}: failed to relocate device {}: {}",
                    cargo.tracking_number,
                    device_id,
                    e
                ),
            }
        }

        tracing::info!(
            "Incoming cargo {}: {} device(s) placed at '{}'",
            cargo.tracking_number,
            moved,
            target.name
        );
        moved
    }

    async fn inbound_target(&self, cargo: &Cargo) -> AppResult<Location> {
        match cargo.target_location_id {
            Some(id) => self.repository.locations.get_by_id(id).await,
            None => self.locations.ensure_headquarters().await,
        }
    }

    /// Linked device ids, falling back to serial lookup for unlinked lines
    async fn inbound_device_ids(&self, mut ids: Vec<Uuid>, serials: &[String]) -> AppResult<Vec<Uuid>> {
        if !serials.is_empty() {
            let found = self.repository.devices.find_by_serials(serials).await?;
            ids.extend(found.into_iter().map(|d| d.id));
        }

        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(ids)
    }

    async fn relocate_one(
        &self,
        device_id: Uuid,
        target: &Location,
        note: Option<String>,
        actor: &Actor,
    ) -> AppResult<bool> {
        let mut tx = self.repository.begin().await?;
        let moved = Self::move_device(&mut tx, device_id, target, note, actor).await?;
        tx.commit().await?;
        Ok(moved.is_some())
    }

    /// Update one device and append its ledger entry on the given connection
    async fn move_device(
        conn: &mut PgConnection,
        device_id: Uuid,
        target: &Location,
        note: Option<String>,
        actor: &Actor,
    ) -> AppResult<Option<DeviceMovement>> {
        let Some(before) = DevicesRepository::lock_for_update(conn, device_id).await? else {
            return Ok(None);
        };

        let (location, status) = placement_for(target.kind());

        DevicesRepository::apply_placement(
            conn,
            device_id,
            location.as_str(),
            status.as_str(),
            Some(target.id),
        )
        .await?;

        let movement = MovementsRepository::record(
            conn,
            &NewMovement {
                device_id,
                previous_location: Some(before.current_location),
                new_location: location.as_str().to_string(),
                previous_status: Some(before.current_status),
                new_status: status.as_str().to_string(),
                previous_location_id: before.location_id,
                new_location_id: Some(target.id),
                actor_id: actor.id.clone(),
                actor_name: actor.name.clone(),
                note,
            },
        )
        .await?;

        Ok(Some(movement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_for_location_types() {
        assert_eq!(
            placement_for(Some(LocationType::InstallationTeam)),
            (DeviceLocation::WithInstallationTeam, DeviceStatus::InUse)
        );
        assert_eq!(
            placement_for(Some(LocationType::ServiceCenter)),
            (DeviceLocation::AtServiceCenter, DeviceStatus::InMaintenance)
        );
        assert_eq!(
            placement_for(Some(LocationType::Customer)),
            (DeviceLocation::AtCustomer, DeviceStatus::Available)
        );
        for kind in [
            Some(LocationType::Warehouse),
            Some(LocationType::Headquarters),
            Some(LocationType::Branch),
            Some(LocationType::Other),
            None,
        ] {
            assert_eq!(
                placement_for(kind),
                (DeviceLocation::InWarehouse, DeviceStatus::Available)
            );
        }
    }

    #[test]
    fn test_dispatch_note() {
        assert_eq!(dispatch_note(None, None), None);
        assert_eq!(dispatch_note(Some("  "), Some("")), None);
        assert_eq!(dispatch_note(Some("site A"), None).as_deref(), Some("site A"));
        assert_eq!(dispatch_note(None, Some("Mehmet")).as_deref(), Some("Assigned to Mehmet"));
        assert_eq!(
            dispatch_note(Some("site A"), Some("Mehmet")).as_deref(),
            Some("site A (assigned to Mehmet)")
        );
    }

    #[test]
    fn test_lock_order_sorted_and_distinct() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let c = Uuid::from_u128(3);
        assert_eq!(lock_order(&[c, a, b, a]), vec![a, b, c]);
        assert_eq!(lock_order(&[b, a]), lock_order(&[a, b]));
        assert!(lock_order(&[]).is_empty());
    }

    fn line(device_id: Option<Uuid>, serial: Option<&str>, from_pool: bool) -> CargoDevice {
        CargoDevice {
            id: Uuid::new_v4(),
            cargo_id: Uuid::nil(),
            device_id,
            device_name: None,
            model: None,
            serial_number: serial.map(str::to_string),
            quantity: 1,
            condition: None,
            purpose: None,
            from_equivalent_pool: from_pool,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_inbound_lines_only_pool_devices() {
        let linked = Uuid::new_v4();
        let lines = vec![
            line(Some(linked), Some("SN-1"), true),
            line(None, Some(" SN-2 "), true),
            line(None, Some("   "), true),
            line(Some(Uuid::new_v4()), Some("SN-3"), false),
            line(None, Some("SN-4"), false),
        ];
        let (ids, serials) = inbound_lines(&lines);
        assert_eq!(ids, vec![linked]);
        assert_eq!(serials, vec!["SN-2".to_string()]);
    }

    #[test]
    fn test_inbound_note() {
        assert_eq!(inbound_note("TK-77"), "Incoming cargo TK-77");
    }
}
