//! Headquarters gate for cargo entering the device-repair workflow

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        cargo::{CargoDevice, CargoDeviceInput},
        device::EquivalentDevice,
        enums::DeviceLocation,
        location::Location,
    },
    repository::Repository,
};

/// What the gate needs to know about a device
#[derive(Debug, Clone)]
pub struct GateDevice {
    pub serial_number: String,
    pub current_location: String,
    pub location_name: Option<String>,
}

impl From<EquivalentDevice> for GateDevice {
    fn from(device: EquivalentDevice) -> Self {
        Self {
            serial_number: device.serial_number,
            current_location: device.current_location,
            location_name: device.location_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// No line resolves to an inventory device; nothing can be verified
    Unresolved,
    AtHeadquarters,
    /// Serials of the resolved devices, none of them at headquarters
    Blocked(Vec<String>),
}

/// Decide whether a cargo's devices are at headquarters.
///
/// A device counts when its location name carries a headquarters marker or
/// when it is recorded as in the warehouse.
pub fn evaluate_gate(devices: &[GateDevice], markers: &[String]) -> GateVerdict {
    if devices.is_empty() {
        return GateVerdict::Unresolved;
    }

    let at_headquarters = devices.iter().any(|device| {
        let by_name = device
            .location_name
            .as_deref()
            .map(|name| Location::name_marks_headquarters(name, markers))
            .unwrap_or(false);
        by_name
            || device.current_location.trim().eq_ignore_ascii_case(DeviceLocation::InWarehouse.as_str())
    });

    if at_headquarters {
        GateVerdict::AtHeadquarters
    } else {
        GateVerdict::Blocked(devices.iter().map(|d| d.serial_number.clone()).collect())
    }
}

/// Device reference of a cargo line: the captured link, else its serial
#[derive(Debug, Clone)]
pub struct LineRef {
    pub device_id: Option<Uuid>,
    pub serial_number: Option<String>,
}

impl From<&CargoDevice> for LineRef {
    fn from(line: &CargoDevice) -> Self {
        Self {
            device_id: line.device_id,
            serial_number: line.serial_number.clone(),
        }
    }
}

impl From<&CargoDeviceInput> for LineRef {
    fn from(line: &CargoDeviceInput) -> Self {
        Self {
            device_id: None,
            serial_number: line.trimmed_serial().map(str::to_string),
        }
    }
}

#[derive(Clone)]
pub struct LocationGate {
    repository: Repository,
    markers: Vec<String>,
}

impl LocationGate {
    pub fn new(repository: Repository, markers: Vec<String>) -> Self {
        Self { repository, markers }
    }

    /// Inventory devices behind a cargo's lines: linked ids first, serials for the rest
    pub async fn resolve_devices(&self, lines: &[LineRef]) -> AppResult<Vec<GateDevice>> {
        let linked: Vec<Uuid> = lines.iter().filter_map(|line| line.device_id).collect();
        let serials: Vec<String> = lines
            .iter()
            .filter(|line| line.device_id.is_none())
            .filter_map(|line| line.serial_number.as_deref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut devices = self.repository.devices.find_by_ids(&linked).await?;
        devices.extend(self.repository.devices.find_by_serials(&serials).await?);

        let mut seen = HashSet::new();
        devices.retain(|d| seen.insert(d.id));
        Ok(devices.into_iter().map(GateDevice::from).collect())
    }

    /// Gate a cargo on its stored device lines
    pub async fn check_cargo(&self, cargo_id: Uuid) -> AppResult<()> {
        let lines = self.repository.cargo.devices(cargo_id).await?;
        let refs: Vec<LineRef> = lines.iter().map(LineRef::from).collect();
        self.check(cargo_id, &refs).await
    }

    /// Fail with a precondition error unless the cargo may enter device repair
    pub async fn check(&self, cargo_id: Uuid, lines: &[LineRef]) -> AppResult<()> {
        let devices = self.resolve_devices(lines).await?;
        match evaluate_gate(&devices, &self.markers) {
            GateVerdict::Unresolved => {
                tracing::debug!(
                    "Cargo {}: no inventory device resolved, device-repair gate passes",
                    cargo_id
                );
                Ok(())
            }
            GateVerdict::AtHeadquarters => Ok(()),
            GateVerdict::Blocked(serials) => {
                tracing::info!(
                    "Cargo {}: device-repair rejected, devices not at headquarters: {:?}",
                    cargo_id,
                    serials
                );
                Err(AppError::Precondition(format!(
                    "Device must be at the headquarters warehouse before the cargo can enter device repair (devices: {})",
                    serials.join(", ")
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["merkez".to_string(), "headquarter".to_string()]
    }

    fn device(serial: &str, location: &str, name: Option<&str>) -> GateDevice {
        GateDevice {
            serial_number: serial.to_string(),
            current_location: location.to_string(),
            location_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_no_devices_pass_by_default() {
        let verdict = evaluate_gate(&[], &markers());
        assert_eq!(verdict, GateVerdict::Unresolved);
    }

    #[test]
    fn test_device_at_customer_is_blocked() {
        let verdict = evaluate_gate(&[device("SN1", "AT_CUSTOMER", Some("ACME Ltd."))], &markers());
        assert_eq!(verdict, GateVerdict::Blocked(vec!["SN1".to_string()]));
    }

    #[test]
    fn test_device_in_warehouse_at_merkez_passes() {
        let verdict = evaluate_gate(&[device("SN1", "IN_WAREHOUSE", Some("Merkez Depo"))], &markers());
        assert_eq!(verdict, GateVerdict::AtHeadquarters);
    }

    #[test]
    fn test_either_condition_is_enough() {
        // warehouse flag without a headquarters name
        assert_eq!(
            evaluate_gate(&[device("A", "in_warehouse", Some("Ankara Şube"))], &markers()),
            GateVerdict::AtHeadquarters
        );
        // headquarters name while the enum lags behind
        assert_eq!(
            evaluate_gate(&[device("B", "IN_TRANSIT", Some("İzmir Merkez"))], &markers()),
            GateVerdict::AtHeadquarters
        );
    }

    #[test]
    fn test_any_device_at_headquarters_passes() {
        let devices = [
            device("A", "AT_CUSTOMER", None),
            device("B", "IN_WAREHOUSE", None),
        ];
        assert_eq!(evaluate_gate(&devices, &markers()), GateVerdict::AtHeadquarters);
    }
}
