//! Data models for Cargoline

pub mod actor;
pub mod cargo;
pub mod device;
pub mod enums;
pub mod location;
pub mod repair;
pub mod repair_metadata;

// Re-export commonly used types
pub use actor::ActorClaims;
pub use cargo::{Cargo, CargoDetails, CargoDevice};
pub use device::{Actor, DeviceMovement, EquivalentDevice};
pub use enums::{LocationType, RecordStatus};
pub use location::Location;
pub use repair::{RepairTicket, RepairTicketDetails};
pub use repair_metadata::{HistoryEntry, RepairMetadata};
