//! Business logic services

pub mod cargo;
pub mod gating;
pub mod inventory;
pub mod locations;
pub mod reconciliation;
pub mod repairs;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub locations: locations::LocationsService,
    pub inventory: inventory::InventoryService,
    pub cargo: cargo::CargoService,
    pub repairs: repairs::RepairsService,
    pub reconciler: reconciliation::Reconciler,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let locations =
            locations::LocationsService::new(repository.clone(), config.inventory.clone());
        let inventory = inventory::InventoryService::new(repository.clone(), locations.clone());
        let gate = gating::LocationGate::new(
            repository.clone(),
            config.inventory.headquarters_markers.clone(),
        );
        let reconciler = reconciliation::Reconciler::new(repository.clone());

        Self {
            cargo: cargo::CargoService::new(repository.clone(), gate, inventory.clone()),
            repairs: repairs::RepairsService::new(repository.clone(), reconciler.clone()),
            locations,
            inventory,
            reconciler,
            repository,
        }
    }

    /// Database readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
