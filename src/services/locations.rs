//! Location registry service

use crate::{
    config::InventoryConfig,
    error::AppResult,
    models::{enums::LocationType, location::Location},
    repository::{locations::LocationsRepository, Repository},
};

#[derive(Clone)]
pub struct LocationsService {
    repository: Repository,
    config: InventoryConfig,
}

impl LocationsService {
    pub fn new(repository: Repository, config: InventoryConfig) -> Self {
        Self { repository, config }
    }

    pub async fn list(&self, active_only: bool) -> AppResult<Vec<Location>> {
        self.repository.locations.list(active_only).await
    }

    /// Resolve the headquarters: explicit type first, then the name heuristic
    pub async fn resolve_headquarters(&self) -> AppResult<Option<Location>> {
        if let Some(location) = self.repository.locations.find_typed_headquarters().await? {
            return Ok(Some(location));
        }
        self.repository
            .locations
            .find_by_name_markers(&self.config.headquarters_markers)
            .await
    }

    /// Resolve the headquarters, creating the default one when none exists
    pub async fn ensure_headquarters(&self) -> AppResult<Location> {
        if let Some(location) = self.resolve_headquarters().await? {
            return Ok(location);
        }

        let mut tx = self.repository.begin().await?;
        let location = LocationsRepository::create(
            &mut tx,
            &self.config.headquarters_name,
            LocationType::Headquarters,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Created default headquarters location '{}' ({})",
            location.name,
            location.id
        );
        Ok(location)
    }
}
