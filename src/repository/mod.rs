//! Repository layer for database operations

pub mod cargo;
pub mod devices;
pub mod locations;
pub mod movements;
pub mod outbox;
pub mod repair_metadata;
pub mod repairs;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Optional parts of the schema, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCapabilities {
    /// `cargo.record_status` exists
    pub record_status_column: bool,
}

impl Default for SchemaCapabilities {
    fn default() -> Self {
        Self {
            record_status_column: true,
        }
    }
}

impl SchemaCapabilities {
    /// Inspect the live schema. An explicit override skips detection.
    pub async fn detect(pool: &Pool<Postgres>, override_record_status: Option<bool>) -> AppResult<Self> {
        let record_status_column = match override_record_status {
            Some(flag) => flag,
            None => {
                sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS(
                        SELECT 1 FROM information_schema.columns
                        WHERE table_schema = current_schema()
                          AND table_name = 'cargo'
                          AND column_name = 'record_status'
                    )
                    "#,
                )
                .fetch_one(pool)
                .await?
            }
        };

        Ok(Self {
            record_status_column,
        })
    }
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub capabilities: SchemaCapabilities,
    pub locations: locations::LocationsRepository,
    pub devices: devices::DevicesRepository,
    pub movements: movements::MovementsRepository,
    pub cargo: cargo::CargoRepository,
    pub repair_metadata: repair_metadata::RepairMetadataRepository,
    pub repairs: repairs::RepairsRepository,
    pub outbox: outbox::OutboxRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>, capabilities: SchemaCapabilities) -> Self {
        Self {
            locations: locations::LocationsRepository::new(pool.clone()),
            devices: devices::DevicesRepository::new(pool.clone()),
            movements: movements::MovementsRepository::new(pool.clone()),
            cargo: cargo::CargoRepository::new(pool.clone(), capabilities),
            repair_metadata: repair_metadata::RepairMetadataRepository::new(pool.clone()),
            repairs: repairs::RepairsRepository::new(pool.clone()),
            outbox: outbox::OutboxRepository::new(pool.clone()),
            capabilities,
            pool,
        }
    }

    /// Start an all-or-nothing unit of work
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Cheap connectivity probe for readiness checks
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
