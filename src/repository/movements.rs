//! Movement ledger: insert and read only

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::device::{DeviceMovement, NewMovement},
};

#[derive(Clone)]
pub struct MovementsRepository {
    pool: Pool<Postgres>,
}

impl MovementsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Ledger of a device, newest first
    pub async fn list_for_device(&self, device_id: Uuid) -> AppResult<Vec<DeviceMovement>> {
        let rows = sqlx::query_as::<_, DeviceMovement>(
            "SELECT * FROM device_movements WHERE device_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Append one ledger entry inside the transaction that moved the device
    pub async fn record(conn: &mut PgConnection, movement: &NewMovement) -> AppResult<DeviceMovement> {
        let row = sqlx::query_as::<_, DeviceMovement>(
            r#"
            INSERT INTO device_movements (
                id, device_id, previous_location, new_location, previous_status, new_status,
                previous_location_id, new_location_id, actor_id, actor_name, note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(movement.device_id)
        .bind(&movement.previous_location)
        .bind(&movement.new_location)
        .bind(&movement.previous_status)
        .bind(&movement.new_status)
        .bind(movement.previous_location_id)
        .bind(movement.new_location_id)
        .bind(&movement.actor_id)
        .bind(&movement.actor_name)
        .bind(&movement.note)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }
}
