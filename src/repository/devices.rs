//! Equivalent device store

use sqlx::{FromRow, PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        device::{DeviceQuery, EquivalentDevice},
        enums::{normalize_device_location, normalize_device_status},
    },
};

const DEVICE_SELECT: &str = r#"
    SELECT d.id, d.name, d.model, d.serial_number, d.current_location, d.current_status,
           d.location_id, l.name AS location_name, d.notes, d.created_at, d.updated_at
    FROM equivalent_devices d
    LEFT JOIN locations l ON l.id = d.location_id
"#;

/// Location/status state of a device read under a row lock
#[derive(Debug, Clone, FromRow)]
pub struct DeviceSnapshot {
    pub id: Uuid,
    pub current_location: String,
    pub current_status: String,
    pub location_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct DevicesRepository {
    pool: Pool<Postgres>,
}

impl DevicesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List devices with optional filters
    pub async fn list(&self, query: &DeviceQuery) -> AppResult<Vec<EquivalentDevice>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        let location = query.location.as_deref().map(normalize_device_location);
        let status = query.status.as_deref().map(normalize_device_status);

        if location.is_some() {
            conditions.push(format!("d.current_location = ${}", idx));
            idx += 1;
        }
        if status.is_some() {
            conditions.push(format!("d.current_status = ${}", idx));
            idx += 1;
        }
        if query.location_id.is_some() {
            conditions.push(format!("d.location_id = ${}", idx));
            idx += 1;
        }
        if query.serial_number.is_some() {
            conditions.push(format!("d.serial_number = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!("{} {} ORDER BY d.name, d.serial_number", DEVICE_SELECT, where_clause);
        let mut builder = sqlx::query_as::<_, EquivalentDevice>(&sql);
        if let Some(ref v) = location { builder = builder.bind(v); }
        if let Some(ref v) = status { builder = builder.bind(v); }
        if let Some(v) = query.location_id { builder = builder.bind(v); }
        if let Some(ref v) = query.serial_number { builder = builder.bind(v.trim()); }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    /// Get device by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<EquivalentDevice> {
        let sql = format!("{} WHERE d.id = $1", DEVICE_SELECT);
        sqlx::query_as::<_, EquivalentDevice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Device {} not found", id)))
    }

    /// Devices whose serial number is in `serials`
    pub async fn find_by_serials(&self, serials: &[String]) -> AppResult<Vec<EquivalentDevice>> {
        if serials.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{} WHERE d.serial_number = ANY($1)", DEVICE_SELECT);
        Ok(sqlx::query_as::<_, EquivalentDevice>(&sql)
            .bind(serials)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Devices whose id is in `ids`
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<EquivalentDevice>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{} WHERE d.id = ANY($1)", DEVICE_SELECT);
        Ok(sqlx::query_as::<_, EquivalentDevice>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Resolve serial numbers to device ids inside an open transaction
    pub async fn ids_by_serials(
        conn: &mut PgConnection,
        serials: &[String],
    ) -> AppResult<Vec<(Uuid, String)>> {
        if serials.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, serial_number FROM equivalent_devices WHERE serial_number = ANY($1)",
        )
        .bind(serials)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    /// Read a device's state and lock its row until the transaction ends
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<DeviceSnapshot>> {
        let row = sqlx::query_as::<_, DeviceSnapshot>(
            r#"
            SELECT id, current_location, current_status, location_id
            FROM equivalent_devices
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }

    /// Write a device's new placement. Callers record the ledger entry.
    pub async fn apply_placement(
        conn: &mut PgConnection,
        id: Uuid,
        location: &str,
        status: &str,
        location_id: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE equivalent_devices
            SET current_location = $1, current_status = $2, location_id = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(location)
        .bind(status)
        .bind(location_id)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
