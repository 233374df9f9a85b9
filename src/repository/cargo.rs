//! Cargo records and their device lines

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::SchemaCapabilities;
use crate::{
    error::{AppError, AppResult},
    models::{
        cargo::{Cargo, CargoDevice, CargoQuery},
        enums::{normalize_cargo_status, normalize_cargo_type, RecordStatus},
    },
    notes::METADATA_TAG,
};

/// Cargo row to insert, already normalized
#[derive(Debug, Clone)]
pub struct NewCargo {
    pub tracking_number: String,
    pub cargo_type: String,
    pub status: String,
    pub record_status: String,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub target_location_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Column changes of a cargo update, already normalized
#[derive(Debug, Clone, Default)]
pub struct CargoChanges {
    pub tracking_number: Option<String>,
    pub cargo_type: Option<String>,
    pub status: Option<String>,
    pub record_status: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub target_location_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Device line to insert
#[derive(Debug, Clone)]
pub struct NewCargoDevice {
    pub device_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i32,
    pub condition: Option<String>,
    pub purpose: Option<String>,
    pub from_equivalent_pool: bool,
}

/// Active metadata still embedded in the notes of a cargo without structured state
const LEGACY_ACTIVE: &str = r#"(rs.cargo_id IS NULL AND COALESCE(cargo.notes, '') ~ '(^|\n)<<CARGOLINE_META>>\{[^\n]*"active"\s*:\s*true')"#;

#[derive(Clone)]
pub struct CargoRepository {
    pool: Pool<Postgres>,
    capabilities: SchemaCapabilities,
}

impl CargoRepository {
    pub fn new(pool: Pool<Postgres>, capabilities: SchemaCapabilities) -> Self {
        Self { pool, capabilities }
    }

    fn columns(&self) -> String {
        let record_status = if self.capabilities.record_status_column {
            "cargo.record_status"
        } else {
            "NULL::text AS record_status"
        };
        format!(
            "cargo.id, cargo.tracking_number, cargo.cargo_type, cargo.status, {}, \
             cargo.sender, cargo.receiver, cargo.target_location_id, cargo.notes, \
             cargo.created_at, cargo.updated_at",
            record_status
        )
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get cargo by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Cargo> {
        let sql = format!("SELECT {} FROM cargo WHERE cargo.id = $1", self.columns());
        sqlx::query_as::<_, Cargo>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cargo {} not found", id)))
    }

    /// Get cargo by ID and lock it for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<Cargo> {
        let sql = format!(
            "SELECT {} FROM cargo WHERE cargo.id = $1 FOR UPDATE",
            self.columns()
        );
        sqlx::query_as::<_, Cargo>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cargo {} not found", id)))
    }

    /// Check whether a tracking number is taken by another cargo
    pub async fn tracking_number_exists(
        &self,
        tracking_number: &str,
        exclude_id: Option<Uuid>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cargo WHERE tracking_number = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(tracking_number)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Device lines of a cargo
    pub async fn devices(&self, cargo_id: Uuid) -> AppResult<Vec<CargoDevice>> {
        let rows = sqlx::query_as::<_, CargoDevice>(
            "SELECT * FROM cargo_devices WHERE cargo_id = $1 ORDER BY created_at, id",
        )
        .bind(cargo_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Device lines of several cargo records
    pub async fn devices_for(&self, cargo_ids: &[Uuid]) -> AppResult<Vec<CargoDevice>> {
        if cargo_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, CargoDevice>(
            "SELECT * FROM cargo_devices WHERE cargo_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(cargo_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Cargo whose notes still carry a metadata line but have no structured state
    pub async fn with_legacy_metadata(&self) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT cargo.id FROM cargo
            LEFT JOIN cargo_repair_states rs ON rs.cargo_id = cargo.id
            WHERE rs.cargo_id IS NULL AND POSITION($1 IN COALESCE(cargo.notes, '')) > 0
            ORDER BY cargo.created_at
            "#,
        )
        .bind(METADATA_TAG)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// List cargo with filters and pagination.
    ///
    /// The record status filter applies to the derived value: an active
    /// repair state means `device_repair` whatever the column holds.
    pub async fn list(&self, query: &CargoQuery) -> AppResult<(Vec<Cargo>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 200);
        let offset = (page - 1) * per_page;

        let mut conditions = vec!["1=1".to_string()];
        let mut idx = 1;

        let status = query.status.as_deref().map(normalize_cargo_status);
        let cargo_type = query.cargo_type.as_deref().map(normalize_cargo_type);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        if status.is_some() {
            conditions.push(format!("cargo.status = ${}", idx));
            idx += 1;
        }
        if cargo_type.is_some() {
            conditions.push(format!("cargo.cargo_type = ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(cargo.tracking_number ILIKE ${0} OR cargo.sender ILIKE ${0} OR cargo.receiver ILIKE ${0})",
                idx
            ));
        }

        if let Some(ref raw) = query.record_status {
            let wanted = RecordStatus::parse(raw).ok_or_else(|| {
                AppError::Validation(format!("Unknown record status filter: {}", raw))
            })?;
            conditions.push(self.record_status_condition(wanted));
        }

        let where_clause = conditions.join(" AND ");
        let order_by = match query.sort.as_deref() {
            Some("tracking_number") => "cargo.tracking_number ASC",
            Some("record_status") if self.capabilities.record_status_column => {
                "cargo.record_status ASC, cargo.created_at DESC"
            }
            _ => "cargo.created_at DESC",
        };

        let from = "FROM cargo LEFT JOIN cargo_repair_states rs ON rs.cargo_id = cargo.id";

        let count_sql = format!("SELECT COUNT(*) {} WHERE {}", from, where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(ref v) = status { count_builder = count_builder.bind(v); }
        if let Some(ref v) = cargo_type { count_builder = count_builder.bind(v); }
        if let Some(ref v) = search { count_builder = count_builder.bind(v); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT {} {} WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            self.columns(),
            from,
            where_clause,
            order_by,
            per_page,
            offset
        );
        let mut builder = sqlx::query_as::<_, Cargo>(&select_sql);
        if let Some(ref v) = status { builder = builder.bind(v); }
        if let Some(ref v) = cargo_type { builder = builder.bind(v); }
        if let Some(ref v) = search { builder = builder.bind(v); }
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    fn record_status_condition(&self, wanted: RecordStatus) -> String {
        let active = format!("(COALESCE(rs.active, FALSE) OR {})", LEGACY_ACTIVE);
        let has_column = self.capabilities.record_status_column;
        match (wanted, has_column) {
            (RecordStatus::DeviceRepair, _) => active,
            (RecordStatus::Open, true) => format!(
                "NOT {} AND UPPER(COALESCE(cargo.record_status, 'OPEN')) NOT IN ('ON_HOLD', 'CLOSED')",
                active
            ),
            (RecordStatus::OnHold, true) => {
                format!("NOT {} AND UPPER(cargo.record_status) = 'ON_HOLD'", active)
            }
            (RecordStatus::Closed, true) => {
                format!("NOT {} AND UPPER(cargo.record_status) = 'CLOSED'", active)
            }
            (RecordStatus::Open, false) => format!("NOT {}", active),
            (_, false) => "FALSE".to_string(),
        }
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Insert a cargo row
    pub async fn insert(&self, conn: &mut PgConnection, data: &NewCargo) -> AppResult<Cargo> {
        let sql = if self.capabilities.record_status_column {
            format!(
                r#"
                INSERT INTO cargo (id, tracking_number, cargo_type, status, sender, receiver,
                                   target_location_id, notes, record_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {}
                "#,
                self.columns()
            )
        } else {
            format!(
                r#"
                INSERT INTO cargo (id, tracking_number, cargo_type, status, sender, receiver,
                                   target_location_id, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {}
                "#,
                self.columns()
            )
        };

        let mut builder = sqlx::query_as::<_, Cargo>(&sql)
            .bind(Uuid::new_v4())
            .bind(&data.tracking_number)
            .bind(&data.cargo_type)
            .bind(&data.status)
            .bind(&data.sender)
            .bind(&data.receiver)
            .bind(data.target_location_id)
            .bind(&data.notes);
        if self.capabilities.record_status_column {
            builder = builder.bind(&data.record_status);
        }

        builder.fetch_one(conn).await.map_err(|e| {
            AppError::conflict_on_unique(
                e,
                format!("Tracking number {} already exists", data.tracking_number),
            )
        })
    }

    /// Apply column changes; untouched columns keep their value
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        data: &CargoChanges,
    ) -> AppResult<Cargo> {
        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        let record_status = data
            .record_status
            .clone()
            .filter(|_| self.capabilities.record_status_column);

        add_field!(data.tracking_number, "tracking_number");
        add_field!(data.cargo_type, "cargo_type");
        add_field!(data.status, "status");
        add_field!(record_status, "record_status");
        add_field!(data.sender, "sender");
        add_field!(data.receiver, "receiver");
        add_field!(data.target_location_id, "target_location_id");
        add_field!(data.notes, "notes");

        let sql = format!(
            "UPDATE cargo SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            idx,
            self.columns()
        );

        let mut builder = sqlx::query_as::<_, Cargo>(&sql);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.tracking_number);
        bind_field!(data.cargo_type);
        bind_field!(data.status);
        bind_field!(record_status);
        bind_field!(data.sender);
        bind_field!(data.receiver);
        bind_field!(data.target_location_id);
        bind_field!(data.notes);

        let tracking_number = data.tracking_number.clone().unwrap_or_default();
        builder
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| {
                AppError::conflict_on_unique(
                    e,
                    format!("Tracking number {} already exists", tracking_number),
                )
            })?
            .ok_or_else(|| AppError::NotFound(format!("Cargo {} not found", id)))
    }

    /// Write the stored record status. No-op when the column does not exist.
    pub async fn set_record_status(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        stored: &str,
    ) -> AppResult<bool> {
        if !self.capabilities.record_status_column {
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE cargo SET record_status = $1, updated_at = NOW() WHERE id = $2 AND record_status IS DISTINCT FROM $1",
        )
        .bind(stored)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert device lines for a cargo
    pub async fn insert_devices(
        conn: &mut PgConnection,
        cargo_id: Uuid,
        lines: &[NewCargoDevice],
    ) -> AppResult<Vec<CargoDevice>> {
        let mut created = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query_as::<_, CargoDevice>(
                r#"
                INSERT INTO cargo_devices (
                    id, cargo_id, device_id, device_name, model, serial_number,
                    quantity, condition, purpose, from_equivalent_pool
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(cargo_id)
            .bind(line.device_id)
            .bind(&line.device_name)
            .bind(&line.model)
            .bind(&line.serial_number)
            .bind(line.quantity)
            .bind(&line.condition)
            .bind(&line.purpose)
            .bind(line.from_equivalent_pool)
            .fetch_one(&mut *conn)
            .await?;
            created.push(row);
        }
        Ok(created)
    }

    /// Replace every device line of a cargo
    pub async fn replace_devices(
        conn: &mut PgConnection,
        cargo_id: Uuid,
        lines: &[NewCargoDevice],
    ) -> AppResult<Vec<CargoDevice>> {
        sqlx::query("DELETE FROM cargo_devices WHERE cargo_id = $1")
            .bind(cargo_id)
            .execute(&mut *conn)
            .await?;
        Self::insert_devices(conn, cargo_id, lines).await
    }
}
