//! Repair tickets repository

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::repair::RepairTicket,
    notes::link::{cargo_tag, extract_cargo_link},
};

/// Ticket row to insert, already normalized
#[derive(Debug, Clone)]
pub struct NewRepair {
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub customer_name: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub cargo_id: Option<Uuid>,
}

/// Column changes of a ticket update
#[derive(Debug, Clone, Default)]
pub struct RepairChanges {
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub customer_name: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    /// Outer None leaves the link as is; Some(None) clears it
    pub cargo_id: Option<Option<Uuid>>,
}

#[derive(Clone)]
pub struct RepairsRepository {
    pool: Pool<Postgres>,
}

impl RepairsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get ticket by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<RepairTicket> {
        sqlx::query_as::<_, RepairTicket>("SELECT * FROM repair_tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Repair ticket {} not found", id)))
    }

    /// Every ticket linked to a cargo, through the column or the notes tag
    pub async fn list_linked(&self, cargo_id: Uuid) -> AppResult<Vec<RepairTicket>> {
        let rows = sqlx::query_as::<_, RepairTicket>(
            r#"
            SELECT * FROM repair_tickets
            WHERE cargo_id = $1
               OR (cargo_id IS NULL AND POSITION($2 IN COALESCE(notes, '')) > 0)
            ORDER BY created_at
            "#,
        )
        .bind(cargo_id)
        .bind(cargo_tag(cargo_id))
        .fetch_all(&self.pool)
        .await?;

        // the tag may also appear inside a metadata line, which is not a link
        Ok(rows
            .into_iter()
            .filter(|t| {
                t.cargo_id == Some(cargo_id)
                    || t.notes.as_deref().and_then(extract_cargo_link) == Some(cargo_id)
            })
            .collect())
    }

    /// Insert a ticket
    pub async fn insert(conn: &mut PgConnection, data: &NewRepair) -> AppResult<RepairTicket> {
        let row = sqlx::query_as::<_, RepairTicket>(
            r#"
            INSERT INTO repair_tickets (
                id, device_name, model, serial_number, customer_name, status, notes, cargo_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.device_name)
        .bind(&data.model)
        .bind(&data.serial_number)
        .bind(&data.customer_name)
        .bind(&data.status)
        .bind(&data.notes)
        .bind(data.cargo_id)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Apply column changes to a ticket
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: &RepairChanges,
    ) -> AppResult<RepairTicket> {
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

        add_field!(data.device_name, "device_name");
        add_field!(data.model, "model");
        add_field!(data.serial_number, "serial_number");
        add_field!(data.customer_name, "customer_name");
        add_field!(data.status, "status");
        add_field!(data.notes, "notes");
        add_field!(data.cargo_id, "cargo_id");

        let sql = format!(
            "UPDATE repair_tickets SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, RepairTicket>(&sql);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.device_name);
        bind_field!(data.model);
        bind_field!(data.serial_number);
        bind_field!(data.customer_name);
        bind_field!(data.status);
        bind_field!(data.notes);
        bind_field!(data.cargo_id);

        builder
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Repair ticket {} not found", id)))
    }
}
