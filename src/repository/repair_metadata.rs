//! Structured repair metadata: current state plus append-only history

use sqlx::{types::Json, PgConnection, Pool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::repair_metadata::{HistoryEntry, HistoryRow, RepairMetadata, RepairStateRow},
};

#[derive(Clone)]
pub struct RepairMetadataRepository {
    pool: Pool<Postgres>,
}

impl RepairMetadataRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Full metadata of a cargo, or None when it never entered the workflow
    pub async fn load(&self, cargo_id: Uuid) -> AppResult<Option<RepairMetadata>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_in(&mut conn, cargo_id).await
    }

    /// Same as [`load`](Self::load) on an open connection or transaction
    pub async fn load_in(conn: &mut PgConnection, cargo_id: Uuid) -> AppResult<Option<RepairMetadata>> {
        let state = sqlx::query_as::<_, RepairStateRow>(
            "SELECT * FROM cargo_repair_states WHERE cargo_id = $1",
        )
        .bind(cargo_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(state) = state else {
            return Ok(None);
        };

        let history = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM cargo_repair_history WHERE cargo_id = $1 ORDER BY created_at, id",
        )
        .bind(cargo_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(state.into_metadata(
            history.into_iter().map(HistoryEntry::from).collect(),
        )))
    }

    /// Metadata for several cargo records at once
    pub async fn load_many(&self, cargo_ids: &[Uuid]) -> AppResult<HashMap<Uuid, RepairMetadata>> {
        if cargo_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let states = sqlx::query_as::<_, RepairStateRow>(
            "SELECT * FROM cargo_repair_states WHERE cargo_id = ANY($1)",
        )
        .bind(cargo_ids)
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM cargo_repair_history WHERE cargo_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(cargo_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut history: HashMap<Uuid, Vec<HistoryEntry>> = HashMap::new();
        for row in rows {
            history.entry(row.cargo_id).or_default().push(row.into());
        }

        Ok(states
            .into_iter()
            .map(|state| {
                let cargo_id = state.cargo_id;
                let entries = history.remove(&cargo_id).unwrap_or_default();
                (cargo_id, state.into_metadata(entries))
            })
            .collect())
    }

    /// Insert or overwrite the state part of the metadata. History is untouched.
    pub async fn save_state(
        conn: &mut PgConnection,
        cargo_id: Uuid,
        metadata: &RepairMetadata,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cargo_repair_states (
                cargo_id, active, status, technician, operations, spare_parts, costs,
                approval_state, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (cargo_id) DO UPDATE SET
                active = EXCLUDED.active,
                status = EXCLUDED.status,
                technician = EXCLUDED.technician,
                operations = EXCLUDED.operations,
                spare_parts = EXCLUDED.spare_parts,
                costs = EXCLUDED.costs,
                approval_state = EXCLUDED.approval_state,
                updated_at = NOW()
            "#,
        )
        .bind(cargo_id)
        .bind(metadata.active)
        .bind(metadata.status.as_str())
        .bind(&metadata.technician)
        .bind(Json(&metadata.operations))
        .bind(Json(&metadata.spare_parts))
        .bind(Json(&metadata.costs))
        .bind(metadata.approval_state.as_str())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Append one history entry
    pub async fn append_history(
        conn: &mut PgConnection,
        cargo_id: Uuid,
        entry: &HistoryEntry,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cargo_repair_history (id, cargo_id, action, technician, operations, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cargo_id)
        .bind(&entry.action)
        .bind(&entry.technician)
        .bind(Json(&entry.operations))
        .bind(&entry.note)
        .bind(entry.timestamp)
        .execute(conn)
        .await?;
        Ok(())
    }
}
