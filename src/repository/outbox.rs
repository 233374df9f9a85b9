//! Pending cargo reconciliations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, FromRow)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub cargo_id: Uuid,
    pub source_ticket_id: Option<Uuid>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct OutboxRepository {
    pool: Pool<Postgres>,
}

impl OutboxRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Queue a reconciliation in the same transaction as the ticket write
    pub async fn enqueue(
        conn: &mut PgConnection,
        cargo_id: Uuid,
        source_ticket_id: Option<Uuid>,
    ) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO cargo_reconcile_outbox (id, cargo_id, source_ticket_id) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(cargo_id)
        .bind(source_ticket_id)
        .execute(conn)
        .await?;
        Ok(id)
    }

    /// Unprocessed entries, oldest first
    pub async fn pending(&self, limit: i64) -> AppResult<Vec<OutboxEntry>> {
        let rows = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT * FROM cargo_reconcile_outbox
            WHERE processed_at IS NULL
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark every pending entry of a cargo as done
    pub async fn mark_processed(&self, cargo_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cargo_reconcile_outbox
            SET processed_at = NOW(), attempts = attempts + 1, last_error = NULL
            WHERE cargo_id = $1 AND processed_at IS NULL
            "#,
        )
        .bind(cargo_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Record a failed attempt; the entry stays pending
    pub async fn mark_failed(&self, id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE cargo_reconcile_outbox SET attempts = attempts + 1, last_error = $1 WHERE id = $2",
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
