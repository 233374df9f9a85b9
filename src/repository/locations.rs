//! Location registry queries

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{enums::LocationType, location::Location},
};

#[derive(Clone)]
pub struct LocationsRepository {
    pool: Pool<Postgres>,
}

impl LocationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List locations, optionally only active ones
    pub async fn list(&self, active_only: bool) -> AppResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE ($1 = FALSE OR is_active) ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get location by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Location> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", id)))
    }

    /// Oldest active location explicitly typed as headquarters
    pub async fn find_typed_headquarters(&self) -> AppResult<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE is_active AND UPPER(location_type) = $1
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(LocationType::Headquarters.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Oldest active location whose name contains one of `markers`
    pub async fn find_by_name_markers(&self, markers: &[String]) -> AppResult<Option<Location>> {
        let patterns: Vec<String> = markers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| format!("%{}%", m.to_lowercase()))
            .collect();
        if patterns.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE is_active AND LOWER(name) LIKE ANY($1)
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(patterns)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create a location inside an open transaction
    pub async fn create(
        conn: &mut PgConnection,
        name: &str,
        location_type: LocationType,
    ) -> AppResult<Location> {
        let row = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (id, name, location_type, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(location_type.as_str())
        .fetch_one(conn)
        .await?;
        Ok(row)
    }
}
