//! City persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `cities` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::state::CityRecord;

/// Insert a city row. Existing rows win (seed writes are idempotent).
pub async fn insert(pool: &PgPool, record: &CityRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cities (id, name, country_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(record.country_id)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all cities for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<CityRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CityRow>(
        "SELECT id, name, country_id, created_at, updated_at FROM cities ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CityRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct CityRow {
    id: i64,
    name: String,
    country_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CityRow {
    fn into_record(self) -> CityRecord {
        CityRecord {
            id: self.id,
            name: self.name,
            country_id: self.country_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
