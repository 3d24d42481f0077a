//! Country persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `countries` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::state::CountryRecord;

/// Insert a country row. Existing rows win (seed writes are idempotent).
pub async fn insert(pool: &PgPool, record: &CountryRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO countries (id, name, created_at, updated_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all countries for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<CountryRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CountryRow>(
        "SELECT id, name, created_at, updated_at FROM countries ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CountryRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct CountryRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CountryRow {
    fn into_record(self) -> CountryRecord {
        CountryRecord {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
