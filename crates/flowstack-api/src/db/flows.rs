//! Flow persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `flows` table. The
//! `json_schema` document is stored as JSONB, exactly as validated.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::{FlowName, FlowRecord};

/// Insert a new flow record.
pub async fn insert(pool: &PgPool, record: &FlowRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO flows (id, name, json_schema, city_id, country_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id)
    .bind(record.name.as_str())
    .bind(&record.json_schema)
    .bind(record.city_id)
    .bind(record.country_id)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace a flow's definition.
pub async fn update(pool: &PgPool, record: &FlowRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE flows SET name = $1, json_schema = $2, city_id = $3, country_id = $4,
         updated_at = $5 WHERE id = $6",
    )
    .bind(record.name.as_str())
    .bind(&record.json_schema)
    .bind(record.city_id)
    .bind(record.country_id)
    .bind(record.updated_at)
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a flow. Dependent solution rows go with it (FK cascade).
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM flows WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all flows for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<FlowRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FlowRow>(
        "SELECT id, name, json_schema, city_id, country_id, created_at, updated_at
         FROM flows ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        // into_record() logs any skipped row.
        if let Some(record) = row.into_record() {
            records.push(record);
        }
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct FlowRow {
    id: Uuid,
    name: String,
    json_schema: serde_json::Value,
    city_id: Option<i64>,
    country_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FlowRow {
    /// Convert a database row into a record, re-validating the name.
    ///
    /// A row whose name no longer satisfies the naming rules (edited out
    /// of band) is skipped rather than poisoning startup.
    fn into_record(self) -> Option<FlowRecord> {
        let name = match FlowName::new(&self.name) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(flow_id = %self.id, error = %e, "skipping flow row with invalid name");
                return None;
            }
        };
        Some(FlowRecord {
            id: self.id,
            name,
            json_schema: self.json_schema,
            city_id: self.city_id,
            country_id: self.country_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
