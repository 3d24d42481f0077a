//! Flow solution persistence operations.
//!
//! A solution is stored flattened across four tables (`flow_solutions`,
//! `section_solutions`, `form_solutions`, `field_solutions`) and
//! reassembled into the nested record shape on load. Inserts run in a
//! single transaction so a solution is never half-persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::{
    FieldSolutionRecord, FlowSolutionRecord, FormSolutionRecord, SectionSolutionRecord,
};

/// Insert a complete solution tree.
pub async fn insert(pool: &PgPool, record: &FlowSolutionRecord) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO flow_solutions (id, user_id, flow_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(record.flow_id)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *tx)
    .await?;

    for section in &record.sections {
        sqlx::query(
            "INSERT INTO section_solutions (id, flow_solution_id, section_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(section.id)
        .bind(record.id)
        .bind(&section.section_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        for form in &section.forms {
            sqlx::query(
                "INSERT INTO form_solutions (id, section_solution_id, form_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(form.id)
            .bind(section.id)
            .bind(&form.form_id)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;

            for field in &form.fields {
                sqlx::query(
                    "INSERT INTO field_solutions (id, form_solution_id, field_id, field_value, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(field.id)
                .bind(form.id)
                .bind(&field.field_id)
                .bind(&field.field_value)
                .bind(record.created_at)
                .bind(record.updated_at)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Load all solutions for startup hydration, reassembling the trees.
pub async fn load_all(pool: &PgPool) -> Result<Vec<FlowSolutionRecord>, sqlx::Error> {
    let roots = sqlx::query_as::<_, FlowSolutionRow>(
        "SELECT id, user_id, flow_id, created_at, updated_at
         FROM flow_solutions ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let sections = sqlx::query_as::<_, SectionRow>(
        "SELECT id, flow_solution_id, section_id FROM section_solutions ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let forms = sqlx::query_as::<_, FormRow>(
        "SELECT id, section_solution_id, form_id FROM form_solutions ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let fields = sqlx::query_as::<_, FieldRow>(
        "SELECT id, form_solution_id, field_id, field_value
         FROM field_solutions ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    // Group children bottom-up, then attach while walking the roots.
    let mut fields_by_form: HashMap<Uuid, Vec<FieldSolutionRecord>> = HashMap::new();
    for row in fields {
        fields_by_form
            .entry(row.form_solution_id)
            .or_default()
            .push(FieldSolutionRecord {
                id: row.id,
                field_id: row.field_id,
                field_value: row.field_value,
            });
    }

    let mut forms_by_section: HashMap<Uuid, Vec<FormSolutionRecord>> = HashMap::new();
    for row in forms {
        let form = FormSolutionRecord {
            id: row.id,
            form_id: row.form_id,
            fields: fields_by_form.remove(&row.id).unwrap_or_default(),
        };
        forms_by_section
            .entry(row.section_solution_id)
            .or_default()
            .push(form);
    }

    let mut sections_by_solution: HashMap<Uuid, Vec<SectionSolutionRecord>> = HashMap::new();
    for row in sections {
        let section = SectionSolutionRecord {
            id: row.id,
            section_id: row.section_id,
            forms: forms_by_section.remove(&row.id).unwrap_or_default(),
        };
        sections_by_solution
            .entry(row.flow_solution_id)
            .or_default()
            .push(section);
    }

    Ok(roots
        .into_iter()
        .map(|row| FlowSolutionRecord {
            sections: sections_by_solution.remove(&row.id).unwrap_or_default(),
            id: row.id,
            user_id: row.user_id,
            flow_id: row.flow_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct FlowSolutionRow {
    id: Uuid,
    user_id: i64,
    flow_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SectionRow {
    id: Uuid,
    flow_solution_id: Uuid,
    section_id: String,
}

#[derive(sqlx::FromRow)]
struct FormRow {
    id: Uuid,
    section_solution_id: Uuid,
    form_id: String,
}

#[derive(sqlx::FromRow)]
struct FieldRow {
    id: Uuid,
    form_solution_id: Uuid,
    field_id: String,
    field_value: Option<String>,
}
