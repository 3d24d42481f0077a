//! # Reference Data Seeding
//!
//! Countries and cities are read-only through the API; their rows come
//! from this seed set. On startup the seed is installed into the
//! in-memory stores when they are empty, and written through to the
//! database when a pool is configured (idempotent — existing rows win).

use chrono::Utc;

use crate::state::{AppState, CityRecord, CountryRecord};

/// Seed countries as `(id, name)` pairs.
const COUNTRIES: &[(i64, &str)] = &[
    (1, "Mexico"),
    (2, "United States"),
    (3, "Canada"),
    (4, "Spain"),
    (5, "Argentina"),
    (6, "Colombia"),
    (7, "Chile"),
    (8, "Peru"),
];

/// Seed cities as `(id, name, country_id)` tuples.
const CITIES: &[(i64, &str, i64)] = &[
    (1, "Mexico City", 1),
    (2, "Guadalajara", 1),
    (3, "Monterrey", 1),
    (4, "New York", 2),
    (5, "Los Angeles", 2),
    (6, "Toronto", 3),
    (7, "Vancouver", 3),
    (8, "Madrid", 4),
    (9, "Barcelona", 4),
    (10, "Buenos Aires", 5),
    (11, "Cordoba", 5),
    (30, "Medellin", 6),
    (31, "Cali", 6),
    (32, "Bogota", 6),
    (33, "Santiago", 7),
    (34, "Lima", 8),
];

/// Install the country/city reference data into the in-memory stores.
///
/// Skips any id already present, so hydration from the database takes
/// precedence over the built-in seed.
pub fn install_reference_data(state: &AppState) {
    let now = Utc::now();

    for &(id, name) in COUNTRIES {
        if state.countries.contains(&id) {
            continue;
        }
        state.countries.insert(
            id,
            CountryRecord {
                id,
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    for &(id, name, country_id) in CITIES {
        if state.cities.contains(&id) {
            continue;
        }
        state.cities.insert(
            id,
            CityRecord {
                id,
                name: name.to_string(),
                country_id,
                created_at: now,
                updated_at: now,
            },
        );
    }

    tracing::info!(
        countries = state.countries.len(),
        cities = state.cities.len(),
        "Reference data installed"
    );
}

/// Write the seeded reference data through to the database.
///
/// Uses `ON CONFLICT DO NOTHING` semantics in the insert statements, so
/// rerunning on every startup is safe.
pub async fn persist_reference_data(state: &AppState) -> Result<(), sqlx::Error> {
    let pool = match &state.db_pool {
        Some(pool) => pool,
        None => return Ok(()),
    };

    for record in state.countries.list() {
        crate::db::countries::insert(pool, &record).await?;
    }
    for record in state.cities.list() {
        crate::db::cities::insert(pool, &record).await?;
    }

    Ok(())
}
