//! # Countries API
//!
//! Read-only reference data. Rows come from the seed set or the
//! database; there are no write endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::{AppState, CountryRecord};

/// Compact country reference embedded in other resources.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryRef {
    pub id: i64,
    pub name: String,
}

impl CountryRef {
    /// Build a reference from a full record.
    pub fn from_record(record: &CountryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
        }
    }
}

/// Build the countries router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/countries", get(list_countries))
        .route("/v1/countries/:id", get(get_country))
}

/// GET /v1/countries — List all countries.
#[utoipa::path(
    get,
    path = "/v1/countries",
    responses(
        (status = 200, description = "Countries listed", body = Vec<CountryRecord>),
    ),
    tag = "reference"
)]
pub async fn list_countries(State(state): State<AppState>) -> Json<Vec<CountryRecord>> {
    let mut countries = state.countries.list();
    countries.sort_by_key(|c| c.id);
    Json(countries)
}

/// GET /v1/countries/:id — Get a country.
#[utoipa::path(
    get,
    path = "/v1/countries/{id}",
    params(("id" = i64, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country found", body = CountryRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "reference"
)]
pub async fn get_country(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CountryRecord>, AppError> {
    state
        .countries
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("country {id} not found")))
}
