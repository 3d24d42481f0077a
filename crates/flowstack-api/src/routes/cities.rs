//! # Cities API
//!
//! Read-only reference data. Each city belongs to exactly one country;
//! responses embed the owning country for the builder's location picker.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::routes::countries::CountryRef;
use crate::state::{AppState, CityRecord};

/// City response with its owning country embedded.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CityResponse {
    pub id: i64,
    pub name: String,
    pub country_id: i64,
    pub country: Option<CountryRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CityResponse {
    /// Resolve the owning country from state and build the response.
    fn from_record(record: CityRecord, state: &AppState) -> Self {
        let country = state
            .countries
            .get(&record.country_id)
            .map(|c| CountryRef::from_record(&c));
        Self {
            id: record.id,
            name: record.name,
            country_id: record.country_id,
            country,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Build the cities router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cities", get(list_cities))
        .route("/v1/cities/:id", get(get_city))
}

/// GET /v1/cities — List all cities.
#[utoipa::path(
    get,
    path = "/v1/cities",
    responses(
        (status = 200, description = "Cities listed", body = Vec<CityResponse>),
    ),
    tag = "reference"
)]
pub async fn list_cities(State(state): State<AppState>) -> Json<Vec<CityResponse>> {
    let mut cities = state.cities.list();
    cities.sort_by_key(|c| c.id);
    let cities = cities
        .into_iter()
        .map(|c| CityResponse::from_record(c, &state))
        .collect();
    Json(cities)
}

/// GET /v1/cities/:id — Get a city.
#[utoipa::path(
    get,
    path = "/v1/cities/{id}",
    params(("id" = i64, Path, description = "City ID")),
    responses(
        (status = 200, description = "City found", body = CityResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "reference"
)]
pub async fn get_city(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CityResponse>, AppError> {
    let city = state
        .cities
        .get(&id)
        .ok_or_else(|| AppError::not_found(format!("city {id} not found")))?;
    Ok(Json(CityResponse::from_record(city, &state)))
}
