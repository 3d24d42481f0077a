//! # Flows API
//!
//! Flow definition CRUD plus lookup endpoints. A flow is a named schema
//! document tied to a city and/or country. Every create and update runs
//! the structural schema validator before touching any store; a rejected
//! document returns the complete list of violations in one 422 response,
//! and an accepted document is stored verbatim.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use flowstack_schema::SchemaValidator;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_json, Validate};
use crate::routes::countries::CountryRef;
use crate::state::{AppState, FlowName, FlowRecord};

/// Request to create a flow. Updates use the same shape: a flow is
/// replaced wholesale, the way the builder saves it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFlowRequest {
    pub name: String,
    /// The schema document, as produced by the builder. May arrive as a
    /// JSON object or as a string of serialized JSON; both validate the
    /// same way.
    #[serde(default)]
    pub json_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub city_id: Option<i64>,
    #[serde(default)]
    pub country_id: Option<i64>,
}

/// Alias for the update request (used in routes).
pub type UpdateFlowRequest = CreateFlowRequest;

impl Validate for CreateFlowRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Err(message) = FlowName::new(&self.name) {
            errors.push(message);
        }
        if self.city_id.is_none() && self.country_id.is_none() {
            errors.push("must assign at least one city or country".to_string());
        }
        errors.extend(SchemaValidator::validate(self.json_schema.as_ref()).into_errors());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// City reference embedded in flow responses, carrying its own country.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlowCityRef {
    pub id: i64,
    pub name: String,
    pub country: Option<CountryRef>,
}

/// Flow response with its location references resolved.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlowResponse {
    pub id: Uuid,
    pub name: FlowName,
    pub json_schema: serde_json::Value,
    pub city: Option<FlowCityRef>,
    pub country: Option<CountryRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlowResponse {
    /// Resolve the flow's city and country from state and build the response.
    pub(crate) fn from_record(record: FlowRecord, state: &AppState) -> Self {
        let city = record.city_id.and_then(|id| state.cities.get(&id)).map(|city| {
            let country = state
                .countries
                .get(&city.country_id)
                .map(|c| CountryRef::from_record(&c));
            FlowCityRef {
                id: city.id,
                name: city.name,
                country,
            }
        });
        let country = record
            .country_id
            .and_then(|id| state.countries.get(&id))
            .map(|c| CountryRef::from_record(&c));
        Self {
            id: record.id,
            name: record.name,
            json_schema: record.json_schema,
            city,
            country,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Build the flows router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/flows", get(list_flows).post(create_flow))
        .route(
            "/v1/flows/:id",
            get(get_flow).put(update_flow).delete(delete_flow),
        )
        .route("/v1/flows/by_name/:name", get(get_flow_by_name))
        .route("/v1/flows/by_city/:city_id", get(list_flows_by_city))
        .route("/v1/flows/by_country/:country_id", get(list_flows_by_country))
}

/// Collect every violation for a create/update payload: payload rules
/// first, then state-dependent rules (name uniqueness, referenced
/// location existence). `exclude` skips the record being updated in the
/// uniqueness check.
fn validation_errors(
    state: &AppState,
    req: &CreateFlowRequest,
    exclude: Option<Uuid>,
) -> Vec<String> {
    let mut errors = req.validate().err().unwrap_or_default();

    let trimmed = req.name.trim();
    if !trimmed.is_empty() {
        if let Some(existing) = state.flow_by_name(trimmed) {
            if Some(existing.id) != exclude {
                errors.push("name has already been taken".to_string());
            }
        }
    }
    if let Some(city_id) = req.city_id {
        if !state.cities.contains(&city_id) {
            errors.push("city must exist".to_string());
        }
    }
    if let Some(country_id) = req.country_id {
        if !state.countries.contains(&country_id) {
            errors.push("country must exist".to_string());
        }
    }
    errors
}

/// Sort flows for listing: stable creation order.
fn sorted_for_listing(mut flows: Vec<FlowRecord>) -> Vec<FlowRecord> {
    flows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    flows
}

/// GET /v1/flows — List all flows.
#[utoipa::path(
    get,
    path = "/v1/flows",
    responses(
        (status = 200, description = "Flows listed", body = Vec<FlowResponse>),
    ),
    tag = "flows"
)]
pub async fn list_flows(State(state): State<AppState>) -> Json<Vec<FlowResponse>> {
    let flows = sorted_for_listing(state.flows.list())
        .into_iter()
        .map(|f| FlowResponse::from_record(f, &state))
        .collect();
    Json(flows)
}

/// POST /v1/flows — Create a flow.
#[utoipa::path(
    post,
    path = "/v1/flows",
    request_body = CreateFlowRequest,
    responses(
        (status = 201, description = "Flow created", body = FlowResponse),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "flows"
)]
pub async fn create_flow(
    State(state): State<AppState>,
    body: Result<Json<CreateFlowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FlowResponse>), AppError> {
    let req = extract_json(body)?;

    let errors = validation_errors(&state, &req, None);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let name = FlowName::new(&req.name).map_err(AppError::validation)?;
    let json_schema = match req.json_schema {
        Some(value) => value,
        None => return Err(AppError::validation("schema must not be empty")),
    };

    let now = Utc::now();
    let record = FlowRecord {
        id: Uuid::new_v4(),
        name,
        json_schema,
        city_id: req.city_id,
        country_id: req.country_id,
        created_at: now,
        updated_at: now,
    };

    state.flows.insert(record.id, record.clone());

    // Persist to database (write-through). Failure is surfaced to the client
    // because the in-memory record would be lost on restart.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::flows::insert(pool, &record).await {
            tracing::error!(flow_id = %record.id, error = %e, "failed to persist flow to database");
            return Err(AppError::Internal(
                "flow recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(FlowResponse::from_record(record, &state)),
    ))
}

/// GET /v1/flows/:id — Get a flow.
#[utoipa::path(
    get,
    path = "/v1/flows/{id}",
    params(("id" = Uuid, Path, description = "Flow ID")),
    responses(
        (status = 200, description = "Flow found", body = FlowResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "flows"
)]
pub async fn get_flow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlowResponse>, AppError> {
    let flow = state
        .flows
        .get(&id)
        .ok_or_else(|| AppError::not_found(format!("flow {id} not found")))?;
    Ok(Json(FlowResponse::from_record(flow, &state)))
}

/// PUT /v1/flows/:id — Replace a flow definition.
#[utoipa::path(
    put,
    path = "/v1/flows/{id}",
    params(("id" = Uuid, Path, description = "Flow ID")),
    request_body = UpdateFlowRequest,
    responses(
        (status = 200, description = "Flow updated", body = FlowResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "flows"
)]
pub async fn update_flow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateFlowRequest>, JsonRejection>,
) -> Result<Json<FlowResponse>, AppError> {
    let req = extract_json(body)?;

    let existing = state
        .flows
        .get(&id)
        .ok_or_else(|| AppError::not_found(format!("flow {id} not found")))?;

    let errors = validation_errors(&state, &req, Some(id));
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let name = FlowName::new(&req.name).map_err(AppError::validation)?;
    let json_schema = match req.json_schema {
        Some(value) => value,
        None => return Err(AppError::validation("schema must not be empty")),
    };

    let record = FlowRecord {
        id,
        name,
        json_schema,
        city_id: req.city_id,
        country_id: req.country_id,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };

    state.flows.insert(id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::flows::update(pool, &record).await {
            tracing::error!(flow_id = %id, error = %e, "failed to persist flow update to database");
            return Err(AppError::Internal(
                "flow updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(FlowResponse::from_record(record, &state)))
}

/// DELETE /v1/flows/:id — Delete a flow and its solutions.
#[utoipa::path(
    delete,
    path = "/v1/flows/{id}",
    params(("id" = Uuid, Path, description = "Flow ID")),
    responses(
        (status = 204, description = "Flow deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "flows"
)]
pub async fn delete_flow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.flows.remove(&id).is_none() {
        return Err(AppError::not_found(format!("flow {id} not found")));
    }

    // Dependent solutions go with the flow.
    let orphaned: Vec<Uuid> = state
        .flow_solutions
        .list()
        .into_iter()
        .filter(|s| s.flow_id == id)
        .map(|s| s.id)
        .collect();
    for solution_id in &orphaned {
        state.flow_solutions.remove(solution_id);
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::flows::delete(pool, id).await {
            tracing::error!(flow_id = %id, error = %e, "failed to delete flow from database");
            return Err(AppError::Internal(
                "flow removed in-memory but database delete failed".to_string(),
            ));
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/flows/by_name/:name — Look up a flow by its unique name.
#[utoipa::path(
    get,
    path = "/v1/flows/by_name/{name}",
    params(("name" = String, Path, description = "Flow name")),
    responses(
        (status = 200, description = "Flow found", body = FlowResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "flows"
)]
pub async fn get_flow_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FlowResponse>, AppError> {
    let flow = state
        .flow_by_name(&name)
        .ok_or_else(|| AppError::not_found(format!("flow '{name}' not found")))?;
    Ok(Json(FlowResponse::from_record(flow, &state)))
}

/// GET /v1/flows/by_city/:city_id — List flows assigned to a city.
#[utoipa::path(
    get,
    path = "/v1/flows/by_city/{city_id}",
    params(("city_id" = i64, Path, description = "City ID")),
    responses(
        (status = 200, description = "Flows listed", body = Vec<FlowResponse>),
    ),
    tag = "flows"
)]
pub async fn list_flows_by_city(
    State(state): State<AppState>,
    Path(city_id): Path<i64>,
) -> Json<Vec<FlowResponse>> {
    let flows = sorted_for_listing(
        state
            .flows
            .list()
            .into_iter()
            .filter(|f| f.city_id == Some(city_id))
            .collect(),
    )
    .into_iter()
    .map(|f| FlowResponse::from_record(f, &state))
    .collect();
    Json(flows)
}

/// GET /v1/flows/by_country/:country_id — List flows assigned to a country.
#[utoipa::path(
    get,
    path = "/v1/flows/by_country/{country_id}",
    params(("country_id" = i64, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Flows listed", body = Vec<FlowResponse>),
    ),
    tag = "flows"
)]
pub async fn list_flows_by_country(
    State(state): State<AppState>,
    Path(country_id): Path<i64>,
) -> Json<Vec<FlowResponse>> {
    let flows = sorted_for_listing(
        state
            .flows
            .list()
            .into_iter()
            .filter(|f| f.country_id == Some(country_id))
            .collect(),
    )
    .into_iter()
    .map(|f| FlowResponse::from_record(f, &state))
    .collect();
    Json(flows)
}
