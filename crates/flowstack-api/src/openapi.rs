//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`. The spec is the integration contract for
//! the builder frontend.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
///
/// Registers all utoipa-documented routes, schemas, and tags. Serves as
/// the single source of truth for integrators.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flowstack API",
        version = "0.3.2",
        description = "CRUD backend for the Flowstack form-flow builder.\n\nProvides:\n- **Reference data** — countries and cities used to scope flows\n- **Flows** — named form-flow definitions whose `json_schema` document (sections → forms → fields) is structurally validated before every write\n- **Flow solutions** — per-user answer trees captured against a flow's schema\n\nValidation failures return HTTP 422 with the complete list of violation messages in `error.details`.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Reference data ──────────────────────────────────────────────
        crate::routes::countries::list_countries,
        crate::routes::countries::get_country,
        crate::routes::cities::list_cities,
        crate::routes::cities::get_city,
        // ── Flows ───────────────────────────────────────────────────────
        crate::routes::flows::list_flows,
        crate::routes::flows::create_flow,
        crate::routes::flows::get_flow,
        crate::routes::flows::update_flow,
        crate::routes::flows::delete_flow,
        crate::routes::flows::get_flow_by_name,
        crate::routes::flows::list_flows_by_city,
        crate::routes::flows::list_flows_by_country,
        // ── Solutions ───────────────────────────────────────────────────
        crate::routes::solutions::create_solution,
        crate::routes::solutions::list_solutions_for_flow,
        crate::routes::solutions::get_solution,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::state::CountryRecord,
            crate::state::CityRecord,
            crate::state::FlowName,
            crate::state::FlowRecord,
            crate::state::FlowSolutionRecord,
            crate::state::SectionSolutionRecord,
            crate::state::FormSolutionRecord,
            crate::state::FieldSolutionRecord,
            crate::routes::countries::CountryRef,
            crate::routes::cities::CityResponse,
            crate::routes::flows::CreateFlowRequest,
            crate::routes::flows::FlowCityRef,
            crate::routes::flows::FlowResponse,
            crate::routes::solutions::CreateSolutionRequest,
            crate::routes::solutions::SectionSolutionInput,
            crate::routes::solutions::FormSolutionInput,
            crate::routes::solutions::FieldSolutionInput,
        )
    ),
    tags(
        (name = "reference", description = "Country and city reference data"),
        (name = "flows", description = "Flow definition CRUD and lookups"),
        (name = "solutions", description = "Submitted flow solutions"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Serve the assembled spec.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_assembles_and_lists_core_paths() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/v1/flows"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/flows/{id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/countries"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/flows/{id}/solutions"));
    }

    #[test]
    fn spec_serializes_to_json() {
        let spec = ApiDoc::openapi();
        let rendered = serde_json::to_string(&spec).unwrap();
        assert!(rendered.contains("Flowstack API"));
    }
}
