//! # Integration Tests for flowstack-api
//!
//! Drives the fully assembled application router: health probes,
//! reference data, flow CRUD with schema validation, solution capture,
//! cascade deletes, metrics exposure, and OpenAPI spec generation.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use flowstack_api::state::AppState;

/// Helper: build the test app over seeded in-memory state.
fn test_app() -> axum::Router {
    let state = AppState::new();
    flowstack_api::seed::install_reference_data(&state);
    flowstack_api::app(state)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Helper: JSON POST request.
fn post(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// Helper: bare GET request.
fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn valid_schema() -> Value {
    json!({
        "sections": [{
            "id": "section1",
            "title": "Section 1",
            "forms": [{
                "id": "form1",
                "fields": [{ "id": "field1", "type": "text", "label": "Field 1" }]
            }]
        }]
    })
}

fn flow_payload(name: &str) -> Value {
    json!({
        "name": name,
        "json_schema": valid_schema(),
        "city_id": 32
    })
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app();
    let response = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Reference Data -----------------------------------------------------------

#[tokio::test]
async fn test_countries_and_cities_are_served() {
    let app = test_app();

    let response = app.clone().oneshot(get("/v1/countries")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let countries = body_json(response).await;
    assert!(countries.as_array().unwrap().len() >= 5);

    let response = app.oneshot(get("/v1/cities/32")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let city = body_json(response).await;
    assert_eq!(city["name"], "Bogota");
    assert_eq!(city["country"]["name"], "Colombia");
}

// -- Flow Lifecycle -----------------------------------------------------------

#[tokio::test]
async fn test_flow_create_get_update_delete_roundtrip() {
    let app = test_app();

    // Create.
    let response = app
        .clone()
        .oneshot(post("/v1/flows", flow_payload("Passport2024")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Passport2024");
    assert_eq!(created["city"]["name"], "Bogota");
    assert_eq!(created["json_schema"], valid_schema());

    // Read back.
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/flows/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Update with a new schema and location.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/v1/flows/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Passport2024",
                        "json_schema": { "sections": [{ "name": "only" }] },
                        "country_id": 6
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["country"]["name"], "Colombia");
    assert_eq!(updated["city"], Value::Null);

    // Delete.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/flows/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get(&format!("/v1/flows/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_flow_create_rejects_invalid_schema_with_all_messages() {
    let app = test_app();

    let response = app
        .oneshot(post(
            "/v1/flows",
            json!({
                "name": "",
                "json_schema": { "sections": [{ "forms": [{ "fields": [{}] }] }] },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let details: Vec<String> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();

    // Name, location, and every schema violation arrive together.
    assert!(details.iter().any(|m| m.contains("name")));
    assert!(details.contains(&"must assign at least one city or country".to_string()));
    assert!(details.contains(&"Section 1 must have an ID or name".to_string()));
    assert!(details.contains(&"Section 1 must have a title or name".to_string()));
    assert!(details.contains(&"Form 1 of section 1 must have an ID or name".to_string()));
    assert!(details.contains(&"Field 1 of form 1 of section 1 must have an ID or name".to_string()));
    assert!(details.contains(&"Field 1 of form 1 of section 1 must have a type".to_string()));
}

#[tokio::test]
async fn test_flow_create_accepts_schema_as_serialized_text() {
    let app = test_app();

    let response = app
        .oneshot(post(
            "/v1/flows",
            json!({
                "name": "TextSchema",
                "json_schema": valid_schema().to_string(),
                "country_id": 6
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Stored verbatim: the response carries the string form back.
    let created = body_json(response).await;
    assert!(created["json_schema"].is_string());
}

#[tokio::test]
async fn test_flow_lookup_routes() {
    let app = test_app();

    for (name, location) in [
        ("CityFlow", json!({"city_id": 32})),
        ("CountryFlow", json!({"country_id": 6})),
    ] {
        let mut payload = json!({ "name": name, "json_schema": valid_schema() });
        payload
            .as_object_mut()
            .unwrap()
            .extend(location.as_object().unwrap().clone());
        let response = app.clone().oneshot(post("/v1/flows", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get("/v1/flows/by_name/CityFlow"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/v1/flows/by_city/32"))
        .await
        .unwrap();
    let flows = body_json(response).await;
    assert_eq!(flows.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/v1/flows/by_country/6"))
        .await
        .unwrap();
    let flows = body_json(response).await;
    assert_eq!(flows.as_array().unwrap().len(), 1);

    let response = app.oneshot(get("/v1/flows")).await.unwrap();
    let flows = body_json(response).await;
    assert_eq!(flows.as_array().unwrap().len(), 2);
}

// -- Solutions ----------------------------------------------------------------

#[tokio::test]
async fn test_solution_capture_and_cascade_delete() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post("/v1/flows", flow_payload("WithAnswers")))
        .await
        .unwrap();
    let flow = body_json(response).await;
    let flow_id = flow["id"].as_str().unwrap().to_string();

    // Submit a solution.
    let response = app
        .clone()
        .oneshot(post(
            &format!("/v1/flows/{flow_id}/solutions"),
            json!({
                "user_id": 7,
                "sections": [{
                    "section_id": "section1",
                    "forms": [{
                        "form_id": "form1",
                        "fields": [{ "field_id": "field1", "value": "blue" }]
                    }]
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let solution = body_json(response).await;
    let solution_id = solution["id"].as_str().unwrap().to_string();
    assert_eq!(
        solution["sections"][0]["forms"][0]["fields"][0]["field_value"],
        "blue"
    );

    // Listed under the flow.
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/flows/{flow_id}/solutions")))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Deleting the flow removes its solutions.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/flows/{flow_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/v1/solutions/{solution_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Observability ------------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_reports_domain_gauges() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post("/v1/flows", flow_payload("Measured")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("flowstack_flows_total 1"));
    assert!(body.contains("flowstack_countries_total"));
    assert!(body.contains("flowstack_http_requests_total"));
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let app = test_app();
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    assert_eq!(spec["info"]["title"], "Flowstack API");
    assert!(spec["paths"]["/v1/flows"].is_object());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = test_app();
    let response = app.oneshot(get("/v1/nonsense")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
