//! # Flow Solutions API
//!
//! Captures a user's answers for a flow as a section → form → field tree
//! mirroring the flow's schema document. One solution per user per flow;
//! identifiers at each level are unique within their parent.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{
    AppState, FieldSolutionRecord, FlowSolutionRecord, FormSolutionRecord, SectionSolutionRecord,
};

/// Longest accepted schema identifier inside a solution tree.
const MAX_IDENT_LEN: usize = 100;

/// Request to submit a solution for a flow.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSolutionRequest {
    /// The answering user. One solution per user per flow.
    pub user_id: i64,
    #[serde(default)]
    pub sections: Vec<SectionSolutionInput>,
}

/// Answers for one section.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionSolutionInput {
    pub section_id: String,
    #[serde(default)]
    pub forms: Vec<FormSolutionInput>,
}

/// Answers for one form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FormSolutionInput {
    pub form_id: String,
    #[serde(default)]
    pub fields: Vec<FieldSolutionInput>,
}

/// One answered field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FieldSolutionInput {
    pub field_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Check one schema identifier, pushing messages in place.
fn check_ident(label: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{label} must not be empty"));
    } else if value.len() > MAX_IDENT_LEN {
        errors.push(format!("{label} must not exceed {MAX_IDENT_LEN} characters"));
    }
}

impl Validate for CreateSolutionRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut seen_sections = std::collections::HashSet::new();
        for section in &self.sections {
            check_ident("section_id", &section.section_id, &mut errors);
            if !seen_sections.insert(section.section_id.as_str()) {
                errors.push(format!(
                    "duplicate section '{}' in solution",
                    section.section_id
                ));
            }

            let mut seen_forms = std::collections::HashSet::new();
            for form in &section.forms {
                check_ident("form_id", &form.form_id, &mut errors);
                if !seen_forms.insert(form.form_id.as_str()) {
                    errors.push(format!(
                        "duplicate form '{}' in section '{}'",
                        form.form_id, section.section_id
                    ));
                }

                let mut seen_fields = std::collections::HashSet::new();
                for field in &form.fields {
                    check_ident("field_id", &field.field_id, &mut errors);
                    if !seen_fields.insert(field.field_id.as_str()) {
                        errors.push(format!(
                            "duplicate field '{}' in form '{}'",
                            field.field_id, form.form_id
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Build the solutions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/flows/:id/solutions",
            get(list_solutions_for_flow).post(create_solution),
        )
        .route("/v1/solutions/:id", get(get_solution))
}

/// POST /v1/flows/:id/solutions — Submit a solution for a flow.
#[utoipa::path(
    post,
    path = "/v1/flows/{id}/solutions",
    params(("id" = Uuid, Path, description = "Flow ID")),
    request_body = CreateSolutionRequest,
    responses(
        (status = 201, description = "Solution recorded", body = FlowSolutionRecord),
        (status = 404, description = "Flow not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "solutions"
)]
pub async fn create_solution(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    body: Result<Json<CreateSolutionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FlowSolutionRecord>), AppError> {
    let req = extract_validated_json(body)?;

    if !state.flows.contains(&flow_id) {
        return Err(AppError::not_found(format!("flow {flow_id} not found")));
    }

    let duplicate = state
        .flow_solutions
        .list()
        .iter()
        .any(|s| s.flow_id == flow_id && s.user_id == req.user_id);
    if duplicate {
        return Err(AppError::validation(
            "user already has a solution for this flow",
        ));
    }

    let now = Utc::now();
    let record = FlowSolutionRecord {
        id: Uuid::new_v4(),
        flow_id,
        user_id: req.user_id,
        sections: req
            .sections
            .into_iter()
            .map(|section| SectionSolutionRecord {
                id: Uuid::new_v4(),
                section_id: section.section_id,
                forms: section
                    .forms
                    .into_iter()
                    .map(|form| FormSolutionRecord {
                        id: Uuid::new_v4(),
                        form_id: form.form_id,
                        fields: form
                            .fields
                            .into_iter()
                            .map(|field| FieldSolutionRecord {
                                id: Uuid::new_v4(),
                                field_id: field.field_id,
                                field_value: field.value,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
        created_at: now,
        updated_at: now,
    };

    state.flow_solutions.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::solutions::insert(pool, &record).await {
            tracing::error!(solution_id = %record.id, error = %e, "failed to persist flow solution to database");
            return Err(AppError::Internal(
                "solution recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/flows/:id/solutions — List solutions submitted for a flow.
#[utoipa::path(
    get,
    path = "/v1/flows/{id}/solutions",
    params(("id" = Uuid, Path, description = "Flow ID")),
    responses(
        (status = 200, description = "Solutions listed", body = Vec<FlowSolutionRecord>),
        (status = 404, description = "Flow not found", body = crate::error::ErrorBody),
    ),
    tag = "solutions"
)]
pub async fn list_solutions_for_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<Vec<FlowSolutionRecord>>, AppError> {
    if !state.flows.contains(&flow_id) {
        return Err(AppError::not_found(format!("flow {flow_id} not found")));
    }

    let mut solutions: Vec<FlowSolutionRecord> = state
        .flow_solutions
        .list()
        .into_iter()
        .filter(|s| s.flow_id == flow_id)
        .collect();
    solutions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(solutions))
}

/// GET /v1/solutions/:id — Get one solution tree.
#[utoipa::path(
    get,
    path = "/v1/solutions/{id}",
    params(("id" = Uuid, Path, description = "Solution ID")),
    responses(
        (status = 200, description = "Solution found", body = FlowSolutionRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "solutions"
)]
pub async fn get_solution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlowSolutionRecord>, AppError> {
    state
        .flow_solutions
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("solution {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FlowName, FlowRecord};
    use serde_json::json;

    fn field(id: &str, value: &str) -> FieldSolutionInput {
        FieldSolutionInput {
            field_id: id.to_string(),
            value: Some(value.to_string()),
        }
    }

    fn sample_request() -> CreateSolutionRequest {
        CreateSolutionRequest {
            user_id: 7,
            sections: vec![SectionSolutionInput {
                section_id: "section1".to_string(),
                forms: vec![FormSolutionInput {
                    form_id: "form1".to_string(),
                    fields: vec![field("field1", "yes")],
                }],
            }],
        }
    }

    // ── Request validation ────────────────────────────────────────

    #[test]
    fn sample_request_is_valid() {
        assert!(sample_request().validate().is_ok());
    }

    #[test]
    fn empty_sections_are_allowed() {
        let req = CreateSolutionRequest {
            user_id: 7,
            sections: vec![],
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_section_id_is_rejected() {
        let mut req = sample_request();
        req.sections[0].section_id = "  ".to_string();
        let errors = req.validate().unwrap_err();
        assert!(errors.contains(&"section_id must not be empty".to_string()));
    }

    #[test]
    fn over_long_field_id_is_rejected() {
        let mut req = sample_request();
        req.sections[0].forms[0].fields[0].field_id = "f".repeat(101);
        let errors = req.validate().unwrap_err();
        assert!(errors.contains(&"field_id must not exceed 100 characters".to_string()));
    }

    #[test]
    fn duplicate_ids_are_rejected_per_level() {
        let req = CreateSolutionRequest {
            user_id: 7,
            sections: vec![
                SectionSolutionInput {
                    section_id: "s1".to_string(),
                    forms: vec![
                        FormSolutionInput {
                            form_id: "f1".to_string(),
                            fields: vec![field("x", "1"), field("x", "2")],
                        },
                        FormSolutionInput {
                            form_id: "f1".to_string(),
                            fields: vec![],
                        },
                    ],
                },
                SectionSolutionInput {
                    section_id: "s1".to_string(),
                    forms: vec![],
                },
            ],
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.contains(&"duplicate field 'x' in form 'f1'".to_string()));
        assert!(errors.contains(&"duplicate form 'f1' in section 's1'".to_string()));
        assert!(errors.contains(&"duplicate section 's1' in solution".to_string()));
    }

    #[test]
    fn same_form_id_in_different_sections_is_allowed() {
        let req = CreateSolutionRequest {
            user_id: 7,
            sections: vec![
                SectionSolutionInput {
                    section_id: "s1".to_string(),
                    forms: vec![FormSolutionInput {
                        form_id: "shared".to_string(),
                        fields: vec![],
                    }],
                },
                SectionSolutionInput {
                    section_id: "s2".to_string(),
                    forms: vec![FormSolutionInput {
                        form_id: "shared".to_string(),
                        fields: vec![],
                    }],
                },
            ],
        };
        assert!(req.validate().is_ok());
    }

    // ── Handler integration tests ─────────────────────────────────

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state_with_flow() -> (AppState, Uuid) {
        let state = AppState::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        state.flows.insert(
            id,
            FlowRecord {
                id,
                name: FlowName::new("TestFlow").unwrap(),
                json_schema: json!({ "sections": [{ "name": "section1" }] }),
                city_id: None,
                country_id: Some(6),
                created_at: now,
                updated_at: now,
            },
        );
        (state, id)
    }

    fn test_app(state: AppState) -> Router<()> {
        router().with_state(state)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_solution(flow_id: Uuid, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/v1/flows/{flow_id}/solutions"))
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn sample_payload() -> serde_json::Value {
        json!({
            "user_id": 7,
            "sections": [{
                "section_id": "section1",
                "forms": [{
                    "form_id": "form1",
                    "fields": [{ "field_id": "field1", "value": "yes" }]
                }]
            }]
        })
    }

    #[tokio::test]
    async fn handler_create_solution_returns_201_with_generated_ids() {
        let (state, flow_id) = state_with_flow();
        let app = test_app(state);

        let resp = app
            .oneshot(post_solution(flow_id, sample_payload()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let solution: FlowSolutionRecord = body_json(resp).await;
        assert_eq!(solution.flow_id, flow_id);
        assert_eq!(solution.user_id, 7);
        assert_eq!(solution.sections.len(), 1);
        assert_eq!(solution.sections[0].forms[0].fields[0].field_id, "field1");
        assert_eq!(
            solution.sections[0].forms[0].fields[0].field_value.as_deref(),
            Some("yes")
        );
    }

    #[tokio::test]
    async fn handler_create_solution_unknown_flow_returns_404() {
        let (state, _) = state_with_flow();
        let app = test_app(state);

        let resp = app
            .oneshot(post_solution(Uuid::new_v4(), sample_payload()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_create_solution_twice_for_same_user_returns_422() {
        let (state, flow_id) = state_with_flow();
        let app = test_app(state);

        let first = app
            .clone()
            .oneshot(post_solution(flow_id, sample_payload()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(post_solution(flow_id, sample_payload()))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: crate::error::ErrorBody = body_json(second).await;
        assert!(body
            .error
            .details
            .unwrap()
            .contains(&"user already has a solution for this flow".to_string()));
    }

    #[tokio::test]
    async fn handler_create_solution_different_users_both_succeed() {
        let (state, flow_id) = state_with_flow();
        let app = test_app(state);

        let first = app
            .clone()
            .oneshot(post_solution(flow_id, sample_payload()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let mut other = sample_payload();
        other["user_id"] = json!(8);
        let second = app.oneshot(post_solution(flow_id, other)).await.unwrap();
        assert_eq!(second.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn handler_list_solutions_filters_by_flow() {
        let (state, flow_id) = state_with_flow();
        let app = test_app(state.clone());

        let resp = app
            .clone()
            .oneshot(post_solution(flow_id, sample_payload()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/flows/{flow_id}/solutions"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let solutions: Vec<FlowSolutionRecord> = body_json(resp).await;
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].flow_id, flow_id);
    }

    #[tokio::test]
    async fn handler_list_solutions_unknown_flow_returns_404() {
        let (state, _) = state_with_flow();
        let app = test_app(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/flows/{}/solutions", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_get_solution_roundtrip() {
        let (state, flow_id) = state_with_flow();
        let app = test_app(state);

        let created = app
            .clone()
            .oneshot(post_solution(flow_id, sample_payload()))
            .await
            .unwrap();
        let created: FlowSolutionRecord = body_json(created).await;

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/solutions/{}", created.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let fetched: FlowSolutionRecord = body_json(resp).await;
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn handler_get_missing_solution_returns_404() {
        let (state, _) = state_with_flow();
        let app = test_app(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/solutions/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
