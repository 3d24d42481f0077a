//! # flowstack-api — Axum API for the Flowstack Builder
//!
//! CRUD backend for the form-flow builder: countries and cities as
//! read-only reference data, flow definitions whose schema documents are
//! structurally validated before every write, and per-user solution
//! trees captured against those schemas.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                 | Domain                  |
//! |-------------------------|------------------------|-------------------------|
//! | `/v1/countries/*`       | [`routes::countries`]  | Reference data          |
//! | `/v1/cities/*`          | [`routes::cities`]     | Reference data          |
//! | `/v1/flows/*`           | [`routes::flows`]      | Flow definitions        |
//! | `/v1/flows/:id/solutions` | [`routes::solutions`] | Flow solutions         |
//! | `/v1/solutions/*`       | [`routes::solutions`]  | Flow solutions          |
//! | `/openapi.json`         | [`openapi`]            | Integration contract    |
//! | `/health/*`, `/metrics` | here                   | Probes & observability  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Health probes and `/metrics` are mounted outside the API stack so a
//! scrape never shows up in its own request counters.

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod seed;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;

/// Check if metrics are enabled via the `FLOWSTACK_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("FLOWSTACK_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the
/// metrics middleware so they stay cheap and unmeasured.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // API routes.
    //
    // Body size limit: 2 MiB. Schema documents are hand-built in the
    // browser; anything larger than this is not a flow definition.
    let mut api = Router::new()
        .merge(routes::countries::router())
        .merge(routes::cities::router())
        .merge(routes::flows::router())
        .merge(routes::solutions::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    // Only register the metrics middleware when metrics are enabled.
    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Operational endpoints — probes plus the metrics scrape target.
    let mut ops = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        ops = ops
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let ops = ops.with_state(state);

    Router::new().merge(ops).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in Prometheus text
/// exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.countries_total().set(state.countries.len() as f64);
    metrics.cities_total().set(state.cities.len() as f64);
    metrics.flows_total().set(state.flows.len() as f64);
    metrics
        .flow_solutions_total()
        .set(state.flow_solutions.len() as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible.
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible (read lock acquirable).
    let _ = state.countries.len();
    let _ = state.cities.len();
    let _ = state.flows.len();
    let _ = state.flow_solutions.len();

    // Verify database connection (when configured).
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
