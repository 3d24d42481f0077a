//! # Middleware
//!
//! Tower/Axum middleware for the API surface. Currently the Prometheus
//! metrics recorder; `TraceLayer` comes straight from `tower-http` and
//! needs no module here.

pub mod metrics;
