//! # flowstack-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Flowstack backend.
//! Binds to configurable port (default 8080).

use anyhow::Context;

use flowstack_api::state::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let config = AppConfig { port };

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = flowstack_api::db::init_pool()
        .await
        .context("database initialization failed")?;

    let state = flowstack_api::AppState::with_config(config, db_pool);

    // Hydrate in-memory stores from database (if connected), then make
    // sure the reference data exists on both sides.
    if let Err(e) = state.hydrate_from_db().await {
        anyhow::bail!("database hydration failed: {e}");
    }
    flowstack_api::seed::install_reference_data(&state);
    flowstack_api::seed::persist_reference_data(&state)
        .await
        .context("reference data persistence failed")?;

    let app = flowstack_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Flowstack API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server exited")?;

    Ok(())
}
