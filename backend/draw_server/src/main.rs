//! Fair draw service — entry point.
//!
//! Loads (or creates) the lottery state from SQLite, then exposes draws,
//! cycle progress, fairness statistics and backups over a small Axum REST
//! API for the frontend.

mod api;
mod config;
mod db;
mod errors;
mod session;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::SqliteStore;
use session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let defaults = config.lottery_config().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;
    let session = Session::open(SqliteStore::new(pool), defaults).await?;

    let api_state = Arc::new(api::ApiState { session });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/state", get(api::get_state))
        .route("/draw", post(api::draw))
        .route("/cycles", post(api::new_cycle))
        .route("/progress", get(api::get_progress))
        .route("/stats", get(api::get_stats))
        .route("/backups", get(api::list_backups).post(api::create_backup))
        .route("/backups/:locator/restore", post(api::restore_backup))
        .route("/validate", get(api::validate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
