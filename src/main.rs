//! pixelroom — collaborative pixel canvas server.
//!
//! Startup order: environment, logging, configuration, database (with
//! migrations), room registry, background flush, HTTP listener. On Ctrl-C
//! the listener drains and every dirty room gets one last save.

mod canvas;
mod config;
mod db;
mod event;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::store::PgRoomStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pixelroom=info,tower_http=info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    let port = config.port;

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    let store = Arc::new(PgRoomStore::new(pool.clone()));
    let state = state::AppState::new(pool, store, config);

    // Spawn background persistence task.
    let persistence =
        services::persistence::spawn_persistence_task(Arc::clone(&state.rooms), state.config.room_flush_interval_ms);

    let rooms = Arc::clone(&state.rooms);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "pixelroom listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    persistence.abort();
    let stats = services::persistence::flush_once(&rooms).await;
    tracing::info!(saved = stats.saved, failed = stats.failed, "final room flush");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
