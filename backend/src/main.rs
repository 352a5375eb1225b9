//! Main entry point for the merchant authentication service.
//!
//! Loads configuration, opens and migrates the database, starts the expired
//! token sweeper and serves the API until Ctrl-C.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod state;
mod utils;

use anyhow::{Context, Result};
use config::Config;
use database::Database;
use services::audit::TracingAuditSink;
use services::token_sweeper::spawn_token_sweeper;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() -> Result<()> {
    init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    let state = AppState::new(db.pool().clone(), &config, Arc::new(TracingAuditSink))?;
    let sweeper = spawn_token_sweeper(
        state.sessions.clone(),
        Duration::from_secs(config.token_purge_interval_seconds),
    );

    let app = api::router(state);

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    info!("Starting merchant auth server on port {}", config.server_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
