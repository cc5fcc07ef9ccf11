use std::sync::Arc;

use anyhow::Context;
use quill_storage::{LocalStorage, SharedStorage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod state;
pub mod trigger;

use config::Config;
use repository::{
    InMemoryJobRegistry, InMemoryProjectRegistry, JobRegistry, PgJobRegistry, PgProjectRegistry,
    ProjectRegistry,
};
use state::AppState;
use trigger::PollingTrigger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quill Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let (registry, projects): (Arc<dyn JobRegistry>, Arc<dyn ProjectRegistry>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!("Connecting to database...");
                let pool = db::create_pool(database_url)
                    .await
                    .context("Failed to create database pool")?;
                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                (
                    Arc::new(PgJobRegistry::new(pool.clone(), config.job_ttl_days)),
                    Arc::new(PgProjectRegistry::new(pool)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, jobs and projects are kept in memory only");
                (
                    Arc::new(InMemoryJobRegistry::new()),
                    Arc::new(InMemoryProjectRegistry::new()),
                )
            }
        };

    tracing::info!("Storage root: {}", config.storage_root.display());
    let storage: SharedStorage = Arc::new(LocalStorage::new(config.storage_root.clone()));

    let state = AppState::new(registry, projects, storage.clone(), &config);

    if config.trigger_mode.polling_enabled() {
        trigger::polling::spawn(
            Arc::new(PollingTrigger::new(storage)),
            state.dispatcher.clone(),
            config.trigger_owner.clone(),
            config.poll_interval,
        );
    }

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!(
        "Listening on {} (trigger mode: {})",
        config.bind_addr,
        config.trigger_mode.as_str()
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
