//! Quill Runner
//!
//! A stateless worker that executes note-processing jobs.
//!
//! Architecture:
//! - Configuration: settings from the environment
//! - Repository: runner protocol over HTTP (scheduled, claim, complete)
//! - Scheduler: job polling and lifecycle management
//!
//! The runner polls the orchestrator for pending jobs, claims them, runs the
//! matching pipeline, and reports the terminal result.

mod config;
mod repository;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use quill_agent::{AnthropicClient, EngineConfig, PdfiumRasterizer, PipelineEngine};
use quill_client::OrchestratorClient;
use quill_storage::LocalStorage;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::HttpJobRepository;
use crate::scheduler::JobPoller;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_runner=info,quill_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quill Runner");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: runner_id={}, orchestrator_url={}",
        config.runner_id, config.orchestrator_url
    );

    let client = Arc::new(OrchestratorClient::new(config.orchestrator_url.clone()));
    wait_for_orchestrator(&client).await?;

    let mut llm = AnthropicClient::new(config.anthropic_api_key.clone(), config.model.clone())
        .context("Failed to create prompting client")?;
    if let Some(base_url) = &config.anthropic_base_url {
        llm = llm.with_base_url(base_url.clone());
    }
    info!("Using model {}", llm.model());

    let rasterizer = PdfiumRasterizer::new().context("Failed to load PDFium")?;
    let storage = LocalStorage::new(config.storage_root.clone());
    info!("Storage root: {}", config.storage_root.display());

    let engine = PipelineEngine::new(Arc::new(storage), Arc::new(llm), Arc::new(rasterizer))
        .with_config(EngineConfig {
            dpi: config.dpi,
            ..EngineConfig::default()
        });

    let jobs = Arc::new(HttpJobRepository::new(client, config.runner_id.clone()));
    let poller = JobPoller::new(config, jobs, Arc::new(engine));

    info!("Starting job polling loop");
    if let Err(e) = poller.run().await {
        error!("Poller error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Waits for the orchestrator health check with exponential backoff
///
/// Covers the orchestrator not being ready yet when the runner starts
/// (common in container environments).
async fn wait_for_orchestrator(client: &OrchestratorClient) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client.health().await {
            Ok(_) => {
                if attempt > 1 {
                    info!("Orchestrator reachable after {} attempt(s)", attempt);
                }
                return Ok(());
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Orchestrator unreachable after {} attempts", MAX_RETRIES);
                    return Err(anyhow::anyhow!("Orchestrator health check failed: {}", e));
                }

                warn!(
                    "Orchestrator not reachable (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
