//! Runner configuration
//!
//! Connection settings for the orchestrator, polling cadence, and the
//! capabilities handed to the pipeline engine (storage root, model, DPI).

use std::path::PathBuf;
use std::time::Duration;

use quill_agent::llm::DEFAULT_MODEL;
use quill_agent::rasterize::DEFAULT_DPI;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this runner instance
    pub runner_id: String,

    /// Orchestrator base URL (e.g., "http://localhost:8080")
    pub orchestrator_url: String,

    /// How often to poll the orchestrator for new jobs
    pub poll_interval: Duration,

    /// Max pipelines running at once on this runner
    pub max_parallel_jobs: usize,

    /// Root of the local storage backend, shared with the orchestrator
    pub storage_root: PathBuf,

    pub anthropic_api_key: String,

    /// Overrides the Anthropic API host
    pub anthropic_base_url: Option<String>,

    pub model: String,

    /// Rasterization resolution
    pub dpi: u32,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(runner_id: String, orchestrator_url: String) -> Self {
        Self {
            runner_id,
            orchestrator_url,
            poll_interval: Duration::from_secs(5),
            max_parallel_jobs: 2,
            storage_root: PathBuf::from("./data"),
            anthropic_api_key: String::new(),
            anthropic_base_url: None,
            model: DEFAULT_MODEL.to_string(),
            dpi: DEFAULT_DPI,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RUNNER_ID (optional, default: random UUID)
    /// - ORCHESTRATOR_URL (optional, default: http://localhost:8080)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - MAX_PARALLEL_JOBS (optional, default: 2)
    /// - STORAGE_ROOT (optional, default: ./data)
    /// - ANTHROPIC_API_KEY (required)
    /// - ANTHROPIC_BASE_URL (optional)
    /// - QUILL_MODEL (optional)
    /// - RENDER_DPI (optional, default: 150)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;

        let poll_interval = std::env::var("POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let max_parallel_jobs = std::env::var("MAX_PARALLEL_JOBS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_parallel_jobs);

        let dpi = std::env::var("RENDER_DPI")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.dpi);

        Ok(Self {
            runner_id: non_empty_var("RUNNER_ID").unwrap_or(defaults.runner_id),
            orchestrator_url: non_empty_var("ORCHESTRATOR_URL").unwrap_or(defaults.orchestrator_url),
            poll_interval,
            max_parallel_jobs,
            storage_root: non_empty_var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            anthropic_api_key,
            anthropic_base_url: non_empty_var("ANTHROPIC_BASE_URL"),
            model: non_empty_var("QUILL_MODEL").unwrap_or(defaults.model),
            dpi,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runner_id.is_empty() {
            anyhow::bail!("runner_id cannot be empty");
        }

        if !self.orchestrator_url.starts_with("http://")
            && !self.orchestrator_url.starts_with("https://")
        {
            anyhow::bail!("orchestrator_url must start with http:// or https://");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.anthropic_api_key.trim().is_empty() {
            anyhow::bail!("anthropic_api_key cannot be empty");
        }

        if self.dpi == 0 {
            anyhow::bail!("dpi must be greater than 0");
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            "http://localhost:8080".to_string(),
        )
    }
}
