//! Orchestrator configuration
//!
//! Everything is read from the environment once at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which trigger sources the orchestrator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Direct submission only
    None,
    /// Webhook and storage-event endpoints
    Webhook,
    /// Background folder polling
    Polling,
    All,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::None => "none",
            TriggerMode::Webhook => "webhook",
            TriggerMode::Polling => "polling",
            TriggerMode::All => "all",
        }
    }

    pub fn webhooks_enabled(&self) -> bool {
        matches!(self, TriggerMode::Webhook | TriggerMode::All)
    }

    pub fn polling_enabled(&self) -> bool {
        matches!(self, TriggerMode::Polling | TriggerMode::All)
    }
}

impl FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(TriggerMode::None),
            "webhook" => Ok(TriggerMode::Webhook),
            "polling" => Ok(TriggerMode::Polling),
            "all" => Ok(TriggerMode::All),
            other => Err(format!(
                "unknown trigger mode '{}', expected none, webhook, polling or all",
                other
            )),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL; the in-memory registry is used when absent
    pub database_url: Option<String>,

    pub bind_addr: String,

    /// Root directory of the local storage backend
    pub storage_root: PathBuf,

    pub trigger_mode: TriggerMode,

    /// Delay between two polling scans
    pub poll_interval: Duration,

    /// Owner recorded on jobs created by storage events and polling
    pub trigger_owner: String,

    /// Retention written to the registry's `expires_at` column
    pub job_ttl_days: i64,

    /// When set, storage events from other buckets are ignored
    pub event_bucket: Option<String>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DATABASE_URL (optional)
    /// - ORCHESTRATOR_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - STORAGE_ROOT (optional, default: ./data)
    /// - TRIGGER_MODE (optional, none|webhook|polling|all, default: webhook)
    /// - POLL_INTERVAL (optional, seconds, default: 60)
    /// - TRIGGER_OWNER (optional, default: system)
    /// - JOB_TTL_DAYS (optional, default: 7)
    /// - STORAGE_EVENT_BUCKET (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let trigger_mode = match non_empty_var("TRIGGER_MODE") {
            Some(raw) => raw.parse::<TriggerMode>().map_err(anyhow::Error::msg)?,
            None => defaults.trigger_mode,
        };

        let poll_interval = std::env::var("POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let job_ttl_days = std::env::var("JOB_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(defaults.job_ttl_days);

        Ok(Self {
            database_url: non_empty_var("DATABASE_URL"),
            bind_addr: non_empty_var("ORCHESTRATOR_BIND_ADDR").unwrap_or(defaults.bind_addr),
            storage_root: non_empty_var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            trigger_mode,
            poll_interval,
            trigger_owner: non_empty_var("TRIGGER_OWNER").unwrap_or(defaults.trigger_owner),
            job_ttl_days,
            event_bucket: non_empty_var("STORAGE_EVENT_BUCKET"),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.trigger_owner.trim().is_empty() {
            anyhow::bail!("trigger_owner cannot be empty");
        }

        if self.trigger_mode.polling_enabled() && self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.job_ttl_days <= 0 {
            anyhow::bail!("job_ttl_days must be greater than 0");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("DATABASE_URL must be a postgres:// URL");
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            storage_root: PathBuf::from("./data"),
            trigger_mode: TriggerMode::Webhook,
            poll_interval: Duration::from_secs(60),
            trigger_owner: "system".to_string(),
            job_ttl_days: 7,
            event_bucket: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
