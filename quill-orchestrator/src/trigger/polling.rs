//! Polling trigger
//!
//! Lists the mode folders under the protected root on every tick and
//! triggers once per new document. The set of processed paths lives in
//! memory only, so a restart re-triggers everything still in the folders
//! (at-least-once across restarts).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quill_core::domain::job::Job;
use quill_core::domain::trigger::TriggerContext;
use quill_core::layout::MODE_FOLDERS;
use quill_storage::SharedStorage;
use tracing::{debug, error, info, warn};

use super::{Dispatcher, Trigger, TriggerError, context_from_path, is_candidate};

pub struct PollingTrigger {
    storage: SharedStorage,
    processed: Mutex<HashSet<String>>,
}

impl PollingTrigger {
    pub fn new(storage: SharedStorage) -> Self {
        Self {
            storage,
            processed: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_processed(&self, path: &str) -> bool {
        self.processed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
    }

    fn mark_processed(&self, path: &str) {
        self.processed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string());
    }

    /// Scans every mode folder once and returns the jobs created
    ///
    /// A path is marked processed once its outcome is permanent: a job was
    /// created, or the document can never produce one. Registry or storage
    /// failures leave it for the next tick.
    pub async fn scan_once(&self, dispatcher: &Dispatcher, owner: &str) -> Vec<Job> {
        let layout = self.storage.layout();
        let mut jobs = Vec::new();

        for folder in MODE_FOLDERS {
            let prefix = format!("{}/{}", layout.protected_root, folder);
            let files = match self.storage.list(&prefix).await {
                Ok(files) => files,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!(folder = %prefix, error = %e, "Failed to list mode folder");
                    continue;
                }
            };

            for file in files {
                match dispatcher.process(self, &file.path, owner).await {
                    Ok(Some(job)) => {
                        self.mark_processed(&file.path);
                        jobs.push(job);
                    }
                    Ok(None) => {}
                    Err(e) if e.is_permanent() => {
                        warn!(path = %file.path, error = %e, "Document rejected, not retrying");
                        self.mark_processed(&file.path);
                    }
                    Err(e) => {
                        warn!(path = %file.path, error = %e, "Trigger failed, retrying next scan");
                    }
                }
            }
        }

        jobs
    }

    /// Polling loop; never returns
    pub async fn run(self: Arc<Self>, dispatcher: Dispatcher, owner: String, poll_interval: Duration) {
        info!("Polling trigger started (interval: {:?})", poll_interval);

        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;

            let jobs = self.scan_once(&dispatcher, &owner).await;
            if jobs.is_empty() {
                debug!("Polling scan found nothing new");
            } else {
                info!("Polling scan triggered {} job(s)", jobs.len());
            }
        }
    }
}

#[async_trait]
impl Trigger for PollingTrigger {
    type Event = String;

    fn name(&self) -> &'static str {
        "polling"
    }

    async fn should_trigger(&self, path: &String) -> bool {
        is_candidate(self.storage.layout(), path) && !self.is_processed(path)
    }

    async fn extract_context(&self, path: &String) -> Result<TriggerContext, TriggerError> {
        context_from_path(self.storage.layout(), path)
    }
}

/// Spawns the polling loop on the runtime
pub fn spawn(
    trigger: Arc<PollingTrigger>,
    dispatcher: Dispatcher,
    owner: String,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        trigger.run(dispatcher, owner, poll_interval).await;
        error!("Polling trigger stopped");
    })
}
