//! Job poller
//!
//! Polls the orchestrator for scheduled jobs and runs each through the
//! pipeline engine in its own task. Every claimed job is reported back with
//! a terminal result, since the engine turns all failures into one.

use std::sync::Arc;

use anyhow::Result;
use quill_agent::PipelineEngine;
use quill_core::domain::job::Job;
use tokio::sync::Semaphore;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::repository::JobRepository;

/// Job poller that continuously polls for and executes jobs
pub struct JobPoller {
    config: Config,
    jobs: Arc<dyn JobRepository>,
    engine: Arc<PipelineEngine>,
    semaphore: Arc<Semaphore>,
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(config: Config, jobs: Arc<dyn JobRepository>, engine: Arc<PipelineEngine>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs));
        Self {
            config,
            jobs,
            engine,
            semaphore,
        }
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting job poller (interval: {:?}, parallel jobs: {})",
            self.config.poll_interval, self.config.max_parallel_jobs
        );

        let mut interval = time::interval(self.config.poll_interval);

        loop {
            interval.tick().await;

            debug!("Polling for scheduled jobs");

            match self.poll_and_execute_once().await {
                Ok(executed) => {
                    if executed > 0 {
                        info!("Executed {} job(s) this cycle", executed);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll cycle, returning how many jobs were started
    pub async fn poll_and_execute_once(&self) -> Result<usize> {
        let jobs = self
            .jobs
            .fetch_scheduled_jobs(self.config.max_parallel_jobs)
            .await?;

        if jobs.is_empty() {
            debug!("No jobs available");
            return Ok(0);
        }

        info!("Found {} job(s) to execute", jobs.len());

        let mut handles = Vec::new();

        for job in jobs {
            // Skip if at max capacity; the job stays pending for the next cycle
            if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
                handles.push(self.spawn_job_task(job, permit));
            } else {
                debug!("Max parallel jobs reached, skipping job {} for now", job.id);
            }
        }

        let num_jobs = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Job task panicked: {}", e);
            }
        }

        Ok(num_jobs)
    }

    /// Spawns a task to execute a single job
    fn spawn_job_task(
        &self,
        job: Job,
        _permit: tokio::sync::OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<()> {
        let jobs = Arc::clone(&self.jobs);
        let engine = Arc::clone(&self.engine);

        tokio::spawn(async move {
            let job_id = job.id;
            if let Err(e) = Self::execute_job(job, jobs, engine).await {
                error!("Failed to execute job {}: {:#}", job_id, e);
            }
        })
    }

    /// Claims, runs, and completes one job
    async fn execute_job(
        job: Job,
        jobs: Arc<dyn JobRepository>,
        engine: Arc<PipelineEngine>,
    ) -> Result<()> {
        let Some(claimed) = jobs.claim_job(job.id).await? else {
            debug!("Job {} was claimed by another runner", job.id);
            return Ok(());
        };

        info!(
            "Claimed job {} ({} on {})",
            claimed.id, claimed.kind, claimed.document_path
        );

        let result = engine.run(&claimed).await;

        info!(
            "Job {} finished with status: {}",
            claimed.id,
            if result.success { "success" } else { "failure" }
        );

        jobs.complete_job(claimed.id, result).await
    }
}
