//! Job command handlers
//!
//! Submitting jobs, listing them, and viewing one job's outcome.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use quill_core::domain::job::{Job, JobStatus};
use quill_core::dto::job::{JobSubmission, JobSummary, SubmitJob};

use crate::config::Config;
use crate::id_resolver::resolve_job_id;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a job
    Submit {
        /// summarize, create_project, modify_project or infer_action
        kind: String,

        /// Document path under raw/
        document_path: String,

        /// Extra guidance appended to the prompts
        #[arg(long)]
        instruction: Option<String>,

        /// Existing project to change (modify_project)
        #[arg(long)]
        project: Option<String>,

        /// Project name (infer_action)
        #[arg(long)]
        name: Option<String>,
    },
    /// List your jobs, most recent first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List jobs waiting for a runner
    Scheduled,
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::Submit {
            kind,
            document_path,
            instruction,
            project,
            name,
        } => {
            let submission = client
                .submit_job(SubmitJob {
                    kind,
                    document_path,
                    instruction,
                    project_ref: project,
                    project_name: name,
                })
                .await?;
            print_submission(&submission);
        }
        JobCommands::List { limit } => {
            let jobs = client.list_jobs(limit).await?;
            if jobs.is_empty() {
                println!("{}", "No jobs found.".yellow());
            } else {
                println!("{}", format!("Found {} job(s):", jobs.len()).bold());
                println!();
                for job in &jobs {
                    print_job_summary(job);
                }
            }
        }
        JobCommands::Scheduled => {
            let jobs = client.list_scheduled_jobs(None).await?;
            if jobs.is_empty() {
                println!("{}", "No scheduled jobs found.".yellow());
            } else {
                println!("{}", format!("Found {} scheduled job(s):", jobs.len()).bold());
                println!();
                for job in jobs {
                    print_job_summary(&JobSummary::from(job));
                }
            }
        }
        JobCommands::Get { id } => {
            let uuid = resolve_job_id(&client, &id).await?;
            let job = client.get_job(uuid).await?;
            print_job_details(&job);
        }
    }

    Ok(())
}

/// Print the acknowledgement of an accepted job
pub fn print_submission(submission: &JobSubmission) {
    println!("{} {}", "✓".green(), "Job submitted".bold());
    println!("  ID:       {}", submission.job_id.to_string().cyan());
    println!("  Kind:     {}", submission.kind);
    println!("  Document: {}", submission.document_path);
    println!("  Status:   {}", colorize_status(&submission.status));
}

fn print_job_summary(job: &JobSummary) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Kind:     {}", job.kind);
    println!("    Document: {}", job.document_path);
    println!("    Status:   {}", colorize_status(&job.status));
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.to_string().cyan());
    println!("  Kind:        {}", job.kind);
    println!("  Document:    {}", job.document_path);
    println!("  Status:      {}", colorize_status(&job.status));
    println!("  Created:     {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(instruction) = &job.instruction {
        println!("  Instruction: {}", instruction);
    }
    if let Some(project) = &job.project_ref {
        println!("  Project:     {}", project);
    }

    if let Some(started) = job.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = job.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }

    if let Some(output_path) = &job.output_path {
        println!("  Output:      {}", output_path.green());
    }

    if let Some(result) = &job.result {
        println!("\n{}", "Result:".bold());
        match serde_json::to_string_pretty(result) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{:?}", result),
        }
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Processing => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
