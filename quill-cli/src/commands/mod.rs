//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod document;
mod job;
mod project;

pub use document::DocumentArgs;
pub use job::JobCommands;
pub use project::ProjectCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Upload a PDF into a mode folder
    Upload {
        /// Local PDF file
        file: String,

        /// Mode folder (Notes, Create_Project, Existing_Project)
        #[arg(long, default_value = "Notes")]
        folder: String,

        /// Name to store the document under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Fire the webhook trigger for an uploaded document
    Trigger(DocumentArgs),
    /// Infer what the notes ask for and generate a project
    Execute {
        /// Document path under raw/
        document_path: String,

        /// Project folder name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        instruction: Option<String>,
    },
    /// Your projects and their files
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Check orchestrator health
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Upload { file, folder, name } => {
            document::upload(config, &file, &folder, name.as_deref()).await
        }
        Commands::Trigger(args) => document::trigger(config, args).await,
        Commands::Execute {
            document_path,
            name,
            instruction,
        } => document::execute(config, document_path, name, instruction).await,
        Commands::Project { command } => project::handle_project_command(command, config).await,
        Commands::Health => health(config).await,
    }
}

async fn health(config: &Config) -> Result<()> {
    let report = config.client().health().await?;
    println!("{} {}", "✓".green(), "Orchestrator is healthy".bold());
    if let Some(storage) = report.get("storage").and_then(|v| v.as_str()) {
        println!("  Storage:      {}", storage);
    }
    if let Some(mode) = report.get("trigger_mode").and_then(|v| v.as_str()) {
        println!("  Trigger mode: {}", mode);
    }
    Ok(())
}
