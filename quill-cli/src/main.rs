//! Quill CLI
//!
//! Command-line interface for the Quill orchestrator: submit note jobs,
//! upload documents, fire triggers, and browse generated projects.

mod commands;
mod config;
mod id_resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill notes pipeline CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "QUILL_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    /// User id sent with every user-scoped request
    #[arg(long, env = "QUILL_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        user: cli.user,
    };

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{JobCommands, ProjectCommands};

    #[test]
    fn test_parse_job_submit() {
        let cli = Cli::try_parse_from([
            "quill",
            "--user",
            "alice",
            "job",
            "submit",
            "modify_project",
            "raw/Existing_Project/change.pdf",
            "--project",
            "todo_app",
        ])
        .unwrap();

        assert_eq!(cli.user.as_deref(), Some("alice"));
        match cli.command {
            Commands::Job {
                command:
                    JobCommands::Submit {
                        kind,
                        document_path,
                        project,
                        ..
                    },
            } => {
                assert_eq!(kind, "modify_project");
                assert_eq!(document_path, "raw/Existing_Project/change.pdf");
                assert_eq!(project.as_deref(), Some("todo_app"));
            }
            _ => panic!("expected job submit"),
        }
    }

    #[test]
    fn test_parse_upload_requires_file() {
        assert!(Cli::try_parse_from(["quill", "upload"]).is_err());
        assert!(Cli::try_parse_from(["quill", "upload", "notes.pdf", "--folder", "Notes"]).is_ok());
    }

    #[test]
    fn test_parse_project_update() {
        let cli = Cli::try_parse_from([
            "quill",
            "project",
            "update",
            "todo_app",
            "--description",
            "Chores",
        ])
        .unwrap();

        match cli.command {
            Commands::Project {
                command: ProjectCommands::Update { id, description, name, .. },
            } => {
                assert_eq!(id, "todo_app");
                assert_eq!(description.as_deref(), Some("Chores"));
                assert!(name.is_none());
            }
            _ => panic!("expected project update"),
        }
    }
}
