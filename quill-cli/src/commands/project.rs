//! Project commands
//!
//! Every call is scoped to the configured user.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use quill_core::domain::project::ProjectChanges;
use quill_core::dto::project::CreateProject;

use crate::config::Config;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List your projects
    List {
        /// Case-insensitive filter on id, name and description
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one project
    Show {
        /// Project id (folder name)
        id: String,
    },
    /// Register a project
    Create {
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        framework: Option<String>,
    },
    /// Edit a project's details
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        framework: Option<String>,
    },
    /// Remove a project record (generated files are kept)
    Delete { id: String },
    /// List the files of one project
    Files {
        /// Project id (folder name)
        id: String,
    },
}

pub async fn handle_project_command(command: ProjectCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        ProjectCommands::List { search } => {
            let list = client.list_projects(search.as_deref()).await?;
            if list.projects.is_empty() {
                println!("{}", "No projects found.".yellow());
                return Ok(());
            }

            println!("{}", format!("Found {} project(s):", list.projects.len()).bold());
            println!();
            for project in &list.projects {
                println!("  {} {} ({})", "▸".cyan(), project.name.bold(), project.id.dimmed());
                if !project.description.is_empty() {
                    println!("    {}", project.description);
                }
                println!("    Path:  {}", project.path);
                println!("    Files: {}", project.file_count);
            }
        }
        ProjectCommands::Show { id } => {
            let detail = client.get_project(&id).await?;
            let project = &detail.project;
            println!("{}", project.name.bold());
            println!("  ID:          {}", project.id);
            println!("  Path:        {}", detail.path);
            println!("  Files:       {}", detail.file_count);
            if !project.description.is_empty() {
                println!("  Description: {}", project.description);
            }
            if !project.language.is_empty() {
                println!("  Language:    {}", project.language);
            }
            if !project.framework.is_empty() {
                println!("  Framework:   {}", project.framework);
            }
            if let Some(job_id) = project.source_job_id {
                println!("  Source job:  {}", job_id);
            }
            println!("  Updated:     {}", project.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        ProjectCommands::Create {
            name,
            description,
            language,
            framework,
        } => {
            let project = client
                .create_project(CreateProject {
                    name,
                    description,
                    language,
                    framework,
                    source_job_id: None,
                    metadata: None,
                })
                .await?;
            println!("{} Project registered: {}", "✓".green(), project.id.bold());
        }
        ProjectCommands::Update {
            id,
            name,
            description,
            language,
            framework,
        } => {
            let changes = ProjectChanges {
                name,
                description,
                language,
                framework,
                metadata: None,
            };
            if changes.is_empty() {
                anyhow::bail!("Nothing to update, pass at least one of --name, --description, --language, --framework");
            }
            let project = client.update_project(&id, changes).await?;
            println!("{} Project updated: {}", "✓".green(), project.id.bold());
        }
        ProjectCommands::Delete { id } => {
            let deleted = client.delete_project(&id).await?;
            println!("{} Project removed: {}", "✓".green(), deleted.project_id.bold());
        }
        ProjectCommands::Files { id } => {
            let files = client.project_files(&id).await?;
            println!("{}", format!("Files in {}:", files.project_id).bold());
            for file in &files.files {
                match file.size {
                    Some(size) => println!("  {} {}", file.path, format!("({} bytes)", size).dimmed()),
                    None => println!("  {}", file.path),
                }
            }
        }
    }

    Ok(())
}
