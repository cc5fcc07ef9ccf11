//! Document command handlers
//!
//! Uploading PDFs and turning uploaded documents into jobs.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Args;
use colored::*;
use quill_core::dto::job::ExecuteRequest;
use quill_core::dto::storage::UploadRequest;
use quill_core::dto::trigger::WebhookPayload;

use super::job::print_submission;
use crate::config::Config;

/// Arguments of the `trigger` command
#[derive(Args)]
pub struct DocumentArgs {
    /// Document path under raw/; its folder decides the job kind
    pub document_path: String,

    #[arg(long)]
    pub instruction: Option<String>,

    /// Existing project to change (Existing_Project documents)
    #[arg(long)]
    pub project: Option<String>,
}

/// Upload a local PDF into `folder`
pub async fn upload(config: &Config, file: &str, folder: &str, name: Option<&str>) -> Result<()> {
    let path = Path::new(file);
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", file))?;

    let destination = destination_path(path, folder, name)?;
    let response = config
        .client()
        .upload(UploadRequest {
            path: destination,
            content_base64: STANDARD.encode(&bytes),
            mime_type: "application/pdf".to_string(),
        })
        .await?;

    println!("{} {}", "✓".green(), "Document uploaded".bold());
    println!("  Path: {}", response.path.cyan());
    println!("  Size: {} bytes", response.size);
    Ok(())
}

/// `folder/name`, with the name defaulting to the local file name
fn destination_path(file: &Path, folder: &str, name: Option<&str>) -> Result<String> {
    let name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Cannot derive a document name from {}", file.display()))?,
    };

    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return Ok(name);
    }
    Ok(format!("{}/{}", folder, name))
}

pub async fn trigger(config: &Config, args: DocumentArgs) -> Result<()> {
    let response = config
        .client()
        .trigger(WebhookPayload {
            document_path: args.document_path.clone(),
            instruction: args.instruction,
            project_ref: args.project,
            metadata: Default::default(),
        })
        .await?;

    match response.job {
        Some(job) => print_submission(&job),
        None => println!(
            "{}",
            format!("No job triggered for {}", args.document_path).yellow()
        ),
    }
    Ok(())
}

pub async fn execute(
    config: &Config,
    document_path: String,
    project_name: Option<String>,
    instruction: Option<String>,
) -> Result<()> {
    let submission = config
        .client()
        .execute(ExecuteRequest {
            document_path,
            project_name,
            instruction,
        })
        .await?;

    print_submission(&submission);
    Ok(())
}
