//! Infer action: one streamed call that turns notes into a whole project
//!
//! The response is large, so it is requested with streaming and a high
//! token ceiling. A response that stopped on `max_tokens` and does not
//! parse is reported as truncated rather than as malformed.

use quill_core::domain::job::{Job, Payload};
use quill_core::layout::{DEFAULT_PROJECT_NAME, sanitize_name};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::{PipelineEngine, PipelineError};
use crate::extract::{null_as_default, parse_structured};
use crate::prompts;

#[derive(Debug, Deserialize)]
struct GeneratedProject {
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    tech_stack: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    files: Vec<GeneratedFile>,
}

/// A `null` path or content marks an entry the model gave up on
#[derive(Debug, Deserialize)]
struct GeneratedFile {
    #[serde(default, deserialize_with = "null_as_default")]
    path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    content: String,
}

pub async fn run(engine: &PipelineEngine, job: &Job) -> Result<Payload, PipelineError> {
    let config = engine.config();
    let layout = engine.layout();

    let project_name = job
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_PROJECT_NAME);
    let project_root = layout.project_root(project_name);

    let pages = engine.load_pages(&job.document_path).await?;
    let prompt = PipelineEngine::vision_prompt(
        &pages,
        prompts::infer_action(project_name, job.instruction.as_deref()),
    );
    let completion = engine
        .complete(&prompt, config.infer_max_tokens, true)
        .await?;

    let project: GeneratedProject = match parse_structured(&completion.text) {
        Ok(project) => project,
        Err(source) if completion.stop_reason.is_truncated() => {
            warn!(job_id = %job.id, chars = completion.text.len(), "Generation hit the token ceiling");
            return Err(PipelineError::TruncatedGeneration {
                phase: "infer_action",
                source,
            });
        }
        Err(source) => {
            return Err(PipelineError::StructuredOutput {
                phase: "infer_action",
                source,
            });
        }
    };

    let mut created = Vec::with_capacity(project.files.len());
    for file in &project.files {
        if file.path.trim().is_empty() || file.content.is_empty() {
            debug!(job_id = %job.id, path = %file.path, "Skipping empty generated file");
            continue;
        }
        let full_path = layout.project_file(&project_root, &file.path)?;
        engine
            .storage()
            .write(&full_path, file.content.as_bytes(), "text/plain")
            .await?;
        created.push(Value::String(full_path));
    }

    info!(
        job_id = %job.id,
        project = %project_root,
        files = created.len(),
        "Project inferred"
    );

    let mut output = Payload::new();
    output.insert("project_name".into(), Value::String(sanitize_name(project_name)));
    output.insert("project_path".into(), Value::String(project_root));
    output.insert("description".into(), Value::String(project.description));
    output.insert("tech_stack".into(), Value::from(project.tech_stack));
    output.insert("features".into(), Value::from(project.features));
    output.insert("files_created".into(), Value::Array(created));
    output.insert(
        "stop_reason".into(),
        Value::from(completion.stop_reason.as_str()),
    );
    Ok(output)
}
