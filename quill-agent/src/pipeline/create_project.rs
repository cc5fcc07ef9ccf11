//! Create project: requirements, structure, per-file generation, write-out
//!
//! A structure response that does not parse falls back to a minimal
//! skeleton so the requirements already extracted are not thrown away.
//! Files written before a later failure are kept.

use quill_core::domain::job::{Job, Payload};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::{PipelineEngine, PipelineError};
use crate::extract::{null_as_default, parse_structured, strip_code_fence};
use crate::prompts::{self, FileContext};

/// Project metadata produced by the structure phase
///
/// Fields the model sets to `null` read as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStructure {
    #[serde(default = "default_name", deserialize_with = "name_or_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub directories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<String>,
}

fn default_name() -> String {
    "new-project".to_string()
}

fn name_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_name))
}

impl ProjectStructure {
    /// Skeleton used when the model's structure cannot be parsed
    pub fn fallback() -> Self {
        Self {
            name: default_name(),
            kind: "unknown".to_string(),
            language: "python".to_string(),
            framework: None,
            directories: vec!["src".to_string()],
            files: vec!["src/main.py".to_string(), "README.md".to_string()],
        }
    }
}

pub async fn run(engine: &PipelineEngine, job: &Job) -> Result<Payload, PipelineError> {
    let config = engine.config();
    let pages = engine.load_pages(&job.document_path).await?;

    // Phase 1: requirements, kept as opaque text
    let prompt = PipelineEngine::vision_prompt(
        &pages,
        prompts::requirements(job.instruction.as_deref()),
    );
    let requirements = engine
        .complete(&prompt, config.requirements_max_tokens, false)
        .await?
        .text;

    // Phase 2: structure
    let response = engine
        .complete_text(prompts::structure(&requirements), config.structure_max_tokens)
        .await?;
    let structure = match parse_structured::<ProjectStructure>(&response.text) {
        Ok(structure) => structure,
        Err(e) => {
            warn!(job_id = %job.id, error = %e, "Structure unparseable, using default skeleton");
            ProjectStructure::fallback()
        }
    };

    // Phase 3: file contents
    let framework = structure.framework.as_deref().unwrap_or("none");
    let context = FileContext {
        name: &structure.name,
        kind: &structure.kind,
        language: &structure.language,
        framework,
        files: &structure.files,
    };
    let mut generated = Vec::with_capacity(structure.files.len());
    for path in &structure.files {
        let completion = engine
            .complete_text(
                prompts::file_content(&context, &requirements, path),
                config.file_max_tokens,
            )
            .await?;
        debug!(job_id = %job.id, file = %path, "Generated file");
        generated.push((path.clone(), strip_code_fence(&completion.text)));
    }

    // Phase 4: materialize
    let layout = engine.layout();
    let project_root = layout.project_root(&structure.name);
    let mut written = Vec::with_capacity(generated.len());
    for (path, content) in &generated {
        let full_path = layout.project_file(&project_root, path)?;
        engine
            .storage()
            .write(&full_path, content.as_bytes(), "text/plain")
            .await?;
        written.push(Value::String(full_path));
    }

    info!(
        job_id = %job.id,
        project = %project_root,
        files = written.len(),
        "Project created"
    );

    let mut output = Payload::new();
    output.insert("project_name".into(), Value::String(structure.name.clone()));
    output.insert("project_path".into(), Value::String(project_root));
    output.insert("requirements".into(), Value::String(requirements));
    output.insert(
        "structure".into(),
        serde_json::to_value(&structure).unwrap_or(Value::Null),
    );
    output.insert("files_written".into(), Value::Array(written));
    Ok(output)
}
