//! Modify an existing project: context, plan, changes, apply
//!
//! A project that does not exist (or has no files) is valid input: the plan
//! is then made from the notes alone.
//!
//! `delete` entries are never executed. The gateway deletes by id only, so
//! they are reported under `changes_skipped` instead of being dropped.

use quill_core::domain::job::{Job, Payload};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::engine::{PipelineEngine, PipelineError};
use crate::extract::{null_as_default, parse_structured};
use crate::prompts;

/// What the planner gets to see of the existing project
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    pub project_id: String,
    pub exists: bool,
    /// Every file path, relative to the project root
    pub files: Vec<String>,
    /// Decoded contents of the files that were read, in listing order
    pub contents: Vec<(String, String)>,
}

impl ProjectContext {
    fn missing(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            ..Default::default()
        }
    }

    /// Text block embedded in the planning prompt
    pub fn render(&self, preview_chars: usize) -> String {
        if !self.exists {
            return "Project does not exist yet or has no files.".to_string();
        }

        let mut summary = format!(
            "Existing project files:\n{}\n\nFile contents:\n",
            self.files.join("\n")
        );
        for (path, content) in &self.contents {
            let shown = match content.char_indices().nth(preview_chars) {
                Some((idx, _)) => format!("{}...", &content[..idx]),
                None => content.clone(),
            };
            summary.push_str(&format!("\n--- {} ---\n{}\n", path, shown));
        }
        summary
    }
}

#[derive(Debug, Deserialize)]
struct ChangeSet {
    #[serde(default, deserialize_with = "null_as_default")]
    files: Vec<FileChange>,
}

#[derive(Debug, Deserialize)]
struct FileChange {
    #[serde(default, deserialize_with = "null_as_default")]
    path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    action: ChangeAction,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ChangeAction {
    Create,
    Modify,
    Delete,
    #[default]
    #[serde(other)]
    Unknown,
}

pub async fn run(engine: &PipelineEngine, job: &Job) -> Result<Payload, PipelineError> {
    let project_id = job
        .project_ref
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(PipelineError::MissingProjectRef)?;

    let config = engine.config();
    let layout = engine.layout();
    let project_root = layout.project_root(project_id);

    let pages = engine.load_pages(&job.document_path).await?;

    // Phase 0: context
    let context = collect_context(engine, project_id, &project_root).await;
    debug!(
        job_id = %job.id,
        exists = context.exists,
        files = context.files.len(),
        read = context.contents.len(),
        "Collected project context"
    );

    // Phase 1: plan, opaque text
    let prompt = PipelineEngine::vision_prompt(
        &pages,
        prompts::change_plan(
            job.instruction.as_deref(),
            &context.render(config.context_preview_chars),
        ),
    );
    let plan = engine
        .complete(&prompt, config.plan_max_tokens, false)
        .await?
        .text;

    // Phase 2: structured changes
    let response = engine
        .complete_text(prompts::changes(&plan, &context.files), config.changes_max_tokens)
        .await?;
    let changes: ChangeSet =
        parse_structured(&response.text).map_err(|source| PipelineError::StructuredOutput {
            phase: "changes",
            source,
        })?;

    // Phase 3: apply
    let mut applied = Vec::new();
    let mut skipped = Vec::new();
    for change in changes.files {
        if change.path.trim().is_empty() {
            warn!(job_id = %job.id, "Ignoring change without a path");
            continue;
        }
        let full_path = layout.project_file(&project_root, &change.path)?;

        match change.action {
            ChangeAction::Create | ChangeAction::Modify => {
                let content = change.content.unwrap_or_default();
                engine
                    .storage()
                    .write(&full_path, content.as_bytes(), "text/plain")
                    .await?;
                let action = if change.action == ChangeAction::Create {
                    "create"
                } else {
                    "modify"
                };
                applied.push(json!({ "path": full_path, "action": action }));
            }
            ChangeAction::Delete => {
                skipped.push(json!({
                    "path": full_path,
                    "action": "delete",
                    "reason": "delete by path is not supported",
                }));
            }
            ChangeAction::Unknown => {
                warn!(job_id = %job.id, path = %full_path, "Ignoring change with unknown action");
                skipped.push(json!({
                    "path": full_path,
                    "action": "unknown",
                    "reason": "unrecognized action",
                }));
            }
        }
    }

    info!(
        job_id = %job.id,
        project = %project_root,
        applied = applied.len(),
        skipped = skipped.len(),
        "Project changes applied"
    );

    let mut output = Payload::new();
    output.insert("project_id".into(), Value::from(project_id));
    output.insert("project_path".into(), Value::String(project_root));
    output.insert("project_existed".into(), Value::Bool(context.exists));
    output.insert("change_plan".into(), Value::String(plan));
    output.insert("changes_applied".into(), Value::Array(applied));
    output.insert("changes_skipped".into(), Value::Array(skipped));
    Ok(output)
}

/// Reads the existing project, degrading to "does not exist" on any listing error
async fn collect_context(engine: &PipelineEngine, project_id: &str, project_root: &str) -> ProjectContext {
    let config = engine.config();

    let listing = match engine.storage().list(project_root).await {
        Ok(files) if !files.is_empty() => files,
        Ok(_) => return ProjectContext::missing(project_id),
        Err(e) => {
            debug!(project = %project_root, error = %e, "Project listing failed, treating as new");
            return ProjectContext::missing(project_id);
        }
    };

    let files: Vec<String> = listing
        .iter()
        .map(|f| f.relative_to(project_root).unwrap_or(&f.path).to_string())
        .collect();

    let mut contents = Vec::new();
    for (file, relative) in listing.iter().zip(&files).take(config.context_max_files) {
        if file.size.is_some_and(|size| size > config.context_max_file_bytes) {
            debug!(path = %file.path, size = ?file.size, "Skipping large file");
            continue;
        }
        match engine.storage().fetch(&file.path).await {
            Ok(bytes) => contents.push((relative.clone(), String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) => warn!(path = %file.path, error = %e, "Failed to read project file"),
        }
    }

    ProjectContext {
        project_id: project_id.to_string(),
        exists: true,
        files,
        contents,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quill_core::domain::job::{Job, JobKind};
    use quill_storage::StorageGateway;

    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::{FixedPages, ScriptedClient, storage_with_document};

    const CHANGES: &str = r#"```json
{
    "files": [
        {"path": "src/app.py", "action": "modify", "content": "print('v2')"},
        {"path": "tests/test_app.py", "action": "create", "content": "def test(): pass"},
        {"path": "old.py", "action": "delete", "content": null}
    ]
}
```"#;

    fn job(project_ref: Option<&str>) -> Job {
        Job::new(JobKind::ModifyProject, "raw/Existing_Project/change.pdf")
            .with_project_ref(project_ref.map(str::to_string))
    }

    #[tokio::test]
    async fn test_missing_project_ref_fails_fast() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        let llm = Arc::new(ScriptedClient::new());
        let engine = PipelineEngine::new(storage, llm.clone(), Arc::new(FixedPages::new(1)));

        let result = engine.run(&job(None)).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("project_id is required"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_modifies_existing_project() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        storage.write("projects/app/src/app.py", b"print('v1')", "text/plain").await.unwrap();
        storage.write("projects/app/old.py", b"legacy", "text/plain").await.unwrap();

        let llm = Arc::new(ScriptedClient::new().reply("Plan: bump version").reply(CHANGES));
        let engine = PipelineEngine::new(storage.clone(), llm.clone(), Arc::new(FixedPages::new(2)));

        let result = engine.run(&job(Some("app"))).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output["project_existed"], true);
        assert_eq!(result.output["change_plan"], "Plan: bump version");
        assert_eq!(
            result.output["changes_applied"],
            serde_json::json!([
                {"path": "projects/app/src/app.py", "action": "modify"},
                {"path": "projects/app/tests/test_app.py", "action": "create"}
            ])
        );
        assert_eq!(result.output["changes_skipped"][0]["path"], "projects/app/old.py");

        assert_eq!(storage.fetch("projects/app/src/app.py").await.unwrap(), b"print('v2')");
        // Deletion is reported, not executed
        assert_eq!(storage.fetch("projects/app/old.py").await.unwrap(), b"legacy");

        let prompts = llm.prompts();
        assert_eq!(prompts[0].images, 2);
        assert!(prompts[0].text.contains("--- src/app.py ---\nprint('v1')"));
        assert!(prompts[1].text.contains("Existing Files:\nold.py\nsrc/app.py"));
        assert_eq!(prompts[1].max_tokens, 8192);
    }

    #[tokio::test]
    async fn test_missing_project_builds_from_notes() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        let llm = Arc::new(
            ScriptedClient::new()
                .reply("Plan: start fresh")
                .reply(r#"{"files": [{"path": "main.py", "action": "create", "content": "x = 1"}]}"#),
        );
        let engine = PipelineEngine::new(storage.clone(), llm.clone(), Arc::new(FixedPages::new(1)));

        let result = engine.run(&job(Some("ghost"))).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output["project_existed"], false);
        assert_eq!(storage.fetch("projects/ghost/main.py").await.unwrap(), b"x = 1");

        let prompts = llm.prompts();
        assert!(prompts[0].text.contains("Project does not exist yet or has no files."));
    }

    #[tokio::test]
    async fn test_unparseable_changes_fail_with_raw_text() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        let llm = Arc::new(
            ScriptedClient::new()
                .reply("Plan")
                .reply("Sorry, I cannot produce JSON today."),
        );
        let engine = PipelineEngine::new(storage.clone(), llm, Arc::new(FixedPages::new(1)));

        let result = engine.run(&job(Some("app"))).await;
        assert!(!result.success);
        assert_eq!(result.output["parse_error"], true);
        assert_eq!(result.output["truncated"], false);
        assert_eq!(result.output["raw"], "Sorry, I cannot produce JSON today.");
        assert_eq!(storage.paths().await.len(), 1);
    }

    #[tokio::test]
    async fn test_document_without_pages_fails() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        storage.write("projects/app/src/app.py", b"print('v1')", "text/plain").await.unwrap();
        let before = storage.paths().await;

        let llm = Arc::new(ScriptedClient::new().reply("Plan").reply(CHANGES));
        let engine = PipelineEngine::new(storage.clone(), llm.clone(), Arc::new(FixedPages::new(0)));

        let result = engine.run(&job(Some("app"))).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("no pages"));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(storage.paths().await, before);
        assert_eq!(storage.fetch("projects/app/src/app.py").await.unwrap(), b"print('v1')");
    }

    #[tokio::test]
    async fn test_null_fields_in_changes() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        let llm = Arc::new(ScriptedClient::new().reply("Plan").reply(
            r#"{"files": [{"path": "a.py", "action": "create", "content": "x"}, {"path": null, "action": "create"}, {"path": "b.py", "action": null}]}"#,
        ));
        let engine = PipelineEngine::new(storage.clone(), llm, Arc::new(FixedPages::new(1)));

        let result = engine.run(&job(Some("app"))).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(
            result.output["changes_applied"],
            serde_json::json!([{"path": "projects/app/a.py", "action": "create"}])
        );
        assert_eq!(result.output["changes_skipped"][0]["action"], "unknown");
        assert!(storage.fetch("projects/app/b.py").await.is_err());
    }

    #[tokio::test]
    async fn test_context_limits() {
        let storage = storage_with_document("Existing_Project/change.pdf", b"%PDF").await;
        storage.write("projects/app/a.txt", b"small", "text/plain").await.unwrap();
        storage.write("projects/app/b.bin", &[0x66, 0xff, 0x6f], "application/octet-stream").await.unwrap();
        storage.write("projects/app/c.txt", &vec![b'x'; 64], "text/plain").await.unwrap();
        storage.write("projects/app/d.txt", b"never read", "text/plain").await.unwrap();

        let engine = PipelineEngine::new(
            storage,
            Arc::new(ScriptedClient::new()),
            Arc::new(FixedPages::new(1)),
        )
        .with_config(EngineConfig {
            context_max_files: 3,
            context_max_file_bytes: 32,
            ..EngineConfig::default()
        });

        let context = collect_context(&engine, "app", "projects/app").await;
        assert!(context.exists);
        assert_eq!(context.files, vec!["a.txt", "b.bin", "c.txt", "d.txt"]);

        let read: Vec<_> = context.contents.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(read, vec!["a.txt", "b.bin"]);
        assert_eq!(context.contents[1].1, "f\u{fffd}o");
    }

    #[test]
    fn test_render_truncates_previews() {
        let context = ProjectContext {
            project_id: "app".into(),
            exists: true,
            files: vec!["a.txt".into()],
            contents: vec![("a.txt".into(), "abcdefgh".into())],
        };
        let rendered = context.render(4);
        assert!(rendered.starts_with("Existing project files:\na.txt\n"));
        assert!(rendered.contains("--- a.txt ---\nabcd...\n"));
    }
}
