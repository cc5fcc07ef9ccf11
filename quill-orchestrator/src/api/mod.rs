//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod owner;
pub mod project;
pub mod storage;
pub mod trigger;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::submit_job).get(job::list_jobs))
        .route("/jobs/scheduled", get(job::list_scheduled_jobs))
        .route("/jobs/recent", get(job::list_recent_jobs))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/claim", post(job::claim_job))
        .route("/jobs/{id}/complete", post(job::complete_job))
        .route("/execute", post(job::execute))
        // Storage endpoints
        .route("/upload", post(storage::upload))
        // Project endpoints
        .route("/projects", get(project::list_projects).post(project::create_project))
        .route(
            "/projects/{id}",
            get(project::get_project)
                .put(project::update_project)
                .delete(project::delete_project),
        )
        .route("/projects/{id}/files", get(project::project_files))
        // Trigger endpoints
        .route("/trigger", post(trigger::webhook))
        .route("/events/storage", post(trigger::storage_event))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use quill_storage::{MemoryStorage, StorageGateway};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, TriggerMode};
    use crate::repository::{InMemoryJobRegistry, InMemoryProjectRegistry};

    fn app_with(config: Config) -> (Router, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let state = AppState::new(
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(InMemoryProjectRegistry::new()),
            storage.clone(),
            &config,
        );
        (create_router(state), storage)
    }

    fn app() -> Router {
        app_with(Config::default()).0
    }

    fn request(method: &str, uri: &str, owner: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header(owner::OWNER_HEADER, owner);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn submit(app: &Router, owner: &str, body: Value) -> (StatusCode, Value) {
        send(app, request("POST", "/jobs", Some(owner), Some(body))).await
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["trigger_mode"], "webhook");
    }

    #[tokio::test]
    async fn test_submit_and_get_job() {
        let app = app();
        let (status, body) = submit(
            &app,
            "alice",
            json!({"kind": "summarize", "document_path": "raw/Notes/a.pdf"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        let id = body["job_id"].as_str().unwrap().to_string();

        let (status, job) = send(&app, request("GET", &format!("/jobs/{id}"), Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["kind"], "summarize");
        assert!(job["created_at"].as_str().unwrap().contains('T'));

        let (status, body) = send(&app, request("GET", &format!("/jobs/{id}"), Some("bob"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.get("kind").is_none());

        let (status, list) = send(&app, request("GET", "/jobs", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let app = app();

        let (status, body) = submit(
            &app,
            "alice",
            json!({"kind": "translate", "document_path": "raw/Notes/a.pdf"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("translate"));

        let (status, _) = submit(
            &app,
            "alice",
            json!({"kind": "summarize", "document_path": "notes/a.pdf"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = submit(
            &app,
            "alice",
            json!({"kind": "modify_project", "document_path": "raw/Existing_Project/a.pdf"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/jobs",
                None,
                Some(json!({"kind": "summarize", "document_path": "raw/Notes/a.pdf"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let uri = format!("/jobs/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app(), request("GET", &uri, Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_runner_protocol() {
        let app = app();
        let (_, body) = submit(
            &app,
            "alice",
            json!({"kind": "summarize", "document_path": "raw/Notes/a.pdf"}),
        )
        .await;
        let id = body["job_id"].as_str().unwrap().to_string();

        let (status, scheduled) = send(&app, request("GET", "/jobs/scheduled", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scheduled.as_array().unwrap().len(), 1);

        let claim = json!({"runner_id": "runner-1"});
        let (status, job) = send(
            &app,
            request("POST", &format!("/jobs/{id}/claim"), None, Some(claim.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["status"], "processing");

        let (status, _) = send(
            &app,
            request("POST", &format!("/jobs/{id}/claim"), None, Some(claim)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let complete = json!({
            "runner_id": "runner-1",
            "result": {"success": true, "output": {"output_path": "notes/Notes/a.md"}, "error": null}
        });
        let (status, job) = send(
            &app,
            request("POST", &format!("/jobs/{id}/complete"), None, Some(complete)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["status"], "completed");
        assert_eq!(job["output_path"], "notes/Notes/a.md");
    }

    #[tokio::test]
    async fn test_execute_creates_infer_action_job() {
        let app = app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/execute",
                Some("alice"),
                Some(json!({"document_path": "raw/Create_Project/app.pdf", "project_name": "my app"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "infer_action");
    }

    #[tokio::test]
    async fn test_webhook_trigger() {
        let app = app();

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/trigger",
                Some("alice"),
                Some(json!({"document_path": "raw/Create_Project/idea.pdf", "instruction": "use rust"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["triggered"], true);
        assert_eq!(body["job"]["kind"], "create_project");

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/trigger",
                Some("alice"),
                Some(json!({"document_path": "uploads/idea.pdf"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/trigger",
                Some("alice"),
                Some(json!({"document_path": "raw/Drafts/idea.pdf"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Unknown mode folder"));
    }

    #[tokio::test]
    async fn test_storage_event_uses_trigger_owner() {
        let app = app();
        let event = json!({"Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {"bucket": {"name": "notes"}, "object": {"key": "raw/Notes/a.pdf"}}
        }]});

        let (status, body) = send(&app, request("POST", "/events/storage", None, Some(event))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["triggered"], true);

        let (_, list) = send(&app, request("GET", "/jobs", Some("system"), None)).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let skipped = json!({"Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {"bucket": {"name": "notes"}, "object": {"key": "projects/a/readme.md"}}
        }]});
        let (status, body) = send(&app, request("POST", "/events/storage", None, Some(skipped))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["triggered"], false);
    }

    #[tokio::test]
    async fn test_triggers_disabled() {
        let config = Config {
            trigger_mode: TriggerMode::None,
            ..Config::default()
        };
        let (app, _) = app_with(config);
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/trigger",
                Some("alice"),
                Some(json!({"document_path": "raw/Notes/a.pdf"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload() {
        let (status, body) = send(
            &app(),
            request(
                "POST",
                "/upload",
                Some("alice"),
                Some(json!({"path": "Notes/week 1.pdf", "content_base64": "JVBERi0xLjc="})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["path"], "raw/Notes/week_1.pdf");
        assert_eq!(body["size"], 8);
    }

    #[tokio::test]
    async fn test_projects_are_owner_scoped() {
        let (app, storage) = app_with(Config::default());

        let (status, body) = send(
            &app,
            request("POST", "/projects", Some("alice"), Some(json!({"name": "todo app", "language": "python"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "todo_app");

        let (status, _) = send(
            &app,
            request("POST", "/projects", Some("bob"), Some(json!({"name": "todo app"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        storage
            .write("projects/todo_app/main.py", b"print()", "text/plain")
            .await
            .unwrap();

        let (status, body) = send(&app, request("GET", "/projects", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["projects"][0]["id"], "todo_app");
        assert_eq!(body["projects"][0]["file_count"], 1);

        let (status, body) = send(&app, request("GET", "/projects", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["projects"], json!([]));

        let (status, body) = send(&app, request("GET", "/projects/todo_app/files", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"][0]["path"], "projects/todo_app/main.py");

        let (status, body) = send(&app, request("GET", "/projects/todo_app/files", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.get("files").is_none());

        let (status, _) = send(&app, request("GET", "/projects/ghost/files", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, request("GET", "/projects/todo_app", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "python");
        assert_eq!(body["path"], "projects/todo_app");

        let (status, _) = send(
            &app,
            request("PUT", "/projects/todo_app", Some("bob"), Some(json!({"name": "mine"}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            request("PUT", "/projects/todo_app", Some("alice"), Some(json!({"owner": "bob"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request("PUT", "/projects/todo_app", Some("alice"), Some(json!({"description": "Chores"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Chores");

        let (status, _) = send(&app, request("DELETE", "/projects/todo_app", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, request("DELETE", "/projects/todo_app", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);
        assert_eq!(storage.fetch("projects/todo_app/main.py").await.unwrap(), b"print()");

        let (status, _) = send(&app, request("GET", "/projects/todo_app", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_completed_project_job_is_registered_for_its_owner() {
        let app = app();
        let (_, body) = submit(
            &app,
            "alice",
            json!({"kind": "create_project", "document_path": "raw/Create_Project/todo.pdf"}),
        )
        .await;
        let id = body["job_id"].as_str().unwrap().to_string();

        let claim = json!({"runner_id": "runner-1"});
        send(&app, request("POST", &format!("/jobs/{id}/claim"), None, Some(claim))).await;
        let complete = json!({
            "runner_id": "runner-1",
            "result": {
                "success": true,
                "output": {"project_name": "todo cli", "project_path": "projects/todo_cli"},
                "error": null
            }
        });
        let (status, _) = send(
            &app,
            request("POST", &format!("/jobs/{id}/complete"), None, Some(complete)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, request("GET", "/projects", Some("alice"), None)).await;
        assert_eq!(body["projects"][0]["id"], "todo_cli");
        assert_eq!(body["projects"][0]["name"], "todo cli");

        let (status, _) = send(&app, request("GET", "/projects/todo_cli/files", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
