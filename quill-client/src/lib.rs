//! Quill HTTP Client
//!
//! Type-safe client for the Quill orchestrator API, shared by the CLI and
//! the runner.
//!
//! User-facing calls (submissions, job lookups, uploads, projects, webhook triggers)
//! are scoped to an owner sent in the `x-user-id` header. Runner calls
//! (scheduled jobs, claim, complete) need no owner.
//!
//! # Example
//!
//! ```no_run
//! use quill_client::OrchestratorClient;
//! use quill_core::dto::job::SubmitJob;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OrchestratorClient::new("http://localhost:8080").with_owner("alice");
//!
//!     let submission = client.submit_job(SubmitJob {
//!         kind: "summarize".to_string(),
//!         document_path: "raw/Notes/week1.pdf".to_string(),
//!         instruction: None,
//!         project_ref: None,
//!         project_name: None,
//!     }).await?;
//!
//!     println!("Queued job: {}", submission.job_id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod projects;
mod storage;
mod triggers;

pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the caller identity
pub const OWNER_HEADER: &str = "x-user-id";

/// HTTP client for the Quill orchestrator API
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// Identity sent with user-scoped calls
    owner: Option<String>,
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API
    /// * `client` - A configured reqwest Client (timeouts, proxies, TLS)
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: None,
            client,
        }
    }

    /// Sets the user id sent with user-scoped calls
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        self.owner = (!owner.trim().is_empty()).then_some(owner);
        self
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the owner header, failing when no owner is configured
    fn owned(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let owner = self.owner.as_deref().ok_or(ClientError::MissingOwner)?;
        Ok(request.header(OWNER_HEADER, owner))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Orchestrator health report
    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self.client.get(self.url("/health")).send().await?;
        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OrchestratorClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/jobs"), "http://localhost:8080/jobs");
    }

    #[test]
    fn test_blank_owner_is_ignored() {
        let client = OrchestratorClient::new("http://localhost:8080").with_owner("  ");
        assert_eq!(client.owner(), None);

        let client = client.with_owner("alice");
        assert_eq!(client.owner(), Some("alice"));
    }

    #[test]
    fn test_owned_request_requires_owner() {
        let client = OrchestratorClient::new("http://localhost:8080");
        let request = client.client.get(client.url("/jobs"));
        assert!(matches!(client.owned(request), Err(ClientError::MissingOwner)));
    }

    #[test]
    fn test_owned_request_sets_header() {
        let client = OrchestratorClient::new("http://localhost:8080").with_owner("alice");
        let request = client
            .owned(client.client.get(client.url("/jobs")))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers()[OWNER_HEADER], "alice");
    }
}
