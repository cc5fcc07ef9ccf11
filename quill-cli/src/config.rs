//! Configuration module
//!
//! Orchestrator URL and the identity the CLI acts as.

use quill_client::OrchestratorClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
    /// User id for user-scoped calls; those calls fail without it
    pub user: Option<String>,
}

impl Config {
    /// Client for the configured orchestrator, acting as the configured user
    pub fn client(&self) -> OrchestratorClient {
        let client = OrchestratorClient::new(&self.orchestrator_url);
        match &self.user {
            Some(user) => client.with_owner(user),
            None => client,
        }
    }
}
