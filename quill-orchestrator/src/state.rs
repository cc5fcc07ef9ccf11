//! Shared handler state

use std::sync::Arc;

use quill_storage::SharedStorage;

use crate::config::{Config, TriggerMode};
use crate::repository::{JobRegistry, ProjectRegistry};
use crate::trigger::{Dispatcher, StorageEventTrigger, WebhookTrigger};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn JobRegistry>,
    pub projects: Arc<dyn ProjectRegistry>,
    pub storage: SharedStorage,
    pub dispatcher: Dispatcher,
    pub webhook: Arc<WebhookTrigger>,
    pub storage_events: Arc<StorageEventTrigger>,
    pub trigger_mode: TriggerMode,
    /// Owner of jobs created by storage events
    pub trigger_owner: String,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        projects: Arc<dyn ProjectRegistry>,
        storage: SharedStorage,
        config: &Config,
    ) -> Self {
        let layout = storage.layout().clone();
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry), layout.clone()),
            webhook: Arc::new(WebhookTrigger::new(layout.clone())),
            storage_events: Arc::new(StorageEventTrigger::new(layout, config.event_bucket.clone())),
            registry,
            projects,
            storage,
            trigger_mode: config.trigger_mode,
            trigger_owner: config.trigger_owner.clone(),
        }
    }
}
