//! Storage event trigger
//!
//! Accepts object-created notifications in the S3 `Records` layout. The
//! first record that passes the bucket filter and names a document under the
//! protected root wins; the rest of the batch is ignored.

use async_trait::async_trait;
use quill_core::domain::trigger::TriggerContext;
use quill_core::dto::trigger::{StorageEvent, StorageEventRecord};
use quill_core::layout::StorageLayout;
use serde_json::Value;

use super::{Trigger, TriggerError, context_from_path, is_candidate};

pub struct StorageEventTrigger {
    layout: StorageLayout,
    bucket_filter: Option<String>,
}

impl StorageEventTrigger {
    /// # Arguments
    /// * `bucket_filter` - When set, records from other buckets are ignored
    pub fn new(layout: StorageLayout, bucket_filter: Option<String>) -> Self {
        Self {
            layout,
            bucket_filter,
        }
    }

    fn first_match<'a>(&self, event: &'a StorageEvent) -> Option<&'a StorageEventRecord> {
        event.records.iter().find(|record| {
            let bucket_ok = self
                .bucket_filter
                .as_deref()
                .is_none_or(|bucket| record.s3.bucket.name == bucket);
            bucket_ok && is_candidate(&self.layout, &record.s3.object.key)
        })
    }
}

#[async_trait]
impl Trigger for StorageEventTrigger {
    type Event = StorageEvent;

    fn name(&self) -> &'static str {
        "storage_event"
    }

    async fn should_trigger(&self, event: &StorageEvent) -> bool {
        self.first_match(event).is_some()
    }

    async fn extract_context(&self, event: &StorageEvent) -> Result<TriggerContext, TriggerError> {
        let record = self.first_match(event).ok_or(TriggerError::NoMatch)?;

        let mut context = context_from_path(&self.layout, &record.s3.object.key)?;
        context
            .metadata
            .insert("bucket".into(), Value::from(record.s3.bucket.name.as_str()));
        context
            .metadata
            .insert("event_name".into(), Value::from(record.event_name.as_str()));
        Ok(context)
    }
}
