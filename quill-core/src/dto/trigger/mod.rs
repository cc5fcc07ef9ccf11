//! Trigger DTOs: webhook payloads and storage notifications

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dto::job::JobSubmission;

/// Direct trigger request naming a document under the protected root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub document_path: String,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub project_ref: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Object-store notification (S3 event layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    pub s3: StorageEventEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEventEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

impl StorageEventRecord {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_name: "ObjectCreated:Put".to_string(),
            s3: StorageEventEntity {
                bucket: BucketRef { name: bucket.into() },
                object: ObjectRef { key: key.into() },
            },
        }
    }
}

/// Outcome of processing one trigger event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobSubmission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_event_deserializes_s3_layout() {
        let raw = r#"{
            "Records": [{
                "eventName": "ObjectCreated:Put",
                "s3": {"bucket": {"name": "notes-bucket"}, "object": {"key": "raw/Notes/a.pdf"}}
            }]
        }"#;
        let event: StorageEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.records.len(), 1);
        assert_eq!(event.records[0].s3.bucket.name, "notes-bucket");
        assert_eq!(event.records[0].s3.object.key, "raw/Notes/a.pdf");
    }
}
