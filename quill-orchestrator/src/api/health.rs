//! Health Check API Handler

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health
/// Reports the storage backend and the active trigger mode
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "storage": state.storage.backend(),
        "trigger_mode": state.trigger_mode.as_str(),
    }))
}
