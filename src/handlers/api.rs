//! JSON diagnostics: health, archived conversations, live calls, probe.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Method;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::core::storage::CONVERSATIONS_PREFIX;
use crate::handlers::TwilioForm;
use crate::state::AppState;

/// Archived conversations returned by `/conversations`.
pub const RECENT_CONVERSATIONS_LIMIT: usize = 10;

pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "voice-ai-agent"}))
}

/// Most recent archived conversations.
pub async fn list_conversations(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state
        .store
        .archive()
        .list_recent(CONVERSATIONS_PREFIX, RECENT_CONVERSATIONS_LIMIT)
        .await
    {
        Ok(conversations) => {
            let count = conversations.len();
            Json(json!({"conversations": conversations, "count": count}))
        }
        Err(e) => {
            error!(route = "conversations", error = %e, "Failed to list conversations");
            Json(json!({"error": e.to_string(), "conversations": []}))
        }
    }
}

/// Calls with a live conversation record.
pub async fn active_calls(State(state): State<Arc<AppState>>) -> Json<Value> {
    let details = state.store.active_summary().await;
    let active: Vec<&String> = details.keys().collect();

    Json(json!({
        "active_calls": active,
        "count": details.len(),
        "details": details,
    }))
}

/// Connectivity probe for webhook setup.
pub async fn test_probe(method: Method, form: TwilioForm) -> Json<Value> {
    if method == Method::POST {
        info!(route = "test", method = %method, fields = ?form.keys(), "Test endpoint called");
    } else {
        info!(route = "test", method = %method, "Test endpoint called");
    }

    Json(json!({"status": "test successful", "method": method.as_str()}))
}
