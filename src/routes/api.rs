use axum::{Router, routing::get};
use std::sync::Arc;

use crate::handlers::api;
use crate::state::AppState;

/// Health check and diagnostic routes.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/conversations", get(api::list_conversations))
        .route("/active_calls", get(api::active_calls))
        .route("/test", get(api::test_probe).post(api::test_probe))
}
