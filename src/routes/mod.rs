pub mod api;
pub mod twilio;

use std::sync::Arc;

use axum::Router;
use http::{HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The complete application: diagnostics plus Twilio webhooks.
pub fn create_app(state: Arc<AppState>) -> Router {
    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let voice = state.voice().clone();

    api::create_api_router()
        .merge(twilio::create_twilio_router(&voice))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(security_headers)
}
