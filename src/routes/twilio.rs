use std::any::Any;
use std::sync::Arc;

use axum::{
    Router,
    handler::Handler,
    response::IntoResponse,
    routing::{MethodRouter, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::core::twiml::SayVoice;
use crate::handlers::twilio::{self, CONVERSATION_APOLOGY, RECORDING_APOLOGY, WEBHOOK_APOLOGY};
use crate::state::AppState;

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// POST route whose panics still produce a TwiML apology and hangup.
fn voice_route<H, T>(
    handler: H,
    voice: &SayVoice,
    apology: &'static str,
) -> MethodRouter<Arc<AppState>>
where
    H: Handler<T, Arc<AppState>>,
    T: 'static,
{
    let voice = voice.clone();
    post(handler).layer(CatchPanicLayer::custom(
        move |panic: Box<dyn Any + Send + 'static>| {
            error!(panic = panic_message(panic.as_ref()), "Voice route panicked");
            twilio::apology(&voice, apology).into_response()
        },
    ))
}

/// Twilio webhooks. Voice routes answer with TwiML even on failure; status
/// routes answer 500 instead.
pub fn create_twilio_router(voice: &SayVoice) -> Router<Arc<AppState>> {
    let voice_routes = Router::new()
        .route(
            "/twilio/webhook",
            voice_route(twilio::incoming_call, voice, WEBHOOK_APOLOGY),
        )
        .route(
            "/twilio/conversation",
            voice_route(twilio::conversation, voice, CONVERSATION_APOLOGY),
        )
        .route(
            "/twilio/recording",
            voice_route(twilio::recording, voice, RECORDING_APOLOGY),
        );

    let status_routes = Router::new()
        .route(
            "/twilio/call_recording_complete",
            post(twilio::call_recording_complete),
        )
        .route("/twilio/call_status", post(twilio::call_status))
        .layer(CatchPanicLayer::new());

    voice_routes.merge(status_routes)
}
