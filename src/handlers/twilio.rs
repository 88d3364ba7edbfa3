//! Twilio voice and status webhooks.
//!
//! Voice routes always answer with a TwiML document. Status routes answer
//! with a bare status code.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use tracing::{error, info, warn};

use crate::core::twiml::{SayVoice, VoiceResponse};
use crate::errors::app_error::AppResult;
use crate::handlers::TwilioForm;
use crate::state::AppState;

pub const WEBHOOK_APOLOGY: &str = "Sorry, an error occurred. Goodbye.";
pub const CONVERSATION_APOLOGY: &str =
    "I apologize for the technical difficulty. Please try calling again.";
pub const RECORDING_APOLOGY: &str = "Sorry, I couldn't process your message. Goodbye.";

/// Incoming call: greet the caller and start listening.
pub async fn incoming_call(State(state): State<Arc<AppState>>, form: TwilioForm) -> VoiceResponse {
    info!(
        route = "webhook",
        call_sid = form.call_sid().unwrap_or_default(),
        from = form.get("From").unwrap_or_default(),
        "Incoming call"
    );
    state.dialogue.greeting()
}

/// One gathered speech result.
pub async fn conversation(State(state): State<Arc<AppState>>, form: TwilioForm) -> VoiceResponse {
    let call_sid = form.call_sid().unwrap_or_default();
    info!(route = "conversation", call_sid, fields = ?form.keys(), "Processing conversation turn");

    state
        .dialogue
        .handle_turn(call_sid, form.get("SpeechResult"))
        .await
}

/// A recorded voice message is ready.
pub async fn recording(State(state): State<Arc<AppState>>, form: TwilioForm) -> VoiceResponse {
    info!(route = "recording", fields = ?form.keys(), "Processing recording callback");

    state
        .recordings
        .handle(form.call_sid(), form.get("RecordingUrl"))
        .await
}

/// The whole-call recording is ready. Failures are logged; Twilio always
/// gets 200 so it does not retry.
pub async fn call_recording_complete(
    State(state): State<Arc<AppState>>,
    form: TwilioForm,
) -> StatusCode {
    let call_sid = form.call_sid();
    let recording_url = form.get("RecordingUrl");
    info!(
        route = "call_recording_complete",
        call_sid = call_sid.unwrap_or_default(),
        recording_url = recording_url.unwrap_or_default(),
        "Call recording completed"
    );

    if let (Some(call_sid), Some(recording_url)) = (call_sid, recording_url) {
        if let Err(e) = state
            .recordings
            .archive_call_recording(call_sid, recording_url)
            .await
        {
            error!(call_sid, error = %e, "Failed to store call recording");
        }
    }

    StatusCode::OK
}

/// Call progress notification. A `completed` call is finalized and archived.
pub async fn call_status(
    State(state): State<Arc<AppState>>,
    form: TwilioForm,
) -> AppResult<StatusCode> {
    let call_sid = form.call_sid().unwrap_or_default();
    let call_status = form.get("CallStatus").unwrap_or_default();
    info!(route = "call_status", call_sid, call_status, "Call status update");

    if call_status == "completed" {
        match state.store.finalize(call_sid, None).await? {
            Some(conversation) => info!(
                call_sid,
                exchanges = conversation.exchanges.len(),
                "Saved conversation for completed call"
            ),
            None => warn!(call_sid, "No conversation data for completed call"),
        }
    }

    Ok(StatusCode::OK)
}

/// Apology served when a voice route panics.
pub fn apology(voice: &SayVoice, text: &str) -> VoiceResponse {
    VoiceResponse::new(voice.clone()).say(text).hangup()
}
