//! Twilio Webhook Tests
//!
//! Drive the full router the way Twilio does: form-encoded POSTs in, TwiML
//! out. External APIs are served by wiremock and storage is in memory.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use object_store::memory::InMemory;
use object_store::throttle::{ThrottleConfig, ThrottledStore};
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{TestApp, body_string, mock_chat, test_config, twiml};
use voice_agent_gateway::core::{
    BlobStore, ChatCompletion, ChatMessage, CompletionOptions, LlmError, Transcriber,
    TranscriptionError,
};

#[tokio::test]
async fn test_incoming_call_greets_and_gathers() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let xml = twiml(app.post_form("/twilio/webhook", "CallSid=CA1&From=%2B15550100").await).await;

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(">Hi, How can I help you today?</Say>"));
    assert!(xml.contains("action=\"https://agent.test/twilio/conversation\""));
    assert!(xml.contains("speechModel=\"experimental_conversations\""));
    assert!(xml.contains(">I&apos;m listening. Please speak your question or request.</Say>"));
    assert!(!xml.contains("<Hangup/>"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_incoming_call_without_payload_still_greets() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let xml = twiml(app.post_form("/twilio/webhook", "").await).await;
    assert!(xml.contains("Hi, How can I help you today?"));
}

#[tokio::test]
async fn test_call_flow_webhook_conversation_bye() {
    let server = MockServer::start().await;
    mock_chat(&server, "Sunny and warm today.").await;
    let app = TestApp::new(&server);

    twiml(app.post_form("/twilio/webhook", "CallSid=CA1").await).await;

    let xml = twiml(
        app.post_form(
            "/twilio/conversation",
            "CallSid=CA1&SpeechResult=What%20is%20the%20weather",
        )
        .await,
    )
    .await;
    assert!(xml.contains(">Sunny and warm today.</Say>"));
    assert!(xml.contains("timeout=\"15\""));
    assert!(xml.contains(">Thanks for calling! Have a great day!</Say><Hangup/>"));

    let xml = twiml(
        app.post_form("/twilio/conversation", "CallSid=CA1&SpeechResult=bye")
            .await,
    )
    .await;
    assert!(xml.contains(">Great! Thanks for calling. Have a wonderful day!</Say><Hangup/>"));

    let stored = app.archived("conversations/CA1.json").await.unwrap();
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["call_sid"], "CA1");
    assert_eq!(stored["exchanges"].as_array().unwrap().len(), 1);
    assert_eq!(stored["exchanges"][0]["user"], "What is the weather");
    assert_eq!(stored["exchanges"][0]["ai"], "Sunny and warm today.");
    assert_eq!(
        stored["full_transcript"],
        "User: What is the weather\nAI: Sunny and warm today."
    );
    assert_eq!(app.state.store.count_active().await, 0);

    // Twilio's completed status arrives after the caller already said bye
    let response = app
        .post_form("/twilio/call_status", "CallSid=CA1&CallStatus=completed")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_conversation_sends_history_to_chat_api() {
    let server = MockServer::start().await;
    mock_chat(&server, "Noted.").await;
    let app = TestApp::new(&server);

    for utterance in ["first", "second"] {
        twiml(
            app.post_form(
                "/twilio/conversation",
                &format!("CallSid=CA2&SpeechResult={utterance}"),
            )
            .await,
        )
        .await;
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["content"], "first");
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(messages[3]["content"], "second");
    assert_eq!(body["max_tokens"], 150);
}

#[tokio::test]
async fn test_silence_closes_call() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let xml = twiml(app.post_form("/twilio/conversation", "CallSid=CA3").await).await;
    assert!(xml.contains(">I didn&apos;t hear anything. Thanks for calling, have a great day!</Say><Hangup/>"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_failure_uses_fallback_and_keeps_listening() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = TestApp::new(&server);

    let xml = twiml(
        app.post_form("/twilio/conversation", "CallSid=CA4&SpeechResult=hello")
            .await,
    )
    .await;
    assert!(xml.contains("I&apos;m having trouble processing that right now."));
    assert!(xml.contains("<Gather "));

    let history = app.state.store.get_history("CA4").await;
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].assistant_reply,
        "I'm having trouble processing that right now. Could you try asking something else?"
    );
}

struct PanickingChat;

#[async_trait]
impl ChatCompletion for PanickingChat {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: CompletionOptions,
    ) -> Result<String, LlmError> {
        panic!("chat backend exploded")
    }
}

struct SilentTranscriber;

#[async_trait]
impl Transcriber for SilentTranscriber {
    async fn transcribe(
        &self,
        _audio: bytes::Bytes,
        _file_name: &str,
    ) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::EmptyTranscript)
    }
}

#[tokio::test]
async fn test_panicking_turn_still_returns_twiml() {
    let app = TestApp::with_parts(
        test_config("http://127.0.0.1:9"),
        BlobStore::in_memory(Duration::from_secs(5)),
        Arc::new(PanickingChat),
        Arc::new(SilentTranscriber),
    );

    let xml = twiml(
        app.post_form("/twilio/conversation", "CallSid=CA5&SpeechResult=hello")
            .await,
    )
    .await;
    assert!(xml.contains(">I apologize for the technical difficulty. Please try calling again.</Say><Hangup/>"));
}

#[tokio::test]
async fn test_recording_callback_transcribes_and_replies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Recordings/RE1.wav"))
        .and(basic_auth("AC-test", "token-test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "Please call me back"})),
        )
        .mount(&server)
        .await;
    mock_chat(&server, "We will call you back soon.").await;
    let app = TestApp::new(&server);

    let form = format!(
        "CallSid=CA6&RecordingUrl={}",
        url_encode(&format!("{}/Recordings/RE1", server.uri()))
    );
    let xml = twiml(app.post_form("/twilio/recording", &form).await).await;

    assert!(xml.contains(">We will call you back soon.</Say><Pause length=\"1\"/><Hangup/>"));
    assert!(
        app.state
            .store
            .archive()
            .get("audio/CA6.wav")
            .await
            .unwrap()
            .is_some()
    );
    let history = app.state.store.get_history("CA6").await;
    assert_eq!(history[0].user_utterance, "Please call me back");
}

#[tokio::test]
async fn test_recording_callback_missing_fields() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let xml = twiml(app.post_form("/twilio/recording", "CallSid=CA7").await).await;
    assert!(xml.contains(">Sorry, there was an issue with the recording. Please try again.</Say><Hangup/>"));
}

#[tokio::test]
async fn test_call_recording_complete_archives_audio() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Recordings/RE9.wav"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFcall".to_vec()))
        .mount(&server)
        .await;
    mock_chat(&server, "Sure.").await;
    let app = TestApp::new(&server);

    twiml(
        app.post_form("/twilio/conversation", "CallSid=CA8&SpeechResult=hello")
            .await,
    )
    .await;

    let form = format!(
        "CallSid=CA8&RecordingUrl={}",
        url_encode(&format!("{}/Recordings/RE9", server.uri()))
    );
    let response = app
        .post_form("/twilio/call_recording_complete", &form)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form("/twilio/call_status", "CallSid=CA8&CallStatus=completed")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.archived("conversations/CA8.json").await.unwrap();
    assert_eq!(stored["audio_url"], "memory://recordings/CA8.wav");
}

#[tokio::test]
async fn test_call_recording_complete_failure_is_still_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let app = TestApp::new(&server);

    let form = format!(
        "CallSid=CA9&RecordingUrl={}",
        url_encode(&format!("{}/Recordings/missing", server.uri()))
    );
    let response = app
        .post_form("/twilio/call_recording_complete", &form)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post_form("/twilio/call_recording_complete", "").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_call_status_completed_finalizes() {
    let server = MockServer::start().await;
    mock_chat(&server, "Hello there.").await;
    let app = TestApp::new(&server);

    twiml(
        app.post_form("/twilio/conversation", "CallSid=CA10&SpeechResult=hi")
            .await,
    )
    .await;

    let response = app
        .post_form("/twilio/call_status", "CallSid=CA10&CallStatus=ringing")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.store.count_active().await, 1);

    let response = app
        .post_form("/twilio/call_status", "CallSid=CA10&CallStatus=completed")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.store.count_active().await, 0);

    let stored = app.archived("conversations/CA10.json").await.unwrap();
    assert_eq!(stored["status"], "completed");
}

#[tokio::test]
async fn test_call_status_unknown_call_is_ok() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let response = app
        .post_form("/twilio/call_status", "CallSid=CAnever&CallStatus=completed")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_call_status_storage_failure_is_500_and_retryable() {
    let server = MockServer::start().await;
    mock_chat(&server, "Hello there.").await;
    let slow = ThrottledStore::new(
        InMemory::new(),
        ThrottleConfig {
            wait_put_per_call: Duration::from_secs(5),
            ..Default::default()
        },
    );
    let archive = BlobStore::new(Arc::new(slow), "memory://", Duration::from_millis(50));
    let app = TestApp::with_archive(&server, archive);

    twiml(
        app.post_form("/twilio/conversation", "CallSid=CA11&SpeechResult=hi")
            .await,
    )
    .await;

    let response = app
        .post_form("/twilio/call_status", "CallSid=CA11&CallStatus=completed")
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.state.store.list_active().await, vec!["CA11".to_string()]);
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
