//! Shared helpers for router-level tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voice_agent_gateway::{
    ServerConfig,
    config::StorageBackend,
    core::{
        BlobStore, ChatCompletion, OpenAIChat, RecordingClient, Transcriber, WhisperTranscriber,
    },
    routes,
    state::AppState,
};

pub fn test_config(api_base_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_url: "https://agent.test".to_string(),
        google_cloud_project: "voice-ai-project".to_string(),
        gcs_bucket: "voice-agent-ai".to_string(),
        google_service_account: None,
        storage_backend: StorageBackend::Memory,
        openai_api_key: "sk-test".to_string(),
        openai_base_url: api_base_url.to_string(),
        chat_model: "gpt-4o-mini".to_string(),
        transcription_model: "whisper-1".to_string(),
        twilio_account_sid: "AC-test".to_string(),
        twilio_auth_token: "token-test".to_string(),
        twilio_voice: "Polly.Joanna".to_string(),
        twilio_language: "en-US".to_string(),
        llm_timeout_seconds: 5,
        transcription_timeout_seconds: 5,
        recording_fetch_timeout_seconds: 5,
        storage_timeout_seconds: 5,
    }
}

/// Application wired against `server` for every external HTTP API.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub fn new(server: &MockServer) -> Self {
        Self::with_archive(server, BlobStore::in_memory(Duration::from_secs(5)))
    }

    pub fn with_archive(server: &MockServer, archive: BlobStore) -> Self {
        let config = test_config(&server.uri());
        let llm: Arc<dyn ChatCompletion> = Arc::new(
            OpenAIChat::new("sk-test", server.uri(), "gpt-4o-mini", Duration::from_secs(5))
                .unwrap(),
        );
        let transcriber: Arc<dyn Transcriber> = Arc::new(
            WhisperTranscriber::new("sk-test", server.uri(), "whisper-1", Duration::from_secs(5))
                .unwrap(),
        );
        Self::with_parts(config, archive, llm, transcriber)
    }

    pub fn with_parts(
        config: ServerConfig,
        archive: BlobStore,
        llm: Arc<dyn ChatCompletion>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let recordings =
            RecordingClient::new("AC-test", "token-test", Duration::from_secs(5)).unwrap();
        let state = AppState::from_parts(config, archive, llm, transcriber, recordings);
        let router = routes::create_app(state.clone());
        Self { state, router }
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn archived(&self, key: &str) -> Option<Value> {
        let body = self.state.store.archive().get(key).await.unwrap()?;
        Some(serde_json::from_slice(&body).unwrap())
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// TwiML body of a successful voice response.
pub async fn twiml(response: Response<Body>) -> String {
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/xml"
    );
    body_string(response).await
}

pub fn chat_reply(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

pub async fn mock_chat(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(text)))
        .mount(server)
        .await;
}
