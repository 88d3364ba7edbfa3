//! Server Startup Tests
//!
//! Building the application from configuration, without any network access.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use tower::util::ServiceExt;

use common::test_config;
use voice_agent_gateway::{routes, state::AppState};

#[tokio::test]
async fn test_app_state_from_config_with_memory_storage() {
    let config = test_config("https://api.openai.com/v1");

    let app_state = AppState::new(config).unwrap();
    assert_eq!(app_state.config.chat_model, "gpt-4o-mini");
    assert_eq!(app_state.store.count_active().await, 0);

    let app = routes::create_app(app_state);
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_configured_voice_is_used_in_twiml() {
    let mut config = test_config("https://api.openai.com/v1");
    config.twilio_voice = "Polly.Matthew".to_string();
    config.twilio_language = "en-GB".to_string();

    let app = routes::create_app(AppState::new(config).unwrap());
    let request = Request::builder()
        .method("POST")
        .uri("/twilio/webhook")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let body = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("voice=\"Polly.Matthew\" language=\"en-GB\""));
}

#[tokio::test]
async fn test_production_recording_client_refuses_foreign_hosts() {
    let server = wiremock::MockServer::start().await;
    let app_state = AppState::new(test_config(&server.uri())).unwrap();

    let response = app_state
        .recordings
        .handle(Some("CA1"), Some(&format!("{}/Recordings/RE1", server.uri())))
        .await;

    assert_eq!(
        response.spoken(),
        vec!["Sorry, I couldn't process your message. Goodbye."]
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}
