//! OpenAI audio transcription (Whisper) client.
//!
//! API Reference: https://platform.openai.com/docs/api-reference/audio/createTranscription

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::{MAX_AUDIO_BYTES, Transcriber, TranscriptionError};

const WAV_MIME_TYPE: &str = "audio/wav";

/// Simple transcription response (json format).
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Clone)]
pub struct WhisperTranscriber {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl WhisperTranscriber {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranscriptionError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            TranscriptionError::Configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn api_url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

fn network_error(e: reqwest::Error, context: &str) -> TranscriptionError {
    if e.is_timeout() {
        TranscriptionError::Timeout
    } else {
        TranscriptionError::Network(format!("{context}: {e}"))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: Bytes, file_name: &str) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::InvalidAudio(
                "recording contained no audio".to_string(),
            ));
        }
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(TranscriptionError::InvalidAudio(format!(
                "recording ({} bytes) exceeds maximum file size ({} bytes)",
                audio.len(),
                MAX_AUDIO_BYTES
            )));
        }

        info!(bytes = audio.len(), model = %self.model, "Starting audio transcription");

        let file_part = Part::stream(audio)
            .file_name(file_name.to_string())
            .mime_str(WAV_MIME_TYPE)
            .map_err(|e| TranscriptionError::Configuration(format!("Invalid MIME type: {e}")))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .http_client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(e, "Request failed"))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| network_error(e, "Failed to read response"))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&response_text)
                .map(|err| err.error.message)
                .unwrap_or(response_text);
            if status.as_u16() == 401 {
                return Err(TranscriptionError::AuthenticationFailed(message));
            }
            return Err(TranscriptionError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&response_text).map_err(|e| TranscriptionError::Provider {
                status: status.as_u16(),
                message: format!("Failed to parse response: {e}"),
            })?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }

        debug!(characters = text.len(), "Transcription completed");
        Ok(text)
    }
}
