//! Speech-to-text adapter for finished recordings.
//!
//! Unlike streaming recognizers, the recording pipeline hands over a complete
//! audio file and waits for a single transcript. [`WhisperTranscriber`]
//! implements this against the OpenAI audio transcription API.

mod whisper;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use whisper::WhisperTranscriber;

/// Maximum upload accepted by the transcription API.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transcription request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Audio rejected: {0}")]
    InvalidAudio(String),

    #[error("Transcript was empty")]
    EmptyTranscript,
}

/// Turns a complete WAV recording into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Bytes, file_name: &str) -> Result<String, TranscriptionError>;
}
