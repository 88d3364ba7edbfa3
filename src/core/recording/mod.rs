//! Recording callbacks.
//!
//! Two flows live here. The single-shot pipeline answers a recorded voice
//! message: download, store, transcribe, reply, hang up. The whole-call
//! archive stores the recording Twilio produces once a call ends and links
//! it to the call's conversation record.

mod client;

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::conversation::{AudioAttachment, ConversationStore, StoreError};
use crate::core::dialogue::SYSTEM_PROMPT;
use crate::core::llm::{ChatCompletion, ChatMessage, CompletionOptions};
use crate::core::storage::{
    BlobStore, StorageError, WAV_CONTENT_TYPE, audio_key, is_valid_call_id, recording_key,
};
use crate::core::stt::Transcriber;
use crate::core::twiml::{SayVoice, VoiceResponse};

pub use client::RecordingClient;

/// Host suffix Twilio serves recording media from.
pub const TWILIO_MEDIA_HOST_SUFFIX: &str = "twilio.com";

pub const MISSING_RECORDING_REPLY: &str =
    "Sorry, there was an issue with the recording. Please try again.";
pub const RECORDING_FAILED_REPLY: &str = "Sorry, I couldn't process your message. Goodbye.";
pub const TRANSCRIPTION_FALLBACK: &str =
    "Hello! I received your voice message. How can I help you today?";

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recording URL: {0}")]
    InvalidUrl(String),

    #[error("Recording host is not trusted: {0}")]
    UntrustedHost(String),

    #[error("Recording download timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Recording download failed with HTTP {0}")]
    Http(u16),

    #[error("Recording was empty")]
    Empty,

    #[error("Failed to store recording: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to link recording to conversation: {0}")]
    Store(#[from] StoreError),
}

fn completion_fallback(transcript: &str) -> String {
    format!("I heard you say: {transcript}. Thank you for your message!")
}

pub struct RecordingPipeline {
    recordings: RecordingClient,
    transcriber: Arc<dyn Transcriber>,
    llm: Arc<dyn ChatCompletion>,
    store: Arc<ConversationStore>,
    voice: SayVoice,
}

impl RecordingPipeline {
    pub fn new(
        recordings: RecordingClient,
        transcriber: Arc<dyn Transcriber>,
        llm: Arc<dyn ChatCompletion>,
        store: Arc<ConversationStore>,
        voice: SayVoice,
    ) -> Self {
        Self {
            recordings,
            transcriber,
            llm,
            store,
            voice,
        }
    }

    fn archive(&self) -> &BlobStore {
        self.store.archive()
    }

    fn apology(&self, text: &str) -> VoiceResponse {
        VoiceResponse::new(self.voice.clone()).say(text).hangup()
    }

    /// Answer a recorded voice message.
    pub async fn handle(
        &self,
        call_id: Option<&str>,
        recording_url: Option<&str>,
    ) -> VoiceResponse {
        let call_id = call_id.map(str::trim).filter(|id| is_valid_call_id(id));
        let recording_url = recording_url.map(str::trim).filter(|url| !url.is_empty());
        let (Some(call_id), Some(recording_url)) = (call_id, recording_url) else {
            error!(
                has_call_sid = call_id.is_some(),
                has_recording_url = recording_url.is_some(),
                "Recording callback missing required parameters"
            );
            return self.apology(MISSING_RECORDING_REPLY);
        };

        info!(call_sid = %call_id, "Processing recording");

        let audio = match self.recordings.fetch_wav(recording_url).await {
            Ok(audio) => audio,
            Err(e) => {
                error!(call_sid = %call_id, error = %e, "Failed to download recording");
                return self.apology(RECORDING_FAILED_REPLY);
            }
        };

        let audio_reference = match self.store_audio(call_id, &audio).await {
            Ok(reference) => Some(reference),
            Err(e) => {
                error!(call_sid = %call_id, error = %e, "Failed to store recording audio");
                None
            }
        };

        let transcript = match self
            .transcriber
            .transcribe(audio, &format!("{call_id}.wav"))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(call_sid = %call_id, error = %e, "Transcription failed");
                TRANSCRIPTION_FALLBACK.to_string()
            }
        };

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(transcript.as_str()),
        ];
        let reply = match self
            .llm
            .complete(&messages, CompletionOptions::default())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(call_sid = %call_id, error = %e, "Chat completion failed");
                completion_fallback(&transcript)
            }
        };

        let exchanges = self
            .store
            .append(call_id, transcript.as_str(), reply.as_str())
            .await;
        if let Some(reference) = audio_reference {
            if let Err(e) = self.store.attach_audio(call_id, reference).await {
                warn!(call_sid = %call_id, error = %e, "Failed to attach audio to conversation");
            }
        }
        info!(call_sid = %call_id, exchanges, "Recorded voice message exchange");

        VoiceResponse::new(self.voice.clone())
            .say(reply)
            .pause(1)
            .hangup()
    }

    async fn store_audio(&self, call_id: &str, audio: &bytes::Bytes) -> Result<String, StorageError> {
        let key = audio_key(call_id)?;
        self.archive()
            .put(&key, audio.clone(), WAV_CONTENT_TYPE)
            .await
    }

    /// Store the finished whole-call recording and link it to the call.
    pub async fn archive_call_recording(
        &self,
        call_id: &str,
        recording_url: &str,
    ) -> Result<(String, AudioAttachment), RecordingError> {
        let key = recording_key(call_id)?;
        let audio = self.recordings.fetch_wav(recording_url).await?;
        let reference = self.archive().put(&key, audio, WAV_CONTENT_TYPE).await?;
        let attachment = self.store.attach_audio(call_id, reference.as_str()).await?;

        info!(
            call_sid = %call_id,
            location = %reference,
            attachment = ?attachment,
            "Stored call recording"
        );
        Ok((reference, attachment))
    }
}
