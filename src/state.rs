//! Shared application state handed to every route.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::conversation::ConversationStore;
use crate::core::dialogue::DialogueHandler;
use crate::core::llm::{ChatCompletion, LlmError, OpenAIChat};
use crate::core::recording::{
    RecordingClient, RecordingError, RecordingPipeline, TWILIO_MEDIA_HOST_SUFFIX,
};
use crate::core::storage::{BlobStore, StorageError};
use crate::core::stt::{Transcriber, TranscriptionError, WhisperTranscriber};
use crate::core::twiml::SayVoice;

/// Failures while building the service from configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Storage setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Chat completion setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Transcription setup failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Recording client setup failed: {0}")]
    Recording(#[from] RecordingError),
}

pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<ConversationStore>,
    pub dialogue: DialogueHandler,
    pub recordings: RecordingPipeline,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build production adapters from configuration.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, StartupError> {
        let archive = BlobStore::from_config(&config)?;

        let llm = OpenAIChat::new(
            config.openai_api_key.as_str(),
            config.openai_base_url.as_str(),
            config.chat_model.as_str(),
            config.llm_timeout(),
        )?;
        let transcriber = WhisperTranscriber::new(
            config.openai_api_key.as_str(),
            config.openai_base_url.as_str(),
            config.transcription_model.as_str(),
            config.transcription_timeout(),
        )?;
        let recordings = RecordingClient::new(
            config.twilio_account_sid.as_str(),
            config.twilio_auth_token.as_str(),
            config.recording_fetch_timeout(),
        )?
        .with_trusted_host_suffix(TWILIO_MEDIA_HOST_SUFFIX);

        info!(
            chat_model = %config.chat_model,
            transcription_model = %config.transcription_model,
            "Adapters configured"
        );

        Ok(Self::from_parts(
            config,
            archive,
            Arc::new(llm),
            Arc::new(transcriber),
            recordings,
        ))
    }

    /// Assemble state from already built adapters.
    pub fn from_parts(
        config: ServerConfig,
        archive: BlobStore,
        llm: Arc<dyn ChatCompletion>,
        transcriber: Arc<dyn Transcriber>,
        recordings: RecordingClient,
    ) -> Arc<Self> {
        let store = Arc::new(ConversationStore::new(archive));
        let voice = SayVoice::new(config.twilio_voice.as_str(), config.twilio_language.as_str());

        let dialogue = DialogueHandler::new(
            store.clone(),
            llm.clone(),
            voice.clone(),
            config.conversation_action_url(),
        );
        let recordings =
            RecordingPipeline::new(recordings, transcriber, llm, store.clone(), voice);

        Arc::new(Self {
            config,
            store,
            dialogue,
            recordings,
        })
    }

    pub fn voice(&self) -> &SayVoice {
        self.dialogue.voice()
    }
}
