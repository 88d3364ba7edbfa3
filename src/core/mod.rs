pub mod conversation;
pub mod dialogue;
pub mod llm;
pub mod recording;
pub mod storage;
pub mod stt;
pub mod twiml;

// Re-export commonly used types for convenience
pub use conversation::{
    AudioAttachment, Conversation, ConversationStatus, ConversationStore, Exchange, StoreError,
};
pub use dialogue::DialogueHandler;
pub use llm::{ChatCompletion, ChatMessage, ChatRole, CompletionOptions, LlmError, OpenAIChat};
pub use recording::{RecordingClient, RecordingError, RecordingPipeline};
pub use storage::{BlobStore, ObjectSummary, StorageError};
pub use stt::{Transcriber, TranscriptionError, WhisperTranscriber};
pub use twiml::{Gather, SayVoice, VoiceResponse};
