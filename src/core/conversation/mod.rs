//! Per-call conversation records.
//!
//! A [`Conversation`] lives in the [`ConversationStore`] while its call is in
//! progress and is written to blob storage exactly once when the call ends.
//! The serialized field names are the persisted document format.

mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::storage::StorageError;

pub use store::{AudioAttachment, ConversationStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to archive conversation: {0}")]
    Archive(#[from] StorageError),

    #[error("Failed to encode conversation: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Completed,
}

/// One user utterance and the reply spoken back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "user")]
    pub user_utterance: String,
    #[serde(rename = "ai")]
    pub assistant_reply: String,
}

impl Exchange {
    pub fn new(user_utterance: impl Into<String>, assistant_reply: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            user_utterance: user_utterance.into(),
            assistant_reply: assistant_reply.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "call_sid")]
    pub call_id: String,
    #[serde(rename = "start_time", with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(rename = "end_time", with = "time::serde::rfc3339::option", default)]
    pub ended_at: Option<OffsetDateTime>,
    pub exchanges: Vec<Exchange>,
    #[serde(default)]
    pub full_transcript: Option<String>,
    #[serde(rename = "audio_url", default)]
    pub audio_reference: Option<String>,
    pub status: ConversationStatus,
}

impl Conversation {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            started_at: OffsetDateTime::now_utc(),
            ended_at: None,
            exchanges: Vec::new(),
            full_transcript: None,
            audio_reference: None,
            status: ConversationStatus::Active,
        }
    }

    /// `User:` / `AI:` lines in exchange order.
    pub fn transcript(&self) -> String {
        self.exchanges
            .iter()
            .flat_map(|exchange| {
                [
                    format!("User: {}", exchange.user_utterance),
                    format!("AI: {}", exchange.assistant_reply),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The terminal copy of this record. The live record is left untouched.
    pub fn completed(&self, audio_reference: Option<String>, ended_at: OffsetDateTime) -> Self {
        Self {
            call_id: self.call_id.clone(),
            started_at: self.started_at,
            ended_at: Some(ended_at),
            exchanges: self.exchanges.clone(),
            full_transcript: Some(self.transcript()),
            audio_reference,
            status: ConversationStatus::Completed,
        }
    }
}
