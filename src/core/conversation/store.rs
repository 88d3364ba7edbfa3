//! Process-wide table of live conversations, keyed by call id.
//!
//! Each call owns an async mutex so that append and finalize on the same id
//! are serialized, including across the durable write. A finalized slot is
//! marked closed before it leaves the table; an append that raced onto the
//! old slot sees the mark and retries on a fresh one.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Conversation, Exchange, StoreError};
use crate::core::storage::{BlobStore, JSON_CONTENT_TYPE, conversation_key};

#[derive(Default)]
struct CallSlot {
    conversation: Option<Conversation>,
    closed: bool,
}

/// Where an audio reference ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAttachment {
    /// Set on the live record; written when the call is finalized.
    Live,
    /// Patched into the already archived document.
    Archived,
    /// Stored, but the call has neither a live nor an archived record.
    Unlinked,
}

pub struct ConversationStore {
    calls: DashMap<String, Arc<Mutex<CallSlot>>>,
    archive: BlobStore,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("calls", &self.calls.len())
            .field("archive", &self.archive)
            .finish()
    }
}

impl ConversationStore {
    pub fn new(archive: BlobStore) -> Self {
        Self {
            calls: DashMap::new(),
            archive,
        }
    }

    pub fn archive(&self) -> &BlobStore {
        &self.archive
    }

    fn slot(&self, call_id: &str) -> Option<Arc<Mutex<CallSlot>>> {
        self.calls.get(call_id).map(|entry| entry.value().clone())
    }

    /// Record one exchange, creating the conversation on first use.
    ///
    /// Returns the number of exchanges now recorded for the call.
    pub async fn append(
        &self,
        call_id: &str,
        user_utterance: impl Into<String>,
        assistant_reply: impl Into<String>,
    ) -> usize {
        let exchange = Exchange::new(user_utterance, assistant_reply);

        loop {
            let slot = self
                .calls
                .entry(call_id.to_string())
                .or_default()
                .value()
                .clone();
            let mut guard = slot.lock().await;
            if guard.closed {
                continue;
            }

            let conversation = guard.conversation.get_or_insert_with(|| {
                info!(call_sid = %call_id, "Starting conversation");
                Conversation::new(call_id)
            });
            conversation.exchanges.push(exchange);
            let count = conversation.exchanges.len();

            debug!(call_sid = %call_id, exchanges = count, "Recorded exchange");
            return count;
        }
    }

    /// Complete the call: archive the record, then drop it from the table.
    ///
    /// Returns `Ok(None)` when the call has no live record, including when a
    /// concurrent finalize already won. When the archive write fails the
    /// record stays live and active so a later terminal signal can retry.
    pub async fn finalize(
        &self,
        call_id: &str,
        audio_reference: Option<String>,
    ) -> Result<Option<Conversation>, StoreError> {
        let Some(slot) = self.slot(call_id) else {
            warn!(call_sid = %call_id, "Finalize requested for unknown call");
            return Ok(None);
        };

        let mut guard = slot.lock().await;
        if guard.closed {
            debug!(call_sid = %call_id, "Call already finalized");
            return Ok(None);
        }
        let Some(live) = guard.conversation.as_ref() else {
            warn!(call_sid = %call_id, "Finalize requested for call with no exchanges");
            return Ok(None);
        };

        let audio_reference = audio_reference.or_else(|| live.audio_reference.clone());
        let completed = live.completed(audio_reference, OffsetDateTime::now_utc());

        let key = conversation_key(call_id)?;
        let body = serde_json::to_vec_pretty(&completed)?;
        let location = self.archive.put(&key, body, JSON_CONTENT_TYPE).await?;

        guard.closed = true;
        guard.conversation = None;
        self.calls
            .remove_if(call_id, |_, current| Arc::ptr_eq(current, &slot));
        drop(guard);

        info!(
            call_sid = %call_id,
            exchanges = completed.exchanges.len(),
            location = %location,
            "Conversation archived"
        );
        Ok(Some(completed))
    }

    /// Exchanges recorded so far, oldest first. Empty for unknown calls.
    pub async fn get_history(&self, call_id: &str) -> Vec<Exchange> {
        self.snapshot(call_id)
            .await
            .map(|conversation| conversation.exchanges)
            .unwrap_or_default()
    }

    /// Copy of the live record, if the call has one.
    pub async fn snapshot(&self, call_id: &str) -> Option<Conversation> {
        let slot = self.slot(call_id)?;
        let guard = slot.lock().await;
        if guard.closed {
            return None;
        }
        guard.conversation.clone()
    }

    /// Call ids with at least one recorded exchange, sorted.
    pub async fn list_active(&self) -> Vec<String> {
        self.active_summary().await.into_keys().collect()
    }

    pub async fn count_active(&self) -> usize {
        self.active_summary().await.len()
    }

    /// Call id to exchange count for every live conversation.
    pub async fn active_summary(&self) -> BTreeMap<String, usize> {
        let slots: Vec<_> = self
            .calls
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut summary = BTreeMap::new();
        for (call_id, slot) in slots {
            let guard = slot.lock().await;
            if guard.closed {
                continue;
            }
            if let Some(conversation) = &guard.conversation {
                summary.insert(call_id, conversation.exchanges.len());
            }
        }
        summary
    }

    /// Associate an audio object with a call, wherever its record currently is.
    pub async fn attach_audio(
        &self,
        call_id: &str,
        reference: impl Into<String>,
    ) -> Result<AudioAttachment, StoreError> {
        let reference = reference.into();

        if let Some(slot) = self.slot(call_id) {
            let mut guard = slot.lock().await;
            if !guard.closed {
                if let Some(conversation) = guard.conversation.as_mut() {
                    conversation.audio_reference = Some(reference);
                    return Ok(AudioAttachment::Live);
                }
            }
        }

        let key = conversation_key(call_id)?;
        match self.archive.get(&key).await? {
            Some(body) => {
                let mut archived: Conversation = serde_json::from_slice(&body)?;
                archived.audio_reference = Some(reference);
                let body = serde_json::to_vec_pretty(&archived)?;
                self.archive.put(&key, body, JSON_CONTENT_TYPE).await?;
                Ok(AudioAttachment::Archived)
            }
            None => {
                warn!(
                    call_sid = %call_id,
                    reference = %reference,
                    "No conversation to link audio to"
                );
                Ok(AudioAttachment::Unlinked)
            }
        }
    }
}
