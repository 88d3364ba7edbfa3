//! One speech turn of a phone conversation.
//!
//! Twilio posts each recognized utterance to `/twilio/conversation`. The
//! handler either ends the call (termination phrase or silence) or asks the
//! chat model for a reply using the call's history, records the exchange
//! and gathers the next utterance.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::conversation::{ConversationStore, Exchange};
use crate::core::llm::{ChatCompletion, ChatMessage, CompletionOptions};
use crate::core::storage::is_valid_call_id;
use crate::core::twiml::{Gather, SayVoice, VoiceResponse};

pub const SYSTEM_PROMPT: &str = "You are a helpful voice AI assistant having a natural phone conversation. 
Be conversational and engaging - respond naturally like a human would.
Keep responses under 80 words and sound natural for speech.
Don't always ask questions - sometimes just respond and let the conversation flow naturally.
Be friendly and helpful. Avoid sounding like a Q&A session or robotic assistant.";

pub const GREETING: &str = "Hi, How can I help you today?";
pub const LISTENING_PROMPT: &str = "I'm listening. Please speak your question or request.";
pub const GOODBYE_REPLY: &str = "Great! Thanks for calling. Have a wonderful day!";
pub const SILENCE_REPLY: &str = "I didn't hear anything. Thanks for calling, have a great day!";
pub const COMPLETION_FALLBACK: &str =
    "I'm having trouble processing that right now. Could you try asking something else?";
pub const CLOSING_REPLY: &str = "Thanks for calling! Have a great day!";

/// Seconds to wait for the caller before the closing line.
pub const FOLLOW_UP_TIMEOUT_SECONDS: u32 = 15;

const TERMINATION_PHRASES: &[&str] = &[
    "no",
    "nope",
    "nothing",
    "bye",
    "goodbye",
    "that's all",
    "no thanks",
];

/// Exact match after lowercasing and trimming; "no way" is a normal turn.
pub fn is_termination_phrase(utterance: &str) -> bool {
    let normalized = utterance.trim().to_lowercase();
    TERMINATION_PHRASES.contains(&normalized.as_str())
}

/// System instruction, prior exchanges as user/assistant pairs, then the
/// new utterance.
pub fn build_prompt(history: &[Exchange], utterance: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    for exchange in history {
        messages.push(ChatMessage::user(exchange.user_utterance.as_str()));
        messages.push(ChatMessage::assistant(exchange.assistant_reply.as_str()));
    }
    messages.push(ChatMessage::user(utterance));
    messages
}

pub struct DialogueHandler {
    store: Arc<ConversationStore>,
    llm: Arc<dyn ChatCompletion>,
    voice: SayVoice,
    action_url: String,
}

impl DialogueHandler {
    pub fn new(
        store: Arc<ConversationStore>,
        llm: Arc<dyn ChatCompletion>,
        voice: SayVoice,
        action_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            llm,
            voice,
            action_url: action_url.into(),
        }
    }

    pub fn voice(&self) -> &SayVoice {
        &self.voice
    }

    /// An empty document using the configured voice.
    pub fn response(&self) -> VoiceResponse {
        VoiceResponse::new(self.voice.clone())
    }

    fn gather(&self) -> Gather {
        Gather::speech(self.action_url.as_str())
    }

    /// Opening document for a new inbound call.
    pub fn greeting(&self) -> VoiceResponse {
        self.response()
            .say(GREETING)
            .gather(self.gather())
            .say(LISTENING_PROMPT)
    }

    /// Handle one recognized utterance (or its absence) for `call_id`.
    pub async fn handle_turn(&self, call_id: &str, utterance: Option<&str>) -> VoiceResponse {
        let utterance = utterance.map(str::trim).filter(|u| !u.is_empty());
        let recordable = is_valid_call_id(call_id);
        if !recordable {
            warn!(call_sid = %call_id, "Turn without a usable CallSid; not recording it");
        }

        let Some(utterance) = utterance else {
            info!(call_sid = %call_id, "No speech detected, ending call");
            return self.end_call(call_id, SILENCE_REPLY, recordable).await;
        };

        info!(call_sid = %call_id, utterance, "Caller spoke");

        if is_termination_phrase(utterance) {
            info!(call_sid = %call_id, utterance, "Caller ended the conversation");
            return self.end_call(call_id, GOODBYE_REPLY, recordable).await;
        }

        let history = if recordable {
            self.store.get_history(call_id).await
        } else {
            Vec::new()
        };
        let messages = build_prompt(&history, utterance);

        let reply = match self
            .llm
            .complete(&messages, CompletionOptions::default())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(call_sid = %call_id, error = %e, "Chat completion failed");
                COMPLETION_FALLBACK.to_string()
            }
        };

        if recordable {
            self.store.append(call_id, utterance, reply.as_str()).await;
        }

        self.response()
            .say(reply)
            .gather(self.gather().with_timeout(FOLLOW_UP_TIMEOUT_SECONDS))
            .say(CLOSING_REPLY)
            .hangup()
    }

    async fn end_call(&self, call_id: &str, reply: &str, recordable: bool) -> VoiceResponse {
        if recordable {
            match self.store.finalize(call_id, None).await {
                Ok(Some(conversation)) => info!(
                    call_sid = %call_id,
                    exchanges = conversation.exchanges.len(),
                    "Stored conversation at end of call"
                ),
                Ok(None) => {}
                Err(e) => error!(call_sid = %call_id, error = %e, "Failed to store conversation"),
            }
        }

        self.response().say(reply).hangup()
    }
}
