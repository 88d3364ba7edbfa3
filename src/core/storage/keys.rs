//! Object key layout. Every key is namespaced by the Twilio call id.

use super::StorageError;

pub const CONVERSATIONS_PREFIX: &str = "conversations";
pub const AUDIO_PREFIX: &str = "audio";
pub const RECORDINGS_PREFIX: &str = "recordings";

/// Call ids come straight from form payloads, so they must not be able to
/// escape their prefix.
pub fn is_valid_call_id(call_id: &str) -> bool {
    !call_id.is_empty()
        && !call_id.contains("..")
        && !call_id.contains('/')
        && !call_id.contains('\\')
        && call_id.chars().all(|c| !c.is_control())
}

fn checked(call_id: &str) -> Result<&str, StorageError> {
    if is_valid_call_id(call_id) {
        Ok(call_id)
    } else {
        Err(StorageError::InvalidCallId(call_id.to_string()))
    }
}

/// `conversations/<call_id>.json`
pub fn conversation_key(call_id: &str) -> Result<String, StorageError> {
    Ok(format!("{CONVERSATIONS_PREFIX}/{}.json", checked(call_id)?))
}

/// `audio/<call_id>.wav`, written by the recording pipeline
pub fn audio_key(call_id: &str) -> Result<String, StorageError> {
    Ok(format!("{AUDIO_PREFIX}/{}.wav", checked(call_id)?))
}

/// `recordings/<call_id>.wav`, the whole-call recording
pub fn recording_key(call_id: &str) -> Result<String, StorageError> {
    Ok(format!("{RECORDINGS_PREFIX}/{}.wav", checked(call_id)?))
}
