//! Startup validation. The service refuses to boot without its upstream credentials.

use super::{ConfigError, ServerConfig};

pub(crate) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.openai_api_key.is_empty() {
        return Err(ConfigError::Missing("OPENAI_API_KEY"));
    }
    if config.twilio_account_sid.is_empty() {
        return Err(ConfigError::Missing("TWILIO_ACCOUNT_SID"));
    }
    if config.twilio_auth_token.is_empty() {
        return Err(ConfigError::Missing("TWILIO_AUTH_TOKEN"));
    }

    url::Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
        key: "BASE_URL",
        message: e.to_string(),
    })?;
    url::Url::parse(&config.openai_base_url).map_err(|e| ConfigError::InvalidValue {
        key: "OPENAI_BASE_URL",
        message: e.to_string(),
    })?;

    for (key, secs) in [
        ("LLM_TIMEOUT_SECONDS", config.llm_timeout_seconds),
        (
            "TRANSCRIPTION_TIMEOUT_SECONDS",
            config.transcription_timeout_seconds,
        ),
        (
            "RECORDING_FETCH_TIMEOUT_SECONDS",
            config.recording_fetch_timeout_seconds,
        ),
        ("STORAGE_TIMEOUT_SECONDS", config.storage_timeout_seconds),
    ] {
        if secs == 0 {
            return Err(ConfigError::InvalidValue {
                key,
                message: "timeout must be at least one second".to_string(),
            });
        }
    }

    Ok(())
}
