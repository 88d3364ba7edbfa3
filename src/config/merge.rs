//! Merge environment variables (base) with optional YAML overrides.

use std::path::PathBuf;

use super::env::{env_parse, env_string};
use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig, StorageBackend};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_PROJECT: &str = "voice-ai-project";
const DEFAULT_BUCKET: &str = "voice-agent-ai";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_VOICE: &str = "Polly.Joanna";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRANSCRIPTION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RECORDING_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 15;

/// Build a [`ServerConfig`] from the environment, letting YAML values win.
///
/// Required secrets that are absent everywhere are left empty here and
/// rejected by validation.
pub(crate) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let storage = yaml.storage.unwrap_or_default();
    let openai = yaml.openai.unwrap_or_default();
    let twilio = yaml.twilio.unwrap_or_default();
    let timeouts = yaml.timeouts.unwrap_or_default();

    let storage_backend = match storage.backend.or_else(|| env_string("STORAGE_BACKEND")) {
        Some(raw) => raw
            .parse::<StorageBackend>()
            .map_err(|message| ConfigError::InvalidValue {
                key: "STORAGE_BACKEND",
                message,
            })?,
        None => StorageBackend::default(),
    };

    let port = match server.port {
        Some(port) => port,
        None => env_parse::<u16>("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    Ok(ServerConfig {
        host: server
            .host
            .or_else(|| env_string("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
        base_url: server
            .base_url
            .or_else(|| env_string("BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string(),

        google_cloud_project: storage
            .project
            .or_else(|| env_string("GOOGLE_CLOUD_PROJECT"))
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        gcs_bucket: storage
            .bucket
            .or_else(|| env_string("GCS_BUCKET"))
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        google_service_account: storage
            .service_account_path
            .or_else(|| env_string("GOOGLE_SERVICE_ACCOUNT"))
            .map(PathBuf::from),
        storage_backend,

        openai_api_key: openai
            .api_key
            .or_else(|| env_string("OPENAI_API_KEY"))
            .unwrap_or_default(),
        openai_base_url: openai
            .base_url
            .or_else(|| env_string("OPENAI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string(),
        chat_model: openai
            .chat_model
            .or_else(|| env_string("OPENAI_CHAT_MODEL"))
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        transcription_model: openai
            .transcription_model
            .or_else(|| env_string("OPENAI_TRANSCRIPTION_MODEL"))
            .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),

        twilio_account_sid: twilio
            .account_sid
            .or_else(|| env_string("TWILIO_ACCOUNT_SID"))
            .unwrap_or_default(),
        twilio_auth_token: twilio
            .auth_token
            .or_else(|| env_string("TWILIO_AUTH_TOKEN"))
            .unwrap_or_default(),
        twilio_voice: twilio
            .voice
            .or_else(|| env_string("TWILIO_VOICE"))
            .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        twilio_language: twilio
            .language
            .or_else(|| env_string("TWILIO_LANGUAGE"))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),

        llm_timeout_seconds: match timeouts.llm_seconds {
            Some(secs) => secs,
            None => env_parse("LLM_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
        },
        transcription_timeout_seconds: match timeouts.transcription_seconds {
            Some(secs) => secs,
            None => env_parse("TRANSCRIPTION_TIMEOUT_SECONDS")?
                .unwrap_or(DEFAULT_TRANSCRIPTION_TIMEOUT_SECS),
        },
        recording_fetch_timeout_seconds: match timeouts.recording_fetch_seconds {
            Some(secs) => secs,
            None => env_parse("RECORDING_FETCH_TIMEOUT_SECONDS")?
                .unwrap_or(DEFAULT_RECORDING_FETCH_TIMEOUT_SECS),
        },
        storage_timeout_seconds: match timeouts.storage_seconds {
            Some(secs) => secs,
            None => env_parse("STORAGE_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_STORAGE_TIMEOUT_SECS),
        },
    })
}
