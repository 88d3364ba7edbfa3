use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///   base_url: "https://voice-agent.example.com"
///
/// storage:
///   project: "voice-ai-project"
///   bucket: "voice-agent-ai"
///   service_account_path: "/secrets/gcs.json"
///   backend: "gcs"
///
/// openai:
///   api_key: "sk-..."
///   base_url: "https://api.openai.com/v1"
///   chat_model: "gpt-4o-mini"
///   transcription_model: "whisper-1"
///
/// twilio:
///   account_sid: "AC..."
///   auth_token: "..."
///   voice: "Polly.Joanna"
///   language: "en-US"
///
/// timeouts:
///   llm_seconds: 30
///   transcription_seconds: 60
///   recording_fetch_seconds: 30
///   storage_seconds: 15
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub storage: Option<StorageYaml>,
    pub openai: Option<OpenAIYaml>,
    pub twilio: Option<TwilioYaml>,
    pub timeouts: Option<TimeoutsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_url: Option<String>,
}

/// Blob storage configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub project: Option<String>,
    pub bucket: Option<String>,
    pub service_account_path: Option<String>,
    pub backend: Option<String>,
}

/// Chat completion and transcription API settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub chat_model: Option<String>,
    pub transcription_model: Option<String>,
}

/// Twilio credentials and voice settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub voice: Option<String>,
    pub language: Option<String>,
}

/// Adapter timeouts from YAML, in seconds
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimeoutsYaml {
    pub llm_seconds: Option<u64>,
    pub transcription_seconds: Option<u64>,
    pub recording_fetch_seconds: Option<u64>,
    pub storage_seconds: Option<u64>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
