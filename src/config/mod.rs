//! Configuration module for the voice agent gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_agent_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("{0} environment variable is not set")]
    Missing(&'static str),
}

/// Where conversation archives and audio are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Google Cloud Storage bucket (production)
    #[default]
    Gcs,
    /// Process-local in-memory store, lost on restart (development and tests)
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gcs" | "google" | "gcp" => Ok(StorageBackend::Gcs),
            "memory" | "in-memory" | "inmemory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "unsupported storage backend '{other}', expected 'gcs' or 'memory'"
            )),
        }
    }
}

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, public callback URL)
/// - Storage settings (project, bucket, credentials)
/// - Chat completion and transcription settings (OpenAI-compatible API)
/// - Twilio credentials and voice settings
/// - Per-adapter timeouts
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public base URL Twilio can reach; used for `<Gather action>` targets
    pub base_url: String,

    // Storage settings
    pub google_cloud_project: String,
    pub gcs_bucket: String,
    /// Path to a service account JSON file. When unset, the storage client
    /// falls back to application default credentials.
    pub google_service_account: Option<PathBuf>,
    pub storage_backend: StorageBackend,

    // OpenAI-compatible API
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub transcription_model: String,

    // Twilio
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// Voice used for every `<Say>` verb (e.g. "Polly.Joanna")
    pub twilio_voice: String,
    /// Language used for every `<Say>` verb (e.g. "en-US")
    pub twilio_language: String,

    // Adapter timeouts
    pub llm_timeout_seconds: u64,
    pub transcription_timeout_seconds: u64,
    pub recording_fetch_timeout_seconds: u64,
    pub storage_timeout_seconds: u64,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.openai_api_key.zeroize();
        self.twilio_auth_token.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults).
    ///
    /// Fails when the OpenAI API key or the Twilio credentials are missing,
    /// so the service never starts half-configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute URL Twilio should post gathered speech to.
    pub fn conversation_action_url(&self) -> String {
        format!("{}/twilio/conversation", self.base_url.trim_end_matches('/'))
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_seconds)
    }

    pub fn recording_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.recording_fetch_timeout_seconds)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_seconds)
    }
}
