use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::messages::{ChatCompletionRequest, ChatCompletionResponse, OpenAIErrorResponse};
use super::{ChatCompletion, ChatMessage, CompletionOptions, LlmError};

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// A single attempt per call; the reqwest client timeout bounds every request.
#[derive(Clone)]
pub struct OpenAIChat {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAIChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAIChat {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatCompletion for OpenAIChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!(
            model = %self.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Network(format!("Failed to read response: {e}"))
            }
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&response_text)
                .map(|error_response| error_response.error.message)
                .unwrap_or(response_text);

            if status.as_u16() == 401 {
                return Err(LlmError::AuthenticationFailed(message));
            }
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .first_text()
            .ok_or(LlmError::EmptyCompletion)?
            .to_string();

        info!(characters = text.len(), "Chat completion received");
        Ok(text)
    }
}
