//! Ollama local model provider.
//!
//! Talks to a self-hosted Ollama server; no credential is needed.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::anthropic::REQUEST_TIMEOUT;
use super::provider::{
    AIMessage, AIProvider, AIResponse, ProviderError, ProviderErrorKind, ProviderRequest,
    TokenUsage,
};

/// Default Ollama API root
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/api";

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [AIMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

/// Ollama provider.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl OllamaProvider {
    /// Create a provider for the default local server.
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        }
    }

    /// Set the API root (e.g. `http://gpu-box:11434/api`).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn chat_url(base: &str) -> String {
        format!("{}/chat", base.trim_end_matches('/'))
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AIProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn api_key_env_var(&self) -> Option<&'static str> {
        None
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<AIResponse, ProviderError> {
        let url = Self::chat_url(request.base_url.as_deref().unwrap_or(&self.base_url));

        let body = OllamaRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            format: request.options.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: request.options.temperature,
                num_predict: request.options.max_tokens,
                stop: request.options.stop_sequences.clone(),
            },
        };

        tracing::debug!(model = %request.model, url = %url, "Calling Ollama chat API");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest("ollama", &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest("ollama", &e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OllamaErrorResponse>(&text)
                .map_or(text, |e| e.error);
            return Err(ProviderError::from_status("ollama", status.as_u16(), message));
        }

        let parsed: OllamaResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                "ollama",
                ProviderErrorKind::InvalidResponse,
                format!("Failed to parse response: {e}"),
            )
        })?;

        Ok(AIResponse {
            text: parsed.message.content,
            usage: TokenUsage::new(parsed.prompt_eval_count, parsed.eval_count),
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            provider: "ollama".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credential_needed() {
        let provider = OllamaProvider::new();
        assert_eq!(provider.name(), "ollama");
        assert!(!provider.requires_api_key());
    }

    #[test]
    fn test_chat_url() {
        assert_eq!(
            OllamaProvider::chat_url("http://localhost:11434/api/"),
            "http://localhost:11434/api/chat"
        );
    }
}
