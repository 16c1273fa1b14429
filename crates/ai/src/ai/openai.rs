//! OpenAI GPT provider implementation.
//!
//! Also serves OpenAI-compatible endpoints such as Perplexity.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::anthropic::REQUEST_TIMEOUT;
use super::provider::{
    AIMessage, AIProvider, AIResponse, AIRole, ProviderError, ProviderErrorKind, ProviderRequest,
    TokenUsage,
};

/// OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Perplexity API endpoint
const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai/chat/completions";

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

/// OpenAI chat-completions provider.
pub struct OpenAIProvider {
    client: Client,
    name: &'static str,
    api_key_env: &'static str,
    api_key: Option<String>,
    base_url: String,
    supports_json_mode: bool,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Create from environment variable.
    pub fn from_env() -> Self {
        let provider = Self::default();
        Self {
            api_key: std::env::var(provider.api_key_env).ok(),
            ..provider
        }
    }

    /// Perplexity's OpenAI-compatible endpoint.
    pub fn perplexity() -> Self {
        Self {
            client: Self::default_client(),
            name: "perplexity",
            api_key_env: "PERPLEXITY_API_KEY",
            api_key: std::env::var("PERPLEXITY_API_KEY").ok(),
            base_url: PERPLEXITY_API_URL.to_string(),
            // Perplexity rejects `response_format: json_object`
            supports_json_mode: false,
        }
    }

    /// Set a custom base URL (useful for Azure OpenAI or proxies).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the credential used when a request carries none.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn default_client() -> Client {
        Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default()
    }

    /// Convert messages to OpenAI format.
    fn convert_messages(messages: &[AIMessage]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|msg| OpenAIMessage {
                role: match msg.role {
                    AIRole::System => "system",
                    AIRole::User => "user",
                    AIRole::Assistant => "assistant",
                },
                content: msg.content.clone(),
            })
            .collect()
    }

    fn error_from_body(&self, status: u16, body: &str) -> ProviderError {
        let mut err = ProviderError::from_status(self.name, status, body.to_string());
        if let Ok(parsed) = serde_json::from_str::<OpenAIErrorResponse>(body) {
            err.message = parsed.error.message;
            if parsed.error.error_type.as_deref() == Some("insufficient_quota") {
                err.kind = ProviderErrorKind::Authentication;
            }
        }
        err
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn api_key_env_var(&self) -> Option<&'static str> {
        Some(self.api_key_env)
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<AIResponse, ProviderError> {
        let api_key = request
            .api_key
            .as_ref()
            .or(self.api_key.as_ref())
            .ok_or_else(|| ProviderError::missing_api_key(self.name, self.api_key_env))?;
        let url = request.base_url.as_deref().unwrap_or(&self.base_url);

        let response_format = (request.options.json_mode && self.supports_json_mode)
            .then_some(ResponseFormat {
                format_type: "json_object",
            });

        let body = OpenAIRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages),
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            stop: request.options.stop_sequences.clone(),
            response_format,
        };

        tracing::debug!(provider = self.name, model = %body.model, "Calling chat completions API");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name, &e))?;

        if !status.is_success() {
            return Err(self.error_from_body(status.as_u16(), &text));
        }

        let api_response: OpenAIResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                self.name,
                ProviderErrorKind::InvalidResponse,
                format!("Failed to parse response: {e}"),
            )
        })?;

        // Extract text from first choice
        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(AIResponse {
            text: content,
            usage: TokenUsage::new(
                api_response.usage.prompt_tokens,
                api_response.usage.completion_tokens,
            ),
            model: api_response.model.unwrap_or_else(|| request.model.clone()),
            provider: self.name.to_string(),
        })
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self {
            client: Self::default_client(),
            name: "openai",
            api_key_env: "OPENAI_API_KEY",
            api_key: None,
            base_url: OPENAI_API_URL.to_string(),
            supports_json_mode: true,
        }
    }
}
