//! AI Provider trait and common types.
//!
//! Defines the interface that all AI providers must implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::errors::AiError;
use crate::progress::ProgressReporter;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIRole {
    /// System message (sets context/behavior)
    System,
    /// User message (input)
    User,
    /// Assistant message (AI response)
    Assistant,
}

/// A message in a conversation with an AI model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIMessage {
    /// Role of the message sender
    pub role: AIRole,
    /// Content of the message
    pub content: String,
}

impl AIMessage {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information from an AI response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: u32,
    /// Number of output tokens
    pub output_tokens: u32,
    /// Total tokens (input + output)
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Usage with the total derived from input and output.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

/// Text response from an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIResponse {
    /// Generated text content
    pub text: String,
    /// Token usage information
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Structured response from an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectResponse {
    /// Parsed JSON object
    pub object: Value,
    /// Token usage information
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Options for text generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop_sequences: Option<Vec<String>>,
    /// Whether to request JSON output
    pub json_mode: bool,
    /// Schema name for structured output
    pub schema_name: Option<String>,
}

/// One call to a provider adapter.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// Model to call
    pub model: String,
    /// Conversation to send
    pub messages: Vec<AIMessage>,
    /// Sampling and output options
    pub options: GenerateOptions,
    /// Credential for this call; adapters fall back to their own key
    pub api_key: Option<String>,
    /// Endpoint override for this call
    pub base_url: Option<String>,
    /// Receives streaming progress, when the adapter streams
    pub progress: Option<ProgressReporter>,
}

impl ProviderRequest {
    /// Create a request for `model` with `messages`.
    pub fn new(model: impl Into<String>, messages: Vec<AIMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Set the generation options.
    #[must_use]
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the credential.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Too many requests
    RateLimited,
    /// Provider temporarily overloaded or unavailable
    Overloaded,
    /// Request timed out
    Timeout,
    /// Connection-level failure
    Network,
    /// Credential missing or rejected
    Authentication,
    /// Request rejected as malformed
    InvalidRequest,
    /// Other server-side failure
    Server,
    /// Response could not be decoded
    InvalidResponse,
    /// Anything else
    Other,
}

impl ProviderErrorKind {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            502 | 503 | 504 | 529 => Self::Overloaded,
            408 => Self::Timeout,
            401 | 403 => Self::Authentication,
            400 | 404 | 413 | 422 => Self::InvalidRequest,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

/// A failed provider call.
#[derive(Debug, Clone, Error)]
#[error("{provider} error ({kind:?}): {message}")]
pub struct ProviderError {
    /// Provider that failed
    pub provider: String,
    /// Failure classification
    pub kind: ProviderErrorKind,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Error message
    pub message: String,
}

impl ProviderError {
    /// Create an error of `kind`.
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Create an error from an HTTP status.
    pub fn from_status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind: ProviderErrorKind::from_status(status),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an error from a transport failure.
    pub fn from_reqwest(provider: impl Into<String>, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_connect() || err.is_request() {
            ProviderErrorKind::Network
        } else if err.is_decode() || err.is_body() {
            ProviderErrorKind::InvalidResponse
        } else {
            ProviderErrorKind::Other
        };
        Self {
            provider: provider.into(),
            kind,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    /// Missing credential for an adapter that needs one.
    pub fn missing_api_key(provider: impl Into<String>, env_var: &str) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Authentication,
            format!("{env_var} not set"),
        )
    }
}

/// Trait for AI providers.
///
/// All AI providers (Anthropic, OpenAI, etc.) must implement this trait.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Get the provider name (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Get the environment variable name for the API key, if one is used.
    fn api_key_env_var(&self) -> Option<&'static str>;

    /// Whether calls need a credential.
    fn requires_api_key(&self) -> bool {
        self.api_key_env_var().is_some()
    }

    /// Generate text from messages.
    async fn generate_text(&self, request: &ProviderRequest) -> Result<AIResponse, ProviderError>;

    /// Generate a JSON object from messages.
    ///
    /// The default asks for JSON output and parses the text response.
    async fn generate_object(
        &self,
        request: &ProviderRequest,
    ) -> Result<ObjectResponse, ProviderError> {
        let mut request = request.clone();
        request.options.json_mode = true;

        let response = self.generate_text(&request).await?;
        let object: Value = parse_ai_response(&response).map_err(|e| {
            ProviderError::new(self.name(), ProviderErrorKind::InvalidResponse, e.to_string())
        })?;

        Ok(ObjectResponse {
            object,
            usage: response.usage,
            model: response.model,
            provider: response.provider,
        })
    }
}

/// Parse a structured object out of an AI response.
///
/// This is a standalone function rather than a trait method because
/// generic methods are not dyn-compatible.
pub fn parse_ai_response<T: for<'de> Deserialize<'de>>(response: &AIResponse) -> Result<T, AiError> {
    // Try to extract JSON from the response text
    let text = response.text.trim();

    // Sometimes the AI wraps JSON in markdown code blocks
    let json_text = if text.starts_with("```json") {
        text.strip_prefix("```json")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else if text.starts_with("```") {
        text.strip_prefix("```")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else {
        text
    };

    serde_json::from_str(json_text).map_err(|e| AiError::ResponseParse {
        reason: format!("Failed to parse AI response as JSON: {e}. Response: {text}"),
    })
}

/// Builder for constructing AI messages.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    messages: Vec<AIMessage>,
}

impl MessageBuilder {
    /// Create a new message builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system message.
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(AIMessage::system(content));
        self
    }

    /// Add a user message.
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(AIMessage::user(content));
        self
    }

    /// Add an assistant message.
    pub fn assistant(mut self, content: impl Into<String>) -> Self {
        self.messages.push(AIMessage::assistant(content));
        self
    }

    /// Build the message list.
    pub fn build(self) -> Vec<AIMessage> {
        self.messages
    }
}
