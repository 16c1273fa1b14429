//! Anthropic Claude AI provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{
    AIMessage, AIProvider, AIResponse, AIRole, ProviderError, ProviderErrorKind, ProviderRequest,
    TokenUsage,
};
use crate::progress::ProgressEvent;

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Credential variable
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Characters generated between progress reports
const PROGRESS_INTERVAL_CHARS: usize = 500;

/// Upper bound on a single call
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Normalize model name to the canonical API model name.
fn normalize_model(model: &str) -> &str {
    match model {
        "opus" => "claude-opus-4-1-20250805",
        "sonnet" => "claude-sonnet-4-20250514",
        "haiku" => "claude-3-5-haiku-20241022",
        _ => model,
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

/// Streaming event types
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: StreamMessage },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: ContentDelta },
    #[serde(rename = "message_delta")]
    MessageDelta { usage: Option<StreamUsage> },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: AnthropicError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    model: String,
    usage: StreamUsage,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: String,
}

/// Offset of the blank line ending the first complete SSE event.
fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Map an Anthropic error type to a failure kind.
fn kind_for_error_type(error_type: &str) -> ProviderErrorKind {
    match error_type {
        "rate_limit_error" => ProviderErrorKind::RateLimited,
        "overloaded_error" => ProviderErrorKind::Overloaded,
        "authentication_error" | "permission_error" => ProviderErrorKind::Authentication,
        "invalid_request_error" | "not_found_error" | "request_too_large" => {
            ProviderErrorKind::InvalidRequest
        }
        "api_error" => ProviderErrorKind::Server,
        _ => ProviderErrorKind::Other,
    }
}

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Create from environment variable.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok(),
            ..Self::default()
        }
    }

    /// Set a custom base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Convert messages to Anthropic format, extracting system message.
    fn convert_messages(messages: &[AIMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system = None;
        let mut converted = Vec::new();

        for msg in messages {
            match msg.role {
                // Anthropic uses a separate system field
                AIRole::System => system = Some(msg.content.clone()),
                AIRole::User => converted.push(AnthropicMessage {
                    role: "user",
                    content: msg.content.clone(),
                }),
                AIRole::Assistant => converted.push(AnthropicMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                }),
            }
        }

        (system, converted)
    }

    fn error_from_body(status: u16, body: &str) -> ProviderError {
        let mut err = ProviderError::from_status("anthropic", status, body.to_string());
        if let Ok(parsed) = serde_json::from_str::<AnthropicErrorResponse>(body) {
            err.message = format!("{} - {}", parsed.error.error_type, parsed.error.message);
            // 529 and friends come through as typed errors too
            let typed = kind_for_error_type(&parsed.error.error_type);
            if typed != ProviderErrorKind::Other {
                err.kind = typed;
            }
        }
        err
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn api_key_env_var(&self) -> Option<&'static str> {
        Some(API_KEY_ENV)
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<AIResponse, ProviderError> {
        let api_key = request
            .api_key
            .as_ref()
            .or(self.api_key.as_ref())
            .ok_or_else(|| ProviderError::missing_api_key("anthropic", API_KEY_ENV))?;
        let url = request.base_url.as_deref().unwrap_or(&self.base_url);

        let (system, messages) = Self::convert_messages(&request.messages);
        let body = AnthropicRequest {
            model: normalize_model(&request.model).to_string(),
            messages,
            max_tokens: request.options.max_tokens.unwrap_or(4096),
            system,
            temperature: request.options.temperature,
            stop_sequences: request.options.stop_sequences.clone(),
            stream: true,
        };

        tracing::info!(model = %body.model, "Calling Claude API (streaming)...");

        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest("anthropic", &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ProviderError::from_reqwest("anthropic", &e))?;
            return Err(Self::error_from_body(status.as_u16(), &text));
        }

        let mut full_text = String::new();
        let mut input_tokens = 0u32;
        let mut output_tokens = 0u32;
        let mut response_model = request.model.clone();
        let mut last_progress = 0usize;

        let mut stream = response.bytes_stream();
        // Raw bytes: a multi-byte character may straddle two chunks
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::from_reqwest("anthropic", &e))?;
            buffer.extend_from_slice(&chunk);

            // Process complete SSE events from buffer
            while let Some(event_end) = find_event_end(&buffer) {
                let raw: Vec<u8> = buffer.drain(..event_end + 2).collect();
                let event_data = String::from_utf8_lossy(&raw);

                for line in event_data.lines() {
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
                        continue;
                    };

                    match event {
                        StreamEvent::MessageStart { message } => {
                            response_model = message.model;
                            input_tokens = message.usage.input_tokens;
                        }
                        StreamEvent::ContentBlockDelta { delta } if delta.delta_type == "text_delta" => {
                            full_text.push_str(&delta.text);

                            if full_text.len() - last_progress >= PROGRESS_INTERVAL_CHARS {
                                last_progress = full_text.len();
                                tracing::trace!("Generated {} chars...", last_progress);
                                if let Some(progress) = &request.progress {
                                    #[allow(clippy::cast_precision_loss)]
                                    let chars = last_progress as f64;
                                    progress.report(
                                        ProgressEvent::new(chars)
                                            .with_message(format!("Generated {last_progress} chars")),
                                    );
                                }
                            }
                        }
                        StreamEvent::MessageDelta { usage: Some(u) } => {
                            output_tokens = u.output_tokens;
                        }
                        StreamEvent::MessageStop => {
                            tracing::debug!(output_tokens, chars = full_text.len(), "Stream complete");
                        }
                        StreamEvent::Error { error } => {
                            return Err(ProviderError::new(
                                "anthropic",
                                kind_for_error_type(&error.error_type),
                                format!("Stream error: {} - {}", error.error_type, error.message),
                            ));
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(AIResponse {
            text: full_text,
            usage: TokenUsage::new(input_tokens, output_tokens),
            model: response_model,
            provider: "anthropic".to_string(),
        })
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: None,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }
}
