//! Configuration entities.

use serde::{Deserialize, Serialize};

use crate::config::Role;

/// Main configuration structure (`.taskmaster/config.json`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskmasterConfig {
    /// AI model configurations
    #[serde(default)]
    pub models: ModelConfig,

    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
}

impl TaskmasterConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }
}

/// Model configuration per role.
///
/// A role missing from the file gets its default binding; a role set to
/// `null` is unbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Main model for generation/updates
    #[serde(default = "default_main")]
    pub main: Option<ModelSettings>,

    /// Research model (typically Perplexity)
    #[serde(default = "default_research")]
    pub research: Option<ModelSettings>,

    /// Fallback model
    #[serde(default = "default_fallback")]
    pub fallback: Option<ModelSettings>,
}

impl ModelConfig {
    /// Settings bound to a role, if any.
    pub fn for_role(&self, role: Role) -> Option<&ModelSettings> {
        match role {
            Role::Main => self.main.as_ref(),
            Role::Research => self.research.as_ref(),
            Role::Fallback => self.fallback.as_ref(),
        }
    }

    /// Replace the settings bound to a role.
    pub fn set_role(&mut self, role: Role, settings: Option<ModelSettings>) {
        match role {
            Role::Main => self.main = settings,
            Role::Research => self.research = settings,
            Role::Fallback => self.fallback = settings,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            main: default_main(),
            research: default_research(),
            fallback: default_fallback(),
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
fn default_main() -> Option<ModelSettings> {
    Some(ModelSettings::default())
}

#[allow(clippy::unnecessary_wraps)]
fn default_research() -> Option<ModelSettings> {
    Some(ModelSettings {
        provider: "perplexity".to_string(),
        model_id: "sonar-pro".to_string(),
        max_tokens: 8700,
        temperature: 0.1,
        base_url: None,
    })
}

#[allow(clippy::unnecessary_wraps)]
fn default_fallback() -> Option<ModelSettings> {
    Some(ModelSettings {
        provider: "anthropic".to_string(),
        model_id: "claude-3-7-sonnet-20250219".to_string(),
        max_tokens: 120_000,
        temperature: default_temperature(),
        base_url: None,
    })
}

/// Individual model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Provider name (e.g., "anthropic", "openai")
    pub provider: String,

    /// Model ID
    #[serde(rename = "modelId")]
    pub model_id: String,

    /// Maximum tokens
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: u32,

    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional base URL override
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "baseURL")]
    pub base_url: Option<String>,
}

const fn default_max_tokens() -> u32 {
    64000
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model_id: "claude-sonnet-4-20250514".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: None,
        }
    }
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level
    #[serde(default = "default_log_level", rename = "logLevel")]
    pub log_level: String,

    /// Debug mode
    #[serde(default)]
    pub debug: bool,

    /// Project name
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "projectName"
    )]
    pub project_name: Option<String>,

    /// Base URL of the local Ollama server
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "ollamaBaseURL"
    )]
    pub ollama_base_url: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            debug: false,
            project_name: None,
            ollama_base_url: None,
        }
    }
}
