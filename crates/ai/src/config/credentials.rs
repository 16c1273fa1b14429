//! Provider credential lookup.

use std::collections::HashMap;

/// Providers that never need a credential (local/self-hosted).
pub const CREDENTIAL_EXEMPT_PROVIDERS: &[&str] = &["ollama"];

/// Whether `provider` is exempt from credential gating.
pub fn is_credential_exempt(provider: &str) -> bool {
    CREDENTIAL_EXEMPT_PROVIDERS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(provider))
}

/// Environment variable holding the API key for `provider`.
pub fn api_key_env_var(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "perplexity" => Some("PERPLEXITY_API_KEY"),
        "google" => Some("GOOGLE_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        "azure" => Some("AZURE_OPENAI_API_KEY"),
        _ => None,
    }
}

/// Template values shipped in example env files don't count as credentials.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value.contains("KEY_HERE")
        || (value.starts_with("YOUR_") && value.ends_with("_HERE"))
}

/// Environment variables supplied with a session (e.g. an MCP client's env).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEnv {
    vars: HashMap<String, String>,
}

impl SessionEnv {
    /// Create an empty session environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for SessionEnv {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

/// Resolve the API key for `provider`: session first, then process env.
pub fn lookup_api_key(provider: &str, session: &SessionEnv) -> Option<String> {
    let var = api_key_env_var(provider)?;

    session
        .get(var)
        .map(str::to_string)
        .filter(|v| !is_placeholder(v))
        .or_else(|| std::env::var(var).ok().filter(|v| !is_placeholder(v)))
}
