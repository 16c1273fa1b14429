//! Provider Registry - Manages AI provider instances.
//!
//! Maps provider names to adapters. Callers own their registry; there is
//! no process-wide instance.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::anthropic::AnthropicProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::provider::AIProvider;

/// Registry of AI providers keyed by lowercase name.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn AIProvider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in adapters registered.
    ///
    /// Credentials are supplied per request, so adapters are registered
    /// whether or not their key is set in the environment.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(AnthropicProvider::from_env()));
        registry.register(Arc::new(OpenAIProvider::from_env()));
        registry.register(Arc::new(OpenAIProvider::perplexity()));
        registry.register(Arc::new(OllamaProvider::new()));
        registry
    }

    /// Register a provider, replacing any with the same name.
    pub fn register(&self, provider: Arc<dyn AIProvider>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(provider.name().to_lowercase(), provider);
    }

    /// Get a provider by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn AIProvider>> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.get(&name.to_lowercase()).cloned()
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get all registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a provider.
    pub fn unregister(&self, name: &str) -> bool {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.remove(&name.to_lowercase()).is_some()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}
