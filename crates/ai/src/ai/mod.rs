//! AI integration: provider adapters and role-routed generation.
//!
//! This module provides:
//! - AI provider abstraction (Anthropic, OpenAI, Perplexity, Ollama)
//! - Provider registry for dynamic provider management
//! - Retry policy and per-role attempt records
//! - The generation orchestrator that walks the role fallback sequence

pub mod attempt;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod retry;

// Provider implementations
pub mod anthropic;
pub mod ollama;
pub mod openai;

// Re-exports
pub use attempt::{AttemptOutcome, AttemptRecord};
pub use orchestrator::{
    GenerationMode, GenerationOrchestrator, GenerationOutput, GenerationRequest, GenerationResult,
};
pub use provider::{
    parse_ai_response, AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions,
    MessageBuilder, ObjectResponse, ProviderError, ProviderErrorKind, ProviderRequest, TokenUsage,
};
pub use registry::ProviderRegistry;
pub use retry::{default_classifier, ErrorClass, ErrorClassifier, RetryPolicy};
