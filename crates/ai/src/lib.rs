#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_self)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::new_without_default)]

//! # Taskmaster AI
//!
//! Role-routed AI generation for task management workflows.
//!
//! This crate provides:
//! - Role configuration (`main`, `research`, `fallback`) resolved per call
//! - Provider adapters (Anthropic, OpenAI, Perplexity, Ollama)
//! - A generation orchestrator with retry and role fallback
//! - Credential gating and per-call cost telemetry
//! - A background operation manager with progress relay
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskmaster_ai::{
//!     FileConfigSource, GenerationOrchestrator, GenerationRequest, ProjectContext,
//!     ProviderRegistry, Role, RoleResolver, AIMessage,
//! };
//!
//! let resolver = RoleResolver::new(Arc::new(FileConfigSource::new()));
//! let orchestrator =
//!     GenerationOrchestrator::new(resolver, Arc::new(ProviderRegistry::with_defaults()));
//!
//! let request = GenerationRequest::text("expand-task", vec![AIMessage::user("...")])
//!     .with_project(ProjectContext::new("."));
//! let result = orchestrator.generate(Role::Main, request).await?;
//! ```

// AI integration
pub mod ai;

// Role configuration
pub mod config;

// Configuration entities
pub mod entities;

// Error types
pub mod errors;

// Logger collaborator and tracing setup
pub mod logging;

// Background operations
pub mod operations;

// Progress relay
pub mod progress;

// Re-export key types for convenience
pub use ai::{
    AIMessage, AIProvider, AIResponse, AIRole, AttemptOutcome, AttemptRecord, ErrorClass,
    GenerateOptions, GenerationMode, GenerationOrchestrator, GenerationOutput, GenerationRequest,
    GenerationResult, ObjectResponse, ProviderError, ProviderErrorKind, ProviderRegistry,
    ProviderRequest, RetryPolicy, TokenUsage,
};
pub use config::{
    ConfigSource, FileConfigSource, ProjectContext, ProviderBinding, Role, RoleResolver,
    SessionEnv,
};
pub use entities::{GlobalConfig, ModelConfig, ModelSettings, TaskmasterConfig};
pub use errors::{AiError, AiResult};
pub use logging::{init_tracing, LogLevel, Logger, TracingLogger};
pub use operations::{
    AsyncOperationManager, ExecutionContext, OperationError, OperationEvent, OperationEventKind,
    OperationSnapshot, OperationStatus, StatusReport, WorkContext,
};
pub use progress::{ProgressError, ProgressEvent, ProgressReporter, ProgressSink};
pub use taskmaster_cost::{CostTracker, PriceTable, TelemetryRecord};
