//! Generation Orchestrator.
//!
//! Runs one logical generation request against the requested role, falling
//! back through the remaining roles when a role is skipped or fails.
//! Attempts are strictly sequential; transient failures are retried on the
//! same provider per [`RetryPolicy`] before the sequence advances.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskmaster_cost::{CostTracker, PriceTable, TelemetryRecord};

use super::attempt::{AttemptOutcome, AttemptRecord};
use super::provider::{
    AIMessage, AIProvider, GenerateOptions, ProviderError, ProviderRequest, TokenUsage,
};
use super::registry::ProviderRegistry;
use super::retry::{ErrorClass, RetryPolicy};
use crate::config::{ProjectContext, ProviderBinding, Role, RoleResolver};
use crate::errors::{AiError, AiResult};
use crate::logging::{LogLevel, Logger, TracingLogger};
use crate::progress::ProgressReporter;

/// What the caller wants back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// Free text
    #[default]
    Text,
    /// A JSON object
    Object {
        /// Name of the expected schema, passed to providers that use it
        schema_name: Option<String>,
    },
}

/// One logical generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Logical command the call belongs to (e.g. `parse-prd`)
    pub command_name: String,
    /// Conversation to send
    pub messages: Vec<AIMessage>,
    /// Text or object output
    pub mode: GenerationMode,
    /// Stop sequences
    pub stop_sequences: Option<Vec<String>>,
    /// Project whose configuration applies
    pub project: ProjectContext,
    /// Receives streaming progress
    pub progress: Option<ProgressReporter>,
}

impl GenerationRequest {
    /// Text request for `command_name`.
    pub fn text(command_name: impl Into<String>, messages: Vec<AIMessage>) -> Self {
        Self {
            command_name: command_name.into(),
            messages,
            ..Default::default()
        }
    }

    /// Object request for `command_name`.
    pub fn object(command_name: impl Into<String>, messages: Vec<AIMessage>) -> Self {
        Self {
            command_name: command_name.into(),
            messages,
            mode: GenerationMode::Object { schema_name: None },
            ..Default::default()
        }
    }

    /// Set the project context.
    #[must_use]
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = project;
        self
    }

    /// Attach a progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Set stop sequences.
    #[must_use]
    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }
}

/// Generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    /// Free text
    Text(String),
    /// Parsed JSON
    Object(Value),
}

impl GenerationOutput {
    /// The text, when this is a text output.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Object(_) => None,
        }
    }

    /// The object, when this is an object output.
    pub fn as_object(&self) -> Option<&Value> {
        match self {
            Self::Object(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}

/// Successful generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Generated content
    pub output: GenerationOutput,
    /// Role that served the call
    pub role: Role,
    /// Provider that served the call
    pub provider: String,
    /// Configured model that served the call
    pub model_id: String,
    /// Token usage reported by the provider
    pub usage: TokenUsage,
    /// Usage and cost record for the call
    pub telemetry: TelemetryRecord,
}

/// Routes generation requests across roles.
pub struct GenerationOrchestrator {
    resolver: RoleResolver,
    registry: Arc<ProviderRegistry>,
    prices: Arc<PriceTable>,
    retry: RetryPolicy,
    logger: Arc<dyn Logger>,
    tracker: Option<CostTracker>,
}

impl GenerationOrchestrator {
    /// Create an orchestrator with the built-in price table and default
    /// retry policy.
    pub fn new(resolver: RoleResolver, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            resolver,
            registry,
            prices: Arc::new(PriceTable::builtin()),
            retry: RetryPolicy::default(),
            logger: Arc::new(TracingLogger),
            tracker: None,
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the price table.
    #[must_use]
    pub fn with_price_table(mut self, prices: PriceTable) -> Self {
        self.prices = Arc::new(prices);
        self
    }

    /// Set the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Append every telemetry record to `tracker`.
    #[must_use]
    pub fn with_cost_tracker(mut self, tracker: CostTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// The retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Generate text starting at `role`.
    pub async fn generate_text(
        &self,
        role: Role,
        mut request: GenerationRequest,
    ) -> AiResult<GenerationResult> {
        request.mode = GenerationMode::Text;
        self.generate(role, request).await
    }

    /// Generate a JSON object starting at `role`.
    pub async fn generate_object(
        &self,
        role: Role,
        mut request: GenerationRequest,
    ) -> AiResult<GenerationResult> {
        if request.mode == GenerationMode::Text {
            request.mode = GenerationMode::Object { schema_name: None };
        }
        self.generate(role, request).await
    }

    /// Run `request` starting at `role`.
    ///
    /// Returns the first successful result. A configuration error aborts
    /// immediately; otherwise [`AiError::AllRolesExhausted`] is returned
    /// once every role was skipped or failed.
    pub async fn generate(
        &self,
        role: Role,
        request: GenerationRequest,
    ) -> AiResult<GenerationResult> {
        let sequence = Role::fallback_sequence(role);
        let mut attempts = Vec::new();

        for &current in &sequence {
            let binding = self.resolver.resolve(current, &request.project)?;

            if self.resolver.requires_credential(&binding.provider)
                && !self.resolver.has_credential(&binding.provider, &request.project)
            {
                self.log(
                    LogLevel::Warn,
                    &format!(
                        "Skipping role '{current}' ({}/{}): credential not set",
                        binding.provider, binding.model_id
                    ),
                    &binding,
                );
                attempts.push(AttemptRecord::new(
                    current,
                    &binding.provider,
                    &binding.model_id,
                    0,
                    AttemptOutcome::SkippedNoCredential,
                ));
                continue;
            }

            if let Some((output, usage)) = self.run_role(&binding, &request, &mut attempts).await {
                return Ok(self.finish(&binding, &request.command_name, output, usage));
            }
        }

        Err(Self::exhausted(&request.command_name, &sequence, attempts))
    }

    /// Try one role until it succeeds, fails fatally or runs out of retries.
    async fn run_role(
        &self,
        binding: &ProviderBinding,
        request: &GenerationRequest,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Option<(GenerationOutput, TokenUsage)> {
        let role = binding.role;

        let Some(provider) = self.registry.get(&binding.provider) else {
            let message = format!("No adapter registered for provider '{}'", binding.provider);
            self.log(LogLevel::Error, &format!("Role '{role}' failed: {message}"), binding);
            attempts.push(AttemptRecord::new(
                role,
                &binding.provider,
                &binding.model_id,
                1,
                AttemptOutcome::FatalFailure {
                    kind: None,
                    message,
                },
            ));
            return None;
        };

        let provider_request = self.provider_request(binding, request);
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            self.log(
                LogLevel::Info,
                &format!(
                    "Attempting '{}' with role '{role}' ({}/{}), attempt {attempt}/{max_attempts}",
                    request.command_name, binding.provider, binding.model_id
                ),
                binding,
            );

            let err = match Self::call(provider.as_ref(), &provider_request, &request.mode).await {
                Ok((output, usage)) => {
                    attempts.push(AttemptRecord::new(
                        role,
                        &binding.provider,
                        &binding.model_id,
                        attempt,
                        AttemptOutcome::Success,
                    ));
                    return Some((output, usage));
                }
                Err(err) => err,
            };

            if self.retry.should_retry(attempt, &err) {
                let delay = self.retry.delay_for(attempt);
                self.log(
                    LogLevel::Warn,
                    &format!(
                        "Transient error from {} for role '{role}': {}. Retrying in {}ms ({}/{max_attempts})",
                        binding.provider,
                        err.message,
                        delay.as_millis(),
                        attempt + 1
                    ),
                    binding,
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            self.log(
                LogLevel::Error,
                &format!("Role '{role}' failed with {}: {err}", binding.provider),
                binding,
            );
            let outcome = match self.retry.classify(&err) {
                ErrorClass::Transient => AttemptOutcome::TransientFailure {
                    kind: err.kind,
                    message: err.to_string(),
                },
                ErrorClass::Fatal => AttemptOutcome::FatalFailure {
                    kind: Some(err.kind),
                    message: err.to_string(),
                },
            };
            attempts.push(AttemptRecord::new(
                role,
                &binding.provider,
                &binding.model_id,
                attempt,
                outcome,
            ));
            return None;
        }
    }

    async fn call(
        provider: &dyn AIProvider,
        request: &ProviderRequest,
        mode: &GenerationMode,
    ) -> Result<(GenerationOutput, TokenUsage), ProviderError> {
        match mode {
            GenerationMode::Text => {
                let response = provider.generate_text(request).await?;
                Ok((GenerationOutput::Text(response.text), response.usage))
            }
            GenerationMode::Object { .. } => {
                let response = provider.generate_object(request).await?;
                Ok((GenerationOutput::Object(response.object), response.usage))
            }
        }
    }

    fn provider_request(
        &self,
        binding: &ProviderBinding,
        request: &GenerationRequest,
    ) -> ProviderRequest {
        let (json_mode, schema_name) = match &request.mode {
            GenerationMode::Object { schema_name } => (true, schema_name.clone()),
            GenerationMode::Text => (false, None),
        };

        ProviderRequest {
            model: binding.model_id.clone(),
            messages: request.messages.clone(),
            options: GenerateOptions {
                temperature: Some(binding.temperature),
                max_tokens: Some(binding.max_tokens),
                stop_sequences: request.stop_sequences.clone(),
                json_mode,
                schema_name,
            },
            api_key: self.resolver.api_key(&binding.provider, &request.project),
            base_url: binding.base_url.clone(),
            progress: request.progress.clone(),
        }
    }

    fn finish(
        &self,
        binding: &ProviderBinding,
        command_name: &str,
        output: GenerationOutput,
        usage: TokenUsage,
    ) -> GenerationResult {
        let telemetry = TelemetryRecord::from_usage(
            command_name,
            binding.role.as_str(),
            &binding.provider,
            &binding.model_id,
            u64::from(usage.input_tokens),
            u64::from(usage.output_tokens),
            &self.prices,
        );

        self.logger.log(
            LogLevel::Info,
            &format!(
                "'{command_name}' served by role '{}' ({}/{})",
                binding.role, binding.provider, binding.model_id
            ),
            Some(&json!({
                "inputTokens": telemetry.input_tokens,
                "outputTokens": telemetry.output_tokens,
                "totalCost": telemetry.total_cost,
            })),
        );

        if let Some(tracker) = &self.tracker {
            tracker.record(telemetry.clone());
        }

        GenerationResult {
            output,
            role: binding.role,
            provider: binding.provider.clone(),
            model_id: binding.model_id.clone(),
            usage,
            telemetry,
        }
    }

    /// Build the error listing the sequence and the last outcome per role.
    fn exhausted(command_name: &str, sequence: &[Role], attempts: Vec<AttemptRecord>) -> AiError {
        let roles = sequence
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let details = sequence
            .iter()
            .filter_map(|role| {
                attempts
                    .iter()
                    .rev()
                    .find(|a| a.role == *role)
                    .map(|a| format!("{role}: {}", a.outcome.describe()))
            })
            .collect::<Vec<_>>()
            .join("; ");

        AiError::AllRolesExhausted {
            message: format!(
                "All roles exhausted for '{command_name}' after trying [{roles}]. {details}"
            ),
            attempts,
        }
    }

    fn log(&self, level: LogLevel, message: &str, binding: &ProviderBinding) {
        let meta = json!({
            "role": binding.role,
            "provider": binding.provider,
            "modelId": binding.model_id,
        });
        self.logger.log(level, message, Some(&meta));
    }
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .field("tracks_cost", &self.tracker.is_some())
            .finish_non_exhaustive()
    }
}
