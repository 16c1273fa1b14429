//! Shared test doubles.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use taskmaster_ai::ai::{AIProvider, AIResponse, ProviderError, ProviderErrorKind, ProviderRequest, TokenUsage};
use taskmaster_ai::config::{ConfigSource, RoleParameters};
use taskmaster_ai::{
    AiResult, AsyncOperationManager, GenerationOrchestrator, LogLevel, Logger, OperationSnapshot,
    ProgressError, ProgressEvent, ProgressSink, ProviderRegistry, RetryPolicy, Role, RoleResolver,
    SessionEnv,
};

/// Provider returning scripted results in order.
pub struct MockProvider {
    name: String,
    requires_key: bool,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProviderRequest>>,
    usage: TokenUsage,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requires_key: true,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            usage: TokenUsage::new(10, 20),
        }
    }

    /// A provider that needs no credential.
    pub fn keyless(name: &str) -> Self {
        Self {
            requires_key: false,
            ..Self::new(name)
        }
    }

    pub fn then_ok(self, text: &str) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn then_err(self, kind: ProviderErrorKind, message: &str) -> Self {
        let err = ProviderError::new(self.name.clone(), kind, message);
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_usage(mut self, input: u32, output: u32) -> Self {
        self.usage = TokenUsage::new(input, output);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AIProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn api_key_env_var(&self) -> Option<&'static str> {
        self.requires_key.then_some("MOCK_API_KEY")
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<AIResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(progress) = &request.progress {
            progress.report(ProgressEvent::new(1.0).with_message(format!("{} streaming", self.name)));
        }

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("unscripted".to_string()));

        next.map(|text| AIResponse {
            text,
            usage: self.usage,
            model: request.model.clone(),
            provider: self.name.clone(),
        })
    }
}

/// In-memory configuration collaborator that counts credential lookups.
#[derive(Default)]
pub struct StaticConfigSource {
    bindings: HashMap<Role, (String, String)>,
    credentials: HashMap<String, String>,
    checks: Mutex<Vec<String>>,
}

impl StaticConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: Role, provider: &str, model: &str) -> Self {
        self.bindings
            .insert(role, (provider.to_string(), model.to_string()));
        self
    }

    pub fn with_credential(mut self, provider: &str, key: &str) -> Self {
        self.credentials.insert(provider.to_string(), key.to_string());
        self
    }

    /// How many times the credential for `provider` was looked up.
    pub fn credential_checks(&self, provider: &str) -> usize {
        self.checks
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == provider)
            .count()
    }
}

impl ConfigSource for StaticConfigSource {
    fn provider_for_role(&self, role: Role, _root: &Path) -> AiResult<Option<String>> {
        Ok(self.bindings.get(&role).map(|(p, _)| p.clone()))
    }

    fn model_for_role(&self, role: Role, _root: &Path) -> AiResult<Option<String>> {
        Ok(self.bindings.get(&role).map(|(_, m)| m.clone()))
    }

    fn parameters_for_role(&self, _role: Role, _root: &Path) -> AiResult<RoleParameters> {
        Ok(RoleParameters {
            max_tokens: 4096,
            temperature: 0.2,
        })
    }

    fn credential_for(&self, provider: &str, _session: &SessionEnv, _root: &Path) -> Option<String> {
        self.checks.lock().unwrap().push(provider.to_string());
        self.credentials.get(provider).cloned()
    }
}

/// Logger that keeps every line.
#[derive(Default)]
pub struct CapturingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl CapturingLogger {
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: LogLevel, message: &str, _meta: Option<&Value>) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

/// Progress sink that keeps every event, or fails every relay.
#[derive(Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
    fail: bool,
    panic: bool,
}

impl RecordingProgressSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn report(&self, event: &ProgressEvent) -> Result<(), ProgressError> {
        if self.panic {
            panic!("sink transport died");
        }
        if self.fail {
            return Err(ProgressError("client disconnected".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Orchestrator over mock providers with a zero-delay retry policy.
pub fn orchestrator(
    source: Arc<StaticConfigSource>,
    providers: &[Arc<MockProvider>],
    logger: Arc<CapturingLogger>,
) -> GenerationOrchestrator {
    let registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(Arc::clone(provider) as Arc<dyn AIProvider>);
    }

    GenerationOrchestrator::new(RoleResolver::new(source), Arc::new(registry))
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
        .with_logger(logger)
}

/// Poll until `id` reaches a terminal status.
pub async fn wait_for_terminal(manager: &AsyncOperationManager, id: &str) -> OperationSnapshot {
    for _ in 0..1000 {
        if let Some(snapshot) = manager.get_status(id).into_snapshot() {
            if snapshot.status.is_terminal() {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("operation {id} did not finish");
}
