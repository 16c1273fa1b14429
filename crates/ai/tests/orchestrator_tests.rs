//! Role fallback, retry and credential gating through the orchestrator.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{orchestrator, CapturingLogger, MockProvider, RecordingProgressSink, StaticConfigSource};
use taskmaster_ai::ai::{AttemptOutcome, ProviderErrorKind};
use taskmaster_ai::{
    AIMessage, AiError, CostTracker, ErrorClass, GenerationRequest, LogLevel, PriceTable,
    ProgressReporter, ProgressSink, RetryPolicy, Role,
};
use taskmaster_cost::ModelPrice;

fn request() -> GenerationRequest {
    GenerationRequest::text("expand-task", vec![AIMessage::user("Break this task down")])
}

fn three_roles() -> StaticConfigSource {
    StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_role(Role::Fallback, "beta", "beta-medium")
        .with_role(Role::Research, "gamma", "gamma-online")
        .with_credential("alpha", "alpha-key")
        .with_credential("beta", "beta-key")
        .with_credential("gamma", "gamma-key")
}

#[tokio::test]
async fn main_success_calls_no_other_role() {
    let main = Arc::new(MockProvider::new("alpha").then_ok("main answer"));
    let fallback = Arc::new(MockProvider::new("beta"));
    let research = Arc::new(MockProvider::new("gamma"));
    let tracker = CostTracker::new();

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main), Arc::clone(&fallback), Arc::clone(&research)],
        Arc::new(CapturingLogger::default()),
    )
    .with_cost_tracker(tracker.clone());

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(result.output.as_text(), Some("main answer"));
    assert_eq!(result.role, Role::Main);
    assert_eq!(result.provider, "alpha");
    assert_eq!(main.calls(), 1);
    assert_eq!(fallback.calls(), 0);
    assert_eq!(research.calls(), 0);

    assert_eq!(tracker.len(), 1);
    let records = tracker.all();
    let record = &records[0];
    assert_eq!(record.command_name, "expand-task");
    assert_eq!(record.role, "main");
    assert_eq!(record.input_tokens, 10);
    assert_eq!(record.output_tokens, 20);
    assert_eq!(result.telemetry, *record);
}

#[tokio::test]
async fn transient_errors_retry_same_role() {
    let main = Arc::new(
        MockProvider::new("alpha")
            .then_err(ProviderErrorKind::RateLimited, "429 Too Many Requests")
            .then_err(ProviderErrorKind::Overloaded, "overloaded")
            .then_ok("third time lucky"),
    );
    let fallback = Arc::new(MockProvider::new("beta"));
    let research = Arc::new(MockProvider::new("gamma"));
    let logger = Arc::new(CapturingLogger::default());

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main), Arc::clone(&fallback), Arc::clone(&research)],
        Arc::clone(&logger),
    );

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(result.output.as_text(), Some("third time lucky"));
    assert_eq!(main.calls(), 3);
    assert_eq!(fallback.calls(), 0);
    assert_eq!(research.calls(), 0);
    assert_eq!(logger.messages(LogLevel::Warn).len(), 2);
}

#[tokio::test]
async fn fatal_errors_fall_through_to_research() {
    let main = Arc::new(MockProvider::new("alpha").then_err(ProviderErrorKind::InvalidRequest, "bad schema"));
    let fallback = Arc::new(MockProvider::new("beta").then_err(ProviderErrorKind::Authentication, "key revoked"));
    let research = Arc::new(MockProvider::new("gamma").then_ok("researched"));
    let logger = Arc::new(CapturingLogger::default());
    let tracker = CostTracker::new();

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main), Arc::clone(&fallback), Arc::clone(&research)],
        Arc::clone(&logger),
    )
    .with_cost_tracker(tracker.clone());

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(result.role, Role::Research);
    assert_eq!(result.output.as_text(), Some("researched"));
    // Fatal errors are not retried
    assert_eq!(main.calls(), 1);
    assert_eq!(fallback.calls(), 1);

    let errors = logger.messages(LogLevel::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("'main'"));
    assert!(errors[1].contains("'fallback'"));

    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.all()[0].role, "research");
}

#[tokio::test]
async fn missing_credential_skips_role_without_calling_adapter() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_role(Role::Fallback, "beta", "beta-medium")
        .with_role(Role::Research, "gamma", "gamma-online")
        .with_credential("beta", "beta-key");
    let main = Arc::new(MockProvider::new("alpha"));
    let fallback = Arc::new(MockProvider::new("beta").then_ok("from fallback"));
    let logger = Arc::new(CapturingLogger::default());

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&main), Arc::clone(&fallback)],
        Arc::clone(&logger),
    );

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(main.calls(), 0);
    assert_eq!(result.role, Role::Fallback);
    assert_eq!(result.output.as_text(), Some("from fallback"));

    let warnings = logger.messages(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("credential not set"));

    // The adapter receives the credential for its own provider
    let sent = fallback.last_request().unwrap();
    assert_eq!(sent.api_key.as_deref(), Some("beta-key"));
    assert_eq!(sent.model, "beta-medium");
    assert_eq!(sent.options.max_tokens, Some(4096));
}

#[tokio::test]
async fn exempt_provider_never_consults_credentials() {
    let source = Arc::new(StaticConfigSource::new().with_role(Role::Main, "ollama", "llama3.1"));
    let local = Arc::new(MockProvider::keyless("ollama").then_ok("local answer"));

    let orch = orchestrator(
        Arc::clone(&source),
        &[Arc::clone(&local)],
        Arc::new(CapturingLogger::default()),
    );

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(result.output.as_text(), Some("local answer"));
    assert_eq!(local.calls(), 1);
    assert_eq!(source.credential_checks("ollama"), 0);
    assert!(local.last_request().unwrap().api_key.is_none());
}

#[tokio::test]
async fn all_roles_exhausted_lists_sequence() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_role(Role::Fallback, "beta", "beta-medium")
        .with_role(Role::Research, "gamma", "gamma-online")
        .with_credential("alpha", "alpha-key")
        .with_credential("gamma", "gamma-key");
    let main = Arc::new(MockProvider::new("alpha").then_err(ProviderErrorKind::Server, "internal error"));
    let fallback = Arc::new(MockProvider::new("beta"));
    let research = Arc::new(
        MockProvider::new("gamma")
            .then_err(ProviderErrorKind::Timeout, "timed out")
            .then_err(ProviderErrorKind::Timeout, "timed out")
            .then_err(ProviderErrorKind::Timeout, "timed out"),
    );
    let tracker = CostTracker::new();

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&main), Arc::clone(&fallback), Arc::clone(&research)],
        Arc::new(CapturingLogger::default()),
    )
    .with_cost_tracker(tracker.clone());

    let err = orch.generate(Role::Main, request()).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("[main, fallback, research]"), "{message}");
    assert!(message.contains("fallback: skipped: credential not set"));
    assert!(message.contains("internal error"));

    let attempts = err.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0].role, Role::Main);
    assert!(matches!(attempts[0].outcome, AttemptOutcome::FatalFailure { .. }));
    assert_eq!(attempts[1].outcome, AttemptOutcome::SkippedNoCredential);
    assert_eq!(attempts[2].attempt, 3);
    assert!(matches!(attempts[2].outcome, AttemptOutcome::TransientFailure { .. }));

    assert_eq!(fallback.calls(), 0);
    assert_eq!(research.calls(), 3);
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn transient_budget_exhausted_advances_to_next_role() {
    let main = Arc::new(
        MockProvider::new("alpha")
            .then_err(ProviderErrorKind::RateLimited, "slow down")
            .then_err(ProviderErrorKind::RateLimited, "slow down")
            .then_err(ProviderErrorKind::RateLimited, "slow down")
            .then_ok("never reached"),
    );
    let fallback = Arc::new(MockProvider::new("beta").then_ok("fallback answer"));

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main), Arc::clone(&fallback)],
        Arc::new(CapturingLogger::default()),
    );

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(main.calls(), 3);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(result.role, Role::Fallback);
}

#[tokio::test]
async fn single_attempt_policy_never_retries_transient_errors() {
    let main = Arc::new(
        MockProvider::new("alpha")
            .then_err(ProviderErrorKind::Overloaded, "overloaded")
            .then_ok("never reached"),
    );
    let fallback = Arc::new(MockProvider::new("beta").then_ok("fallback answer"));

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main), Arc::clone(&fallback)],
        Arc::new(CapturingLogger::default()),
    )
    .with_retry_policy(RetryPolicy::no_retry());

    let result = orch.generate(Role::Main, request()).await.unwrap();

    assert_eq!(main.calls(), 1);
    assert_eq!(result.role, Role::Fallback);
}

#[tokio::test]
async fn sequence_starts_at_requested_role() {
    let main = Arc::new(MockProvider::new("alpha").then_err(ProviderErrorKind::InvalidRequest, "no"));
    let fallback = Arc::new(MockProvider::new("beta").then_err(ProviderErrorKind::InvalidRequest, "no"));
    let research = Arc::new(MockProvider::new("gamma").then_err(ProviderErrorKind::InvalidRequest, "no"));

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main), Arc::clone(&fallback), Arc::clone(&research)],
        Arc::new(CapturingLogger::default()),
    );

    let err = orch.generate(Role::Research, request()).await.unwrap_err();

    assert!(err.to_string().contains("[research, main, fallback]"));
    let roles: Vec<Role> = err.attempts().iter().map(|a| a.role).collect();
    assert_eq!(roles, vec![Role::Research, Role::Main, Role::Fallback]);
}

#[tokio::test]
async fn configuration_error_aborts_immediately() {
    let source = StaticConfigSource::new()
        .with_role(Role::Fallback, "beta", "beta-medium")
        .with_credential("beta", "beta-key");
    let fallback = Arc::new(MockProvider::new("beta").then_ok("unused"));

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&fallback)],
        Arc::new(CapturingLogger::default()),
    );

    let err = orch.generate(Role::Main, request()).await.unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn unregistered_provider_is_a_role_failure() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "nowhere", "ghost-1")
        .with_role(Role::Fallback, "beta", "beta-medium")
        .with_role(Role::Research, "gamma", "gamma-online")
        .with_credential("nowhere", "key")
        .with_credential("beta", "beta-key");
    let fallback = Arc::new(MockProvider::new("beta").then_ok("fallback answer"));

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&fallback)],
        Arc::new(CapturingLogger::default()),
    );

    let result = orch.generate(Role::Main, request()).await.unwrap();
    assert_eq!(result.role, Role::Fallback);
}

#[tokio::test]
async fn telemetry_prices_usage() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_credential("alpha", "alpha-key");
    let main = Arc::new(MockProvider::new("alpha").with_usage(10, 20).then_ok("priced"));

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&main)],
        Arc::new(CapturingLogger::default()),
    )
    .with_price_table(PriceTable::empty("USD").with_price("alpha", "alpha-large", ModelPrice::new(3.0, 15.0)));

    let result = orch.generate(Role::Main, request()).await.unwrap();

    let expected = 10.0 / 1e6 * 3.0 + 20.0 / 1e6 * 15.0;
    let cost = result.telemetry.total_cost.unwrap();
    assert!((cost - expected).abs() < 1e-12);
    assert_eq!(result.telemetry.currency.as_deref(), Some("USD"));
    assert_eq!(result.telemetry.total_tokens, 30);
}

#[tokio::test]
async fn unknown_price_still_succeeds() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_credential("alpha", "alpha-key");
    let main = Arc::new(MockProvider::new("alpha").then_ok("unpriced"));

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&main)],
        Arc::new(CapturingLogger::default()),
    );

    let result = orch.generate(Role::Main, request()).await.unwrap();
    assert!(result.telemetry.total_cost.is_none());
    assert!(!result.telemetry.has_cost());
}

#[tokio::test]
async fn object_mode_parses_json() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_role(Role::Fallback, "beta", "beta-medium")
        .with_role(Role::Research, "gamma", "gamma-online")
        .with_credential("alpha", "alpha-key")
        .with_credential("beta", "beta-key");
    // Unparsable output is fatal for the role
    let main = Arc::new(MockProvider::new("alpha").then_ok("Sure! Here are your tasks"));
    let fallback = Arc::new(MockProvider::new("beta").then_ok("```json\n{\"tasks\": [{\"id\": 1}]}\n```"));

    let orch = orchestrator(
        Arc::new(source),
        &[Arc::clone(&main), Arc::clone(&fallback)],
        Arc::new(CapturingLogger::default()),
    );

    let result = orch
        .generate_object(Role::Main, GenerationRequest::text("parse-prd", vec![AIMessage::user("prd")]))
        .await
        .unwrap();

    assert_eq!(main.calls(), 1);
    assert_eq!(result.role, Role::Fallback);
    let object = result.output.as_object().unwrap();
    assert_eq!(object["tasks"][0]["id"], 1);
    assert!(fallback.last_request().unwrap().options.json_mode);
}

#[tokio::test]
async fn progress_reaches_caller_sink() {
    let source = StaticConfigSource::new()
        .with_role(Role::Main, "alpha", "alpha-large")
        .with_credential("alpha", "alpha-key");
    let main = Arc::new(MockProvider::new("alpha").then_ok("done"));
    let sink = Arc::new(RecordingProgressSink::default());
    let logger = Arc::new(CapturingLogger::default());

    let orch = orchestrator(Arc::new(source), &[Arc::clone(&main)], Arc::clone(&logger));
    let reporter = ProgressReporter::new(Some(Arc::clone(&sink) as Arc<dyn ProgressSink>), logger);

    orch.generate(Role::Main, request().with_progress(reporter))
        .await
        .unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message.as_deref(), Some("alpha streaming"));
}

#[tokio::test]
async fn custom_classifier_controls_retries() {
    let main = Arc::new(
        MockProvider::new("alpha")
            .then_err(ProviderErrorKind::Authentication, "token expired")
            .then_ok("refreshed"),
    );

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main)],
        Arc::new(CapturingLogger::default()),
    )
    .with_retry_policy(RetryPolicy::new(2, Duration::ZERO).with_classifier(|e| {
        if e.message.contains("expired") {
            ErrorClass::Transient
        } else {
            ErrorClass::Fatal
        }
    }));

    let result = orch.generate(Role::Main, request()).await.unwrap();
    assert_eq!(main.calls(), 2);
    assert_eq!(result.output.as_text(), Some("refreshed"));
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_exponentially() {
    let main = Arc::new(
        MockProvider::new("alpha")
            .then_err(ProviderErrorKind::RateLimited, "429")
            .then_err(ProviderErrorKind::RateLimited, "429")
            .then_ok("ok"),
    );

    let orch = orchestrator(
        Arc::new(three_roles()),
        &[Arc::clone(&main)],
        Arc::new(CapturingLogger::default()),
    )
    .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(1)));

    let started = tokio::time::Instant::now();
    orch.generate(Role::Main, request()).await.unwrap();

    // 1s before the second try, 2s before the third
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(main.calls(), 3);
}

#[test]
fn exhausted_error_is_not_configuration() {
    let err = AiError::AllRolesExhausted {
        message: "x".to_string(),
        attempts: Vec::new(),
    };
    assert!(!err.is_configuration());
}
