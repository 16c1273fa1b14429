//! Progress events and their relay to a caller-supplied sink.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::panic_message;
use crate::logging::{LogLevel, Logger, TracingLogger};

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Units of work done so far.
    pub progress: f64,
    /// Total units, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Optional human-readable status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    /// Create an event with only a progress value.
    #[must_use]
    pub fn new(progress: f64) -> Self {
        Self {
            progress,
            total: None,
            message: None,
        }
    }

    /// Set the total.
    #[must_use]
    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Failure reported by a progress sink.
#[derive(Debug, Error)]
#[error("Progress sink failed: {0}")]
pub struct ProgressError(pub String);

/// Receiver of progress events, supplied by the original caller.
pub trait ProgressSink: Send + Sync {
    /// Deliver one event.
    fn report(&self, event: &ProgressEvent) -> Result<(), ProgressError>;
}

/// Relays progress events to an optional sink.
///
/// Sink failures, including panics, are logged and swallowed; reporting
/// never fails the caller.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
    logger: Arc<dyn Logger>,
}

impl ProgressReporter {
    /// Relay to `sink`, logging relay failures to `logger`.
    pub fn new(sink: Option<Arc<dyn ProgressSink>>, logger: Arc<dyn Logger>) -> Self {
        Self { sink, logger }
    }

    /// A reporter that drops every event.
    pub fn noop() -> Self {
        Self::new(None, Arc::new(TracingLogger))
    }

    /// Whether a sink is attached.
    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    /// Relay one event synchronously.
    pub fn report(&self, event: ProgressEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        // A sink that panics is treated like one that returns an error
        let failure = match std::panic::catch_unwind(AssertUnwindSafe(|| sink.report(&event))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("Progress sink panicked: {}", panic_message(&*panic)),
        };

        self.logger.log(
            LogLevel::Warn,
            &format!("Failed to relay progress: {failure}"),
            Some(&serde_json::json!({ "progress": event.progress })),
        );
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Collect(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Collect {
        fn report(&self, event: &ProgressEvent) -> Result<(), ProgressError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Broken;

    impl ProgressSink for Broken {
        fn report(&self, _event: &ProgressEvent) -> Result<(), ProgressError> {
            Err(ProgressError("socket closed".to_string()))
        }
    }

    #[test]
    fn test_reporter_relays_events() {
        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let reporter = ProgressReporter::new(
            Some(Arc::clone(&sink) as Arc<dyn ProgressSink>),
            Arc::new(TracingLogger),
        );

        reporter.report(ProgressEvent::new(1.0).with_total(4.0));
        reporter.report(ProgressEvent::new(2.0).with_message("halfway"));

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].message.as_deref(), Some("halfway"));
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let reporter = ProgressReporter::new(Some(Arc::new(Broken)), Arc::new(TracingLogger));
        reporter.report(ProgressEvent::new(1.0));
        assert!(reporter.is_active());
    }

    struct Exploding;

    impl ProgressSink for Exploding {
        fn report(&self, _event: &ProgressEvent) -> Result<(), ProgressError> {
            panic!("transport gone");
        }
    }

    #[test]
    fn test_sink_panic_is_swallowed() {
        let reporter = ProgressReporter::new(Some(Arc::new(Exploding)), Arc::new(TracingLogger));
        reporter.report(ProgressEvent::new(1.0));
        reporter.report(ProgressEvent::new(2.0));
    }

    #[test]
    fn test_noop_reporter() {
        let reporter = ProgressReporter::noop();
        assert!(!reporter.is_active());
        reporter.report(ProgressEvent::new(1.0));
    }
}
