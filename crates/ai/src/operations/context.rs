//! Contexts handed to and by the operation manager.

use std::sync::Arc;

use crate::logging::Logger;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressSink};

/// What the submitter supplies: where logs and progress should go.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    /// Logger for the operation; the tracing logger when unset
    pub logger: Option<Arc<dyn Logger>>,
    /// Sink receiving relayed progress events
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl ExecutionContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("logger", &self.logger.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// What the unit of work receives.
#[derive(Clone)]
pub struct WorkContext {
    operation_id: String,
    logger: Arc<dyn Logger>,
    progress: ProgressReporter,
}

impl WorkContext {
    pub(crate) fn new(
        operation_id: impl Into<String>,
        logger: Arc<dyn Logger>,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            progress: ProgressReporter::new(sink, Arc::clone(&logger)),
            logger,
        }
    }

    /// Id of the running operation.
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Logger for the operation.
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Reporter relaying to the submitter's sink; pass it on to
    /// [`GenerationRequest::with_progress`](crate::ai::GenerationRequest::with_progress).
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Relay one progress event to the submitter's sink.
    pub fn report_progress(&self, event: ProgressEvent) {
        self.progress.report(event);
    }
}

impl std::fmt::Debug for WorkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkContext")
            .field("operation_id", &self.operation_id)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}
