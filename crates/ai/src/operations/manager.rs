//! Async Operation Manager.
//!
//! Runs units of work in the background and tracks their lifecycle.
//! `submit` registers the operation, spawns it onto the tokio runtime and
//! returns the id without waiting. Finished operations move into a bounded
//! history that evicts the earliest completion when full.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use futures::FutureExt;
use serde_json::{json, Value};
use uuid::Uuid;

use super::context::{ExecutionContext, WorkContext};
use super::history::{OperationHistory, DEFAULT_HISTORY_CAPACITY};
use super::models::{
    OperationError, OperationEvent, OperationEventKind, OperationNotFound, OperationSnapshot,
    OperationStatus, StatusReport, OPERATION_EXECUTION_ERROR, OPERATION_START_FAILED,
};
use crate::errors::panic_message;
use crate::logging::{LogLevel, Logger, TracingLogger};

/// Callback invoked for subscribed events.
pub type OperationListener = Arc<dyn Fn(&OperationEvent) + Send + Sync>;

/// An operation that has not finished yet.
struct ActiveOperation {
    snapshot: OperationSnapshot,
    logger: Arc<dyn Logger>,
}

struct ManagerState {
    active: HashMap<String, ActiveOperation>,
    history: OperationHistory,
}

struct Inner {
    state: Mutex<ManagerState>,
    listeners: RwLock<Vec<(OperationEventKind, OperationListener)>>,
}

/// Handle to a background operation manager.
///
/// Cloning is cheap; clones share the same operations.
#[derive(Clone)]
pub struct AsyncOperationManager {
    inner: Arc<Inner>,
}

impl AsyncOperationManager {
    /// Manager retaining the default number of finished operations.
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Manager retaining at most `capacity` finished operations.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ManagerState {
                    active: HashMap::new(),
                    history: OperationHistory::new(capacity),
                }),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Start `work(args, ctx)` in the background and return its id.
    ///
    /// Errors and panics from the work are recorded on the operation,
    /// never returned here.
    pub fn submit<F, Fut>(&self, work: F, args: Value, context: ExecutionContext) -> String
    where
        F: FnOnce(Value, WorkContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        let id = Uuid::new_v4().to_string();
        let logger = context
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn Logger>);

        self.lock().active.insert(
            id.clone(),
            ActiveOperation {
                snapshot: OperationSnapshot::pending(&id),
                logger: Arc::clone(&logger),
            },
        );
        logger.log(
            LogLevel::Debug,
            &format!("Operation {id} registered"),
            Some(&json!({ "operationId": id })),
        );

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.mark_running(&id);
            self.finish(
                &id,
                Err(OperationError::new(
                    OPERATION_START_FAILED,
                    "No async runtime available to run the operation",
                )),
            );
            return id;
        };

        let work_ctx = WorkContext::new(&id, logger, context.progress);
        let manager = self.clone();
        let operation_id = id.clone();

        runtime.spawn(async move {
            manager.mark_running(&operation_id);
            let outcome = Self::execute(work, args, work_ctx).await;
            manager.finish(&operation_id, outcome);
        });

        id
    }

    /// Current status of `operation_id`.
    ///
    /// Checks active operations, then history.
    pub fn get_status(&self, operation_id: &str) -> StatusReport {
        let state = self.lock();

        if let Some(op) = state.active.get(operation_id) {
            return StatusReport::Found(op.snapshot.clone());
        }
        if let Some(snapshot) = state.history.get(operation_id) {
            return StatusReport::Found(snapshot.clone());
        }

        StatusReport::NotFound(OperationNotFound::new(operation_id))
    }

    /// Subscribe `listener` to `kind` events.
    pub fn on(&self, kind: OperationEventKind, listener: OperationListener) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, listener));
    }

    /// Snapshots of operations that have not finished.
    pub fn active_operations(&self) -> Vec<OperationSnapshot> {
        self.lock()
            .active
            .values()
            .map(|op| op.snapshot.clone())
            .collect()
    }

    /// Number of operations that have not finished.
    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// Number of finished operations retained.
    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    async fn execute<F, Fut>(
        work: F,
        args: Value,
        ctx: WorkContext,
    ) -> Result<Value, OperationError>
    where
        F: FnOnce(Value, WorkContext) -> Fut,
        Fut: Future<Output = Result<Value, OperationError>>,
    {
        // Panics while building the future count the same as panics while polling it
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| work(args, ctx))) {
            Ok(future) => future,
            Err(panic) => return Err(panic_error(&*panic)),
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(panic_error(&*panic)),
        }
    }

    fn mark_running(&self, operation_id: &str) {
        {
            let mut state = self.lock();
            let Some(op) = state.active.get_mut(operation_id) else {
                return;
            };
            op.snapshot.status = OperationStatus::Running;
        }

        self.emit(&OperationEvent::StatusChanged {
            operation_id: operation_id.to_string(),
            status: OperationStatus::Running,
            result: None,
            error: None,
        });
    }

    /// Record the terminal state and move the operation into history.
    fn finish(&self, operation_id: &str, outcome: Result<Value, OperationError>) {
        let (snapshot, logger) = {
            let mut state = self.lock();
            let Some(mut op) = state.active.remove(operation_id) else {
                return;
            };

            match outcome {
                Ok(result) => {
                    op.snapshot.status = OperationStatus::Completed;
                    op.snapshot.result = Some(result);
                }
                Err(error) => {
                    op.snapshot.status = OperationStatus::Failed;
                    op.snapshot.error = Some(error);
                }
            }
            op.snapshot.end_time = Some(Utc::now());

            for evicted in state.history.insert(op.snapshot.clone()) {
                tracing::debug!(operation_id = %evicted.id, "Evicted operation from history");
            }
            (op.snapshot, op.logger)
        };

        match &snapshot.error {
            None => logger.log(
                LogLevel::Info,
                &format!("Operation {operation_id} completed"),
                Some(&json!({ "operationId": operation_id })),
            ),
            Some(error) => logger.log(
                LogLevel::Error,
                &format!("Operation {operation_id} failed: {error}"),
                Some(&json!({ "operationId": operation_id, "code": error.code })),
            ),
        }

        self.emit(&OperationEvent::StatusChanged {
            operation_id: snapshot.id,
            status: snapshot.status,
            result: snapshot.result,
            error: snapshot.error,
        });
    }

    fn emit(&self, event: &OperationEvent) {
        let listeners: Vec<OperationListener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(kind, _)| *kind == event.kind())
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        // A failing listener must not stall the transition or starve the others
        for listener in listeners {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                tracing::error!(
                    operation_id = %event.operation_id(),
                    status = %event.status(),
                    "statusChanged listener panicked: {}",
                    panic_message(&*panic)
                );
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AsyncOperationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncOperationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperationManager")
            .field("active", &self.active_count())
            .field("history", &self.history_len())
            .finish()
    }
}

fn panic_error(panic: &(dyn Any + Send)) -> OperationError {
    OperationError::new(
        OPERATION_EXECUTION_ERROR,
        format!("Operation panicked: {}", panic_message(panic)),
    )
}
