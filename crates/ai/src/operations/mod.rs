//! Background operations with lifecycle tracking and bounded history.
//!
//! ```rust,ignore
//! let manager = AsyncOperationManager::new();
//! let id = manager.submit(
//!     |args, ctx| async move {
//!         ctx.report_progress(ProgressEvent::new(1.0).with_total(2.0));
//!         Ok(args)
//!     },
//!     json!({"taskId": 7}),
//!     ExecutionContext::new(),
//! );
//! let report = manager.get_status(&id);
//! ```

mod context;
mod history;
mod manager;
mod models;

pub use context::{ExecutionContext, WorkContext};
pub use history::{OperationHistory, DEFAULT_HISTORY_CAPACITY};
pub use manager::{AsyncOperationManager, OperationListener};
pub use models::{
    OperationError, OperationEvent, OperationEventKind, OperationNotFound, OperationSnapshot,
    OperationStatus, StatusReport, OPERATION_EXECUTION_ERROR, OPERATION_NOT_FOUND,
    OPERATION_START_FAILED,
};
