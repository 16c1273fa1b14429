//! Operation records, status reports and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::errors::AiError;

/// A unit of work raised or panicked.
pub const OPERATION_EXECUTION_ERROR: &str = "OPERATION_EXECUTION_ERROR";

/// The unit of work could not be started.
pub const OPERATION_START_FAILED: &str = "OPERATION_START_FAILED";

/// No active or retained operation has the requested id.
pub const OPERATION_NOT_FOUND: &str = "OPERATION_NOT_FOUND";

/// Lifecycle state of an operation.
///
/// Transitions are `pending -> running -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Registered, not yet started
    Pending,
    /// Executing
    Running,
    /// Finished with a result
    Completed,
    /// Finished with an error
    Failed,
}

impl OperationStatus {
    /// Whether the status is final.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure recorded on an operation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct OperationError {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Extra diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl OperationError {
    /// Create an error with `code` and `message`.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach diagnostics.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Execution failure with `message`.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(OPERATION_EXECUTION_ERROR, message)
    }
}

impl From<anyhow::Error> for OperationError {
    fn from(err: anyhow::Error) -> Self {
        Self::execution(format!("{err:#}"))
    }
}

impl From<AiError> for OperationError {
    fn from(err: AiError) -> Self {
        match &err {
            AiError::Configuration(_) => Self::new("CONFIGURATION_ERROR", err.to_string()),
            AiError::AllRolesExhausted { attempts, .. } => {
                let details = serde_json::to_value(attempts).unwrap_or(Value::Null);
                Self::new("ALL_ROLES_EXHAUSTED", err.to_string())
                    .with_details(json!({ "attempts": details }))
            }
            _ => Self::execution(err.to_string()),
        }
    }
}

/// Point-in-time view of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSnapshot {
    /// Operation id (UUID v4)
    pub id: String,
    /// Current status
    pub status: OperationStatus,
    /// When the operation was submitted
    pub start_time: DateTime<Utc>,
    /// When the operation reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Result of a completed operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error of a failed operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl OperationSnapshot {
    /// A freshly registered operation.
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: OperationStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            result: None,
            error: None,
        }
    }
}

/// Returned by status lookups for unknown or evicted ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationNotFound {
    /// Requested id
    pub id: String,
    /// Always `not_found`
    pub status: String,
    /// Error with code `OPERATION_NOT_FOUND`
    pub error: OperationError,
}

impl OperationNotFound {
    /// Report for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            error: OperationError::new(
                OPERATION_NOT_FOUND,
                format!("Operation {id} not found. It may have been evicted from history."),
            ),
            id,
            status: "not_found".to_string(),
        }
    }
}

/// Result of a status lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusReport {
    /// The operation is active or retained in history
    Found(OperationSnapshot),
    /// No such operation
    NotFound(OperationNotFound),
}

impl StatusReport {
    /// Status of a found operation.
    pub fn status(&self) -> Option<OperationStatus> {
        match self {
            Self::Found(s) => Some(s.status),
            Self::NotFound(_) => None,
        }
    }

    /// Whether the lookup missed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The snapshot, if found.
    pub fn snapshot(&self) -> Option<&OperationSnapshot> {
        match self {
            Self::Found(s) => Some(s),
            Self::NotFound(_) => None,
        }
    }

    /// Consume into the snapshot, if found.
    pub fn into_snapshot(self) -> Option<OperationSnapshot> {
        match self {
            Self::Found(s) => Some(s),
            Self::NotFound(_) => None,
        }
    }
}

/// Event names listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationEventKind {
    /// An operation changed status
    #[serde(rename = "statusChanged")]
    StatusChanged,
}

/// Event delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OperationEvent {
    /// An operation moved to `status`.
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        /// Operation id
        operation_id: String,
        /// New status
        status: OperationStatus,
        /// Result, on completion
        result: Option<Value>,
        /// Error, on failure
        error: Option<OperationError>,
    },
}

impl OperationEvent {
    /// Kind of this event.
    pub fn kind(&self) -> OperationEventKind {
        match self {
            Self::StatusChanged { .. } => OperationEventKind::StatusChanged,
        }
    }

    /// Id of the operation the event concerns.
    pub fn operation_id(&self) -> &str {
        match self {
            Self::StatusChanged { operation_id, .. } => operation_id,
        }
    }

    /// Status carried by the event.
    pub fn status(&self) -> OperationStatus {
        match self {
            Self::StatusChanged { status, .. } => *status,
        }
    }
}
