//! Error types for role-routed generation.

use std::any::Any;

use thiserror::Error;

use crate::ai::attempt::AttemptRecord;
use crate::ai::provider::ProviderError;

/// Errors surfaced to callers of the generation layer.
#[derive(Debug, Error)]
pub enum AiError {
    /// A role has no usable provider/model binding. Never retried or skipped.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single provider call failed. Only escapes the orchestrator when a
    /// caller talks to an adapter directly.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every role in the fallback sequence was skipped or failed.
    #[error("{message}")]
    AllRolesExhausted {
        /// Human-readable summary listing the sequence and per-role errors.
        message: String,
        /// Every attempt made during the call, in order.
        attempts: Vec<AttemptRecord>,
    },

    /// The model's output could not be parsed into the requested shape.
    #[error("Failed to parse AI response: {reason}")]
    ResponseParse {
        /// Parser error and offending text.
        reason: String,
    },

    /// IO error (reading configuration).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AiError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Attempts recorded before the sequence was exhausted, if any.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::AllRolesExhausted { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

/// Text carried by a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Result alias for the generation layer.
pub type AiResult<T> = std::result::Result<T, AiError>;
