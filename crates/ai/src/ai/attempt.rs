//! Per-role attempt records kept during a generation call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderErrorKind;
use crate::config::Role;

/// How one attempt against a role ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The provider returned a result.
    Success,
    /// A retryable failure (rate limit, overload, timeout).
    TransientFailure {
        /// Failure classification
        kind: ProviderErrorKind,
        /// Error message
        message: String,
    },
    /// A failure that ends this role.
    FatalFailure {
        /// Failure classification, when it came from a provider
        kind: Option<ProviderErrorKind>,
        /// Error message
        message: String,
    },
    /// The provider needed a credential that is not set.
    SkippedNoCredential,
}

impl AttemptOutcome {
    /// Whether the attempt produced a result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Short description used in exhaustion summaries.
    pub fn describe(&self) -> String {
        match self {
            Self::Success => "succeeded".to_string(),
            Self::TransientFailure { message, .. } | Self::FatalFailure { message, .. } => {
                message.clone()
            }
            Self::SkippedNoCredential => "skipped: credential not set".to_string(),
        }
    }
}

/// One attempt against one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    /// Role attempted
    pub role: Role,
    /// Provider bound to the role
    pub provider: String,
    /// Model bound to the role
    pub model_id: String,
    /// 1-based try number within the role (0 when skipped)
    pub attempt: u32,
    /// What happened
    pub outcome: AttemptOutcome,
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    /// Record an attempt finishing now.
    pub fn new(
        role: Role,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        attempt: u32,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            role,
            provider: provider.into(),
            model_id: model_id.into(),
            attempt,
            outcome,
            timestamp: Utc::now(),
        }
    }
}
