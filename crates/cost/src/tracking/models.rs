//! Query filters over recorded telemetry.

use chrono::{DateTime, Utc};

use crate::telemetry::TelemetryRecord;

/// Filter criteria for querying telemetry records.
#[derive(Debug, Clone, Default)]
pub struct TelemetryFilter {
    /// Filter by command name.
    pub command_name: Option<String>,
    /// Filter by role.
    pub role: Option<String>,
    /// Filter by provider.
    pub provider: Option<String>,
    /// Filter by model.
    pub model_id: Option<String>,
    /// Filter by start time (inclusive).
    pub start_time: Option<DateTime<Utc>>,
    /// Filter by end time (exclusive).
    pub end_time: Option<DateTime<Utc>>,
}

impl TelemetryFilter {
    /// Create a new empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by command name.
    #[must_use]
    pub fn with_command(mut self, command_name: impl Into<String>) -> Self {
        self.command_name = Some(command_name.into());
        self
    }

    /// Filter by role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Filter by provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Filter by model.
    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Filter by time range.
    #[must_use]
    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Check if a record matches this filter.
    #[must_use]
    pub fn matches(&self, record: &TelemetryRecord) -> bool {
        if let Some(ref command_name) = self.command_name {
            if &record.command_name != command_name {
                return false;
            }
        }

        if let Some(ref role) = self.role {
            if &record.role != role {
                return false;
            }
        }

        if let Some(ref provider) = self.provider {
            if &record.provider != provider {
                return false;
            }
        }

        if let Some(ref model_id) = self.model_id {
            if &record.model_id != model_id {
                return false;
            }
        }

        if let Some(start_time) = self.start_time {
            if record.timestamp < start_time {
                return false;
            }
        }

        if let Some(end_time) = self.end_time {
            if record.timestamp >= end_time {
                return false;
            }
        }

        true
    }
}
