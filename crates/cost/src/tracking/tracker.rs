//! In-memory sink for telemetry records.

use std::sync::{Arc, RwLock};

use super::models::TelemetryFilter;
use crate::telemetry::{merge, AggregateTelemetry, TelemetryRecord};

/// A thread-safe collector of telemetry records.
///
/// Cloning yields another handle onto the same records.
#[derive(Debug, Clone)]
pub struct CostTracker {
    records: Arc<RwLock<Vec<TelemetryRecord>>>,
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CostTracker {
    /// Create a new, empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record a telemetry record.
    pub fn record(&self, record: TelemetryRecord) {
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }

    /// Query records with a filter.
    #[must_use]
    pub fn query(&self, filter: &TelemetryFilter) -> Vec<TelemetryRecord> {
        self.records
            .read()
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all records.
    #[must_use]
    pub fn all(&self) -> Vec<TelemetryRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Merge every record of one command.
    #[must_use]
    pub fn aggregate(&self, command_name: &str) -> Option<AggregateTelemetry> {
        let records = self.query(&TelemetryFilter::new().with_command(command_name));
        merge(command_name, &records)
    }

    /// Sum of all known costs.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.records
            .read()
            .map(|records| records.iter().filter_map(|r| r.total_cost).sum())
            .unwrap_or(0.0)
    }

    /// Clear all records.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if the tracker is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export all records to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{ModelPrice, PriceTable};

    fn record(command: &str, role: &str, provider: &str, model: &str) -> TelemetryRecord {
        let prices = PriceTable::empty("USD").with_price("anthropic", "sonnet", ModelPrice::new(3.0, 15.0));
        TelemetryRecord::from_usage(command, role, provider, model, 1_000, 500, &prices)
    }

    #[test]
    fn test_tracker_record_and_query() {
        let tracker = CostTracker::new();
        tracker.record(record("parse-prd", "main", "anthropic", "sonnet"));
        tracker.record(record("expand", "research", "perplexity", "sonar-pro"));

        assert_eq!(tracker.len(), 2);

        let results = tracker.query(&TelemetryFilter::new().with_role("research"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].command_name, "expand");

        let results = tracker.query(&TelemetryFilter::new().with_provider("anthropic"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].model_id, "sonnet");
    }

    #[test]
    fn test_aggregate_by_command() {
        let tracker = CostTracker::new();
        tracker.record(record("expand-all", "main", "anthropic", "sonnet"));
        tracker.record(record("expand-all", "main", "anthropic", "sonnet"));
        tracker.record(record("other", "main", "anthropic", "sonnet"));

        let aggregate = tracker.aggregate("expand-all").unwrap();
        assert_eq!(aggregate.record_count, 2);
        assert_eq!(aggregate.input_tokens, 2_000);
        assert!(tracker.aggregate("missing").is_none());
    }

    #[test]
    fn test_total_cost_skips_unpriced() {
        let tracker = CostTracker::new();
        tracker.record(record("cmd", "main", "anthropic", "sonnet"));
        tracker.record(record("cmd", "main", "ollama", "llama"));

        let expected = (1_000.0 * 3.0 + 500.0 * 15.0) / 1e6;
        assert!((tracker.total_cost() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_clones_share_records() {
        let tracker = CostTracker::new();
        let handle = tracker.clone();
        handle.record(record("cmd", "main", "anthropic", "sonnet"));

        assert_eq!(tracker.len(), 1);
        let json = tracker.export_json().unwrap();
        assert!(json.contains("\"commandName\": \"cmd\""));

        tracker.clear();
        assert!(handle.is_empty());
    }
}
