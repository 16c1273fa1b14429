//! Telemetry records for successful generation calls and their aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::PriceTable;

/// Token usage and derived cost of one successful generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// When the record was produced.
    pub timestamp: DateTime<Utc>,
    /// Logical command the call belongs to (e.g. `parse-prd`).
    pub command_name: String,
    /// Role that served the call (`main`, `research`, `fallback`).
    pub role: String,
    /// Provider that served the call.
    pub provider: String,
    /// Model that served the call.
    pub model_id: String,
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
    /// Input plus output tokens.
    pub total_tokens: u64,
    /// Cost of the call, unset when the model has no price entry.
    pub total_cost: Option<f64>,
    /// Currency of `total_cost`.
    pub currency: Option<String>,
}

impl TelemetryRecord {
    /// Build a record from usage counters, pricing them against `prices`.
    #[must_use]
    pub fn from_usage(
        command_name: impl Into<String>,
        role: impl Into<String>,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        prices: &PriceTable,
    ) -> Self {
        let provider = provider.into();
        let model_id = model_id.into();
        let cost = prices.compute_cost(&provider, &model_id, input_tokens, output_tokens);

        Self {
            timestamp: Utc::now(),
            command_name: command_name.into(),
            role: role.into(),
            provider,
            model_id,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            total_cost: cost.as_ref().map(|c| c.total_cost),
            currency: cost.map(|c| c.currency),
        }
    }

    /// Whether a price was known for the model.
    #[must_use]
    pub fn has_cost(&self) -> bool {
        self.total_cost.is_some()
    }
}

/// Sum of several telemetry records belonging to one logical command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTelemetry {
    /// When the aggregate was built.
    pub timestamp: DateTime<Utc>,
    /// Command the merged records belong to.
    pub command_name: String,
    /// Number of records merged.
    pub record_count: usize,
    /// Total input tokens.
    pub input_tokens: u64,
    /// Total output tokens.
    pub output_tokens: u64,
    /// Total tokens.
    pub total_tokens: u64,
    /// Sum of all known costs; unset when no record carried a cost.
    pub total_cost: Option<f64>,
    /// Currency of `total_cost`.
    pub currency: Option<String>,
    /// True when at least one merged record had no known cost, or a cost in
    /// another currency than `currency`.
    pub partial_cost: bool,
    /// Distinct providers, in first-seen order.
    pub providers: Vec<String>,
    /// Distinct models, in first-seen order.
    pub models: Vec<String>,
}

/// Merge the records of `command_name` into one aggregate.
///
/// Records of other commands are ignored. Returns `None` when nothing matches.
#[must_use]
pub fn merge(command_name: &str, records: &[TelemetryRecord]) -> Option<AggregateTelemetry> {
    let matching: Vec<&TelemetryRecord> = records
        .iter()
        .filter(|r| r.command_name == command_name)
        .collect();

    if matching.is_empty() {
        return None;
    }

    let mut aggregate = AggregateTelemetry {
        timestamp: Utc::now(),
        command_name: command_name.to_string(),
        record_count: matching.len(),
        input_tokens: 0,
        output_tokens: 0,
        total_tokens: 0,
        total_cost: None,
        currency: None,
        partial_cost: false,
        providers: Vec::new(),
        models: Vec::new(),
    };

    for record in matching {
        aggregate.input_tokens += record.input_tokens;
        aggregate.output_tokens += record.output_tokens;
        aggregate.total_tokens += record.total_tokens;

        match record.total_cost {
            // Costs in another currency than the first priced record are not summed
            Some(_) if aggregate.currency.is_some() && aggregate.currency != record.currency => {
                aggregate.partial_cost = true;
            }
            Some(cost) => {
                aggregate.total_cost = Some(aggregate.total_cost.unwrap_or(0.0) + cost);
                if aggregate.currency.is_none() {
                    aggregate.currency.clone_from(&record.currency);
                }
            }
            None => aggregate.partial_cost = true,
        }

        if !aggregate.providers.contains(&record.provider) {
            aggregate.providers.push(record.provider.clone());
        }
        if !aggregate.models.contains(&record.model_id) {
            aggregate.models.push(record.model_id.clone());
        }
    }

    Some(aggregate)
}
