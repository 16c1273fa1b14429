//! Static per-provider, per-model token prices.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Currency used by the built-in price table.
pub const DEFAULT_CURRENCY: &str = "USD";

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Price of one model, expressed per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Price per million input (prompt) tokens.
    #[serde(rename = "input")]
    pub input_per_million: f64,
    /// Price per million output (completion) tokens.
    #[serde(rename = "output")]
    pub output_per_million: f64,
}

impl ModelPrice {
    /// Create a new price entry.
    #[must_use]
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of a call with the given token counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Token counts stay far below 2^52
    pub fn cost_for(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / TOKENS_PER_MILLION) * self.input_per_million
            + (output_tokens as f64 / TOKENS_PER_MILLION) * self.output_per_million
    }
}

/// Monetary cost of a single call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cost of the input tokens.
    pub input_cost: f64,
    /// Cost of the output tokens.
    pub output_cost: f64,
    /// Sum of input and output cost.
    pub total_cost: f64,
    /// Currency code (e.g. `USD`).
    pub currency: String,
}

/// Lookup table of model prices keyed by provider, then model id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default)]
    currency: String,
    providers: HashMap<String, HashMap<String, ModelPrice>>,
}

impl PriceTable {
    /// Create an empty table priced in `currency`.
    #[must_use]
    pub fn empty(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            providers: HashMap::new(),
        }
    }

    /// Table with the prices of the models the built-in adapters serve.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty(DEFAULT_CURRENCY);
        for (provider, model, input, output) in BUILTIN_PRICES {
            table.insert(*provider, *model, ModelPrice::new(*input, *output));
        }
        table
    }

    /// Add or replace a price entry.
    #[must_use]
    pub fn with_price(
        mut self,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        price: ModelPrice,
    ) -> Self {
        self.insert(provider, model_id, price);
        self
    }

    /// Add or replace a price entry in place.
    pub fn insert(
        &mut self,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        price: ModelPrice,
    ) {
        self.providers
            .entry(provider.into().to_lowercase())
            .or_default()
            .insert(model_id.into(), price);
    }

    /// Currency the table is priced in.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Look up the price of a model. Provider names are case-insensitive.
    #[must_use]
    pub fn price(&self, provider: &str, model_id: &str) -> Option<ModelPrice> {
        self.providers
            .get(&provider.to_lowercase())
            .and_then(|models| models.get(model_id))
            .copied()
    }

    /// Compute the cost of a call.
    ///
    /// Unknown provider/model combinations yield `None`; pricing never fails
    /// a generation.
    #[must_use]
    pub fn compute_cost(
        &self,
        provider: &str,
        model_id: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Option<CostBreakdown> {
        let Some(price) = self.price(provider, model_id) else {
            tracing::debug!(provider, model_id, "No price entry, cost left unset");
            return None;
        };

        let input_cost = price.cost_for(input_tokens, 0);
        let output_cost = price.cost_for(0, output_tokens);
        Some(CostBreakdown {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
            currency: self.currency.clone(),
        })
    }

    /// Parse a table from JSON of the form
    /// `{"currency": "USD", "providers": {"anthropic": {"model": {"input": 3, "output": 15}}}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match that shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut table: Self = serde_json::from_str(json)?;
        table.providers = table
            .providers
            .into_iter()
            .map(|(provider, models)| (provider.to_lowercase(), models))
            .collect();
        if table.currency.is_empty() {
            table.currency = DEFAULT_CURRENCY.to_string();
        }
        Ok(table)
    }
}

/// (provider, model, input $/1M, output $/1M)
const BUILTIN_PRICES: &[(&str, &str, f64, f64)] = &[
    // Anthropic
    ("anthropic", "claude-opus-4-1-20250805", 15.0, 75.0),
    ("anthropic", "claude-opus-4-20250514", 15.0, 75.0),
    ("anthropic", "claude-sonnet-4-5-20250929", 3.0, 15.0),
    ("anthropic", "claude-sonnet-4-20250514", 3.0, 15.0),
    ("anthropic", "claude-3-7-sonnet-20250219", 3.0, 15.0),
    ("anthropic", "claude-3-5-haiku-20241022", 0.8, 4.0),
    // OpenAI
    ("openai", "gpt-4o", 2.5, 10.0),
    ("openai", "gpt-4o-mini", 0.15, 0.6),
    ("openai", "gpt-4-turbo", 10.0, 30.0),
    ("openai", "o1", 15.0, 60.0),
    ("openai", "o3-mini", 1.1, 4.4),
    // Perplexity
    ("perplexity", "sonar-pro", 3.0, 15.0),
    ("perplexity", "sonar", 1.0, 1.0),
    ("perplexity", "sonar-reasoning-pro", 2.0, 8.0),
    ("perplexity", "sonar-reasoning", 1.0, 5.0),
    // Local models are free to run
    ("ollama", "llama3.1", 0.0, 0.0),
    ("ollama", "qwen3:32b", 0.0, 0.0),
    ("ollama", "devstral:latest", 0.0, 0.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_cost_per_million() {
        let table =
            PriceTable::empty("USD").with_price("anthropic", "m", ModelPrice::new(3.0, 15.0));
        let cost = table.compute_cost("anthropic", "m", 10, 20).unwrap();

        let expected = 10.0 / 1e6 * 3.0 + 20.0 / 1e6 * 15.0;
        assert!((cost.total_cost - expected).abs() < 1e-12);
        assert!((cost.input_cost - 0.000_03).abs() < 1e-12);
        assert_eq!(cost.currency, "USD");
    }

    #[test]
    fn test_unknown_model_has_no_cost() {
        let table = PriceTable::builtin();
        assert!(table.compute_cost("anthropic", "not-a-model", 10, 10).is_none());
        assert!(table.compute_cost("nobody", "gpt-4o", 10, 10).is_none());
    }

    #[test]
    fn test_provider_lookup_is_case_insensitive() {
        let table = PriceTable::builtin();
        assert!(table.price("Anthropic", "claude-sonnet-4-20250514").is_some());
    }

    #[test]
    fn test_local_models_are_free() {
        let table = PriceTable::builtin();
        let cost = table.compute_cost("ollama", "llama3.1", 5_000, 5_000).unwrap();
        assert!(cost.total_cost.abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_json() {
        let table = PriceTable::from_json(
            r#"{"currency": "", "providers": {"OpenAI": {"gpt-x": {"input": 1.0, "output": 2.0}}}}"#,
        )
        .unwrap();
        assert_eq!(table.currency(), "USD");
        assert_eq!(table.price("openai", "gpt-x"), Some(ModelPrice::new(1.0, 2.0)));
    }
}
