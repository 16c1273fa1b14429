#![allow(clippy::doc_markdown)] // Allow brand names like OpenAI, Anthropic without backticks

//! Token pricing and cost telemetry for AI generation calls.
//!
//! This crate turns the usage counters returned by a provider into a
//! priced [`TelemetryRecord`] and merges several records into one
//! [`AggregateTelemetry`] when a logical command issues more than one call.
//!
//! - [`PriceTable`] - static price-per-million-token table per provider/model
//! - [`TelemetryRecord`] - usage and cost of one successful call
//! - [`merge`] - sums records sharing a command name
//! - [`tracking::CostTracker`] - thread-safe in-memory record sink
//!
//! Pricing never fails: an unknown provider/model combination produces a
//! record whose `total_cost` is `None`.
//!
//! ```rust
//! use taskmaster_cost::{ModelPrice, PriceTable};
//!
//! let table = PriceTable::empty("USD").with_price("anthropic", "sonnet", ModelPrice::new(3.0, 15.0));
//! let cost = table.compute_cost("anthropic", "sonnet", 10, 20).unwrap();
//! assert!((cost.total_cost - 0.000_33).abs() < 1e-12);
//! ```

pub mod pricing;
pub mod telemetry;
pub mod tracking;

pub use pricing::{CostBreakdown, ModelPrice, PriceTable, DEFAULT_CURRENCY};
pub use telemetry::{merge, AggregateTelemetry, TelemetryRecord};
pub use tracking::{CostTracker, TelemetryFilter};
