//! Collection and querying of telemetry records.
//!
//! ## Quick Start
//!
//! ```rust
//! use taskmaster_cost::tracking::{CostTracker, TelemetryFilter};
//! use taskmaster_cost::{PriceTable, TelemetryRecord};
//!
//! let prices = PriceTable::builtin();
//! let tracker = CostTracker::new();
//!
//! tracker.record(TelemetryRecord::from_usage(
//!     "parse-prd",
//!     "main",
//!     "anthropic",
//!     "claude-sonnet-4-20250514",
//!     1_000,
//!     500,
//!     &prices,
//! ));
//!
//! let calls = tracker.query(&TelemetryFilter::new().with_command("parse-prd"));
//! assert_eq!(calls.len(), 1);
//!
//! let aggregate = tracker.aggregate("parse-prd").unwrap();
//! assert_eq!(aggregate.total_tokens, 1_500);
//! ```

mod models;
mod tracker;

pub use models::TelemetryFilter;
pub use tracker::CostTracker;
