//! Core entities.

mod config;

pub use config::{GlobalConfig, ModelConfig, ModelSettings, TaskmasterConfig};
