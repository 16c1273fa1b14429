//! Logger collaborator and tracing setup.
//!
//! Components that report to a caller-supplied logger (the orchestrator and
//! the background operation manager) go through the [`Logger`] trait. The
//! default implementation, [`TracingLogger`], forwards to `tracing`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::GlobalConfig;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Get the level as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sink for `(level, message, meta?)` log lines.
pub trait Logger: Send + Sync {
    /// Emit one log line.
    fn log(&self, level: LogLevel, message: &str, meta: Option<&Value>);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, None);
    }
}

/// Default logger: forwards every line to `tracing` under the
/// `taskmaster_ai` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, meta: Option<&Value>) {
        let meta = meta.map(ToString::to_string).unwrap_or_default();
        match level {
            LogLevel::Debug => tracing::debug!(meta = %meta, "{message}"),
            LogLevel::Info => tracing::info!(meta = %meta, "{message}"),
            LogLevel::Warn => tracing::warn!(meta = %meta, "{message}"),
            LogLevel::Error => tracing::error!(meta = %meta, "{message}"),
        }
    }
}

/// Install a global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the configured `logLevel` applies.
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(config: &GlobalConfig) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
