//! Retry policy for provider calls within a single role.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::provider::{ProviderError, ProviderErrorKind};

/// Default tries per role (first call included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Whether a failure is worth retrying against the same provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry after a backoff delay.
    Transient,
    /// Stop trying this role.
    Fatal,
}

/// Decides the class of a provider failure.
pub type ErrorClassifier = Arc<dyn Fn(&ProviderError) -> ErrorClass + Send + Sync>;

/// Message fragments that mark a failure as transient regardless of kind.
const TRANSIENT_MARKERS: &[&str] = &[
    "rate limit",
    "overloaded",
    "temporarily unavailable",
    "try again later",
];

/// Default classification: rate limits, overloads, timeouts and network
/// failures are transient; everything else is fatal.
pub fn default_classifier(err: &ProviderError) -> ErrorClass {
    match err.kind {
        ProviderErrorKind::RateLimited
        | ProviderErrorKind::Overloaded
        | ProviderErrorKind::Timeout
        | ProviderErrorKind::Network => ErrorClass::Transient,
        _ => {
            let message = err.message.to_lowercase();
            if TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
                ErrorClass::Transient
            } else {
                ErrorClass::Fatal
            }
        }
    }
}

/// Bounded exponential backoff applied per role.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    classifier: ErrorClassifier,
}

impl RetryPolicy {
    /// Policy with `max_attempts` tries (at least one) and `initial_delay`.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            classifier: Arc::new(default_classifier),
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Replace the error classifier.
    #[must_use]
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&ProviderError) -> ErrorClass + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Tries per role, first call included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Classify a failure.
    pub fn classify(&self, err: &ProviderError) -> ErrorClass {
        (self.classifier)(err)
    }

    /// Whether another try is allowed after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32, err: &ProviderError) -> bool {
        attempt < self.max_attempts && self.classify(err) == ErrorClass::Transient
    }

    /// Delay before retry number `retry` (1-based): `initial * 2^(retry-1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_delay.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .finish_non_exhaustive()
    }
}
