//! Environment-shaped tunables the façade needs, independent of how the
//! caller (`weave-api`, `weave-cli`) actually reads them from the
//! environment.

use std::time::Duration;

/// Per-execution concurrency bound and cancellation grace period.
/// `weave-api`'s `ApiConfig` parses the actual environment variables and
/// builds this; tests and `weave-cli` can just use [`Default`].
#[derive(Debug, Clone, Copy)]
pub struct FacadeConfig {
    /// `MAX_EXECUTION_CONCURRENCY`, default 8.
    pub max_execution_concurrency: usize,
    /// `WEBHOOK_GRACE_PERIOD_MS`, default 5000.
    pub grace_period: Duration,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            max_execution_concurrency: 8,
            grace_period: Duration::from_millis(5_000),
        }
    }
}
