//! # Ledger Call Retry
//!
//! Per-attempt timeout plus capped exponential backoff for ledger adapter
//! calls. Only [`HtlcError::LedgerUnavailable`] is retried; every other error
//! is returned on the first attempt.

use crate::config::WatcherConfig;
use crate::domain::HtlcError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Timeout and backoff settings for one class of calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy from watcher settings.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.ledger_timeout_ms),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WatcherConfig::default())
    }
}

/// Run `call` under `policy`.
///
/// A timed-out attempt counts as [`HtlcError::LedgerUnavailable`].
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, HtlcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HtlcError>>,
{
    let mut attempt = 0u32;
    loop {
        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(HtlcError::LedgerUnavailable(format!(
                "{} timed out after {:?}",
                operation, policy.timeout
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Ledger call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
