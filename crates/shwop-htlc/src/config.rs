//! # HTLC Engine Configuration
//!
//! Configuration for the contract service and the watcher loop.

use crate::domain::{HtlcError, DEFAULT_PREIMAGE_LEN, MAX_PREIMAGE_LEN};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Watcher loop configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Interval between `poll` ticks, in milliseconds.
    pub poll_interval_ms: u64,

    /// Deadline for a single ledger call, in milliseconds.
    pub ledger_timeout_ms: u64,

    /// Retries of a failed ledger call before giving up for this cycle.
    pub max_retries: u32,

    /// First retry delay, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Retry delay cap, in milliseconds.
    pub max_backoff_ms: u64,

    /// Capacity of the watcher's registration channel.
    pub event_buffer: usize,

    /// Blocks a settled contract stays tracked after its settlement height.
    pub retain_settled_blocks: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            ledger_timeout_ms: 10_000,
            max_retries: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 30_000,
            event_buffer: 256,
            retain_settled_blocks: 1_000,
        }
    }
}

impl WatcherConfig {
    /// Create a config for testing (short intervals).
    pub fn for_testing() -> Self {
        Self {
            poll_interval_ms: 50,
            ledger_timeout_ms: 200,
            max_retries: 2,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
            event_buffer: 16,
            retain_settled_blocks: 1_000,
        }
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// HTLC engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtlcConfig {
    /// Preimage length used when a request does not specify one.
    pub default_secret_len: usize,

    /// Watcher settings.
    pub watcher: WatcherConfig,
}

impl Default for HtlcConfig {
    fn default() -> Self {
        Self {
            default_secret_len: DEFAULT_PREIMAGE_LEN,
            watcher: WatcherConfig::default(),
        }
    }
}

impl HtlcConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            default_secret_len: DEFAULT_PREIMAGE_LEN,
            watcher: WatcherConfig::for_testing(),
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), HtlcError> {
        if self.default_secret_len == 0 || self.default_secret_len > MAX_PREIMAGE_LEN {
            return Err(HtlcError::InvalidLength {
                len: self.default_secret_len,
                max: MAX_PREIMAGE_LEN,
            });
        }
        Ok(())
    }
}
