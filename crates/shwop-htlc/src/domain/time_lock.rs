//! # Time Lock
//!
//! Absolute expiry by block height or ledger time, plus the clock guard that
//! refuses to let either coordinate move backward.

use super::errors::HtlcError;
use super::value_objects::LedgerPosition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a time lock's expiry is measured in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Block height.
    #[default]
    Height,
    /// Ledger time in unix seconds.
    Time,
}

impl LockMode {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Self::Height => 0,
            Self::Time => 1,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Height),
            1 => Some(Self::Time),
            _ => None,
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height => f.write_str("height"),
            Self::Time => f.write_str("time"),
        }
    }
}

/// Absolute expiry condition. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLock {
    expiry: u64,
    mode: LockMode,
}

impl TimeLock {
    /// Create a time lock. `expiry` must be positive.
    pub fn new(expiry: u64, mode: LockMode) -> Result<Self, HtlcError> {
        if expiry == 0 {
            return Err(HtlcError::InvalidExpiry);
        }
        Ok(Self { expiry, mode })
    }

    /// Expire at a block height.
    pub fn at_height(height: u64) -> Result<Self, HtlcError> {
        Self::new(height, LockMode::Height)
    }

    /// Expire at a ledger time.
    pub fn at_time(time: u64) -> Result<Self, HtlcError> {
        Self::new(time, LockMode::Time)
    }

    /// Expiry value.
    pub fn expiry(&self) -> u64 {
        self.expiry
    }

    /// Comparison mode.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// True iff `current >= expiry`.
    pub fn is_expired(&self, current: u64) -> bool {
        current >= self.expiry
    }

    /// Same as [`is_expired`](Self::is_expired) for a full ledger position.
    pub fn is_expired_at(&self, position: &LedgerPosition) -> bool {
        self.is_expired(position.at(self.mode))
    }

    /// Distance to expiry, zero once expired.
    ///
    /// `current` is recorded in `clock`; a value below the last one recorded
    /// for this mode fails with [`HtlcError::ClockRegression`].
    pub fn remaining(&self, current: u64, clock: &mut LedgerClock) -> Result<u64, HtlcError> {
        let current = clock.observe(self.mode, current)?;
        Ok(self.expiry.saturating_sub(current))
    }
}

/// Last observed ledger height and time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClock {
    last_height: Option<u64>,
    last_time: Option<u64>,
}

impl LedgerClock {
    /// A clock that has observed nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock resuming from a durable checkpoint.
    pub fn starting_at(position: LedgerPosition) -> Self {
        Self {
            last_height: Some(position.height),
            last_time: Some(position.time),
        }
    }

    /// Last accepted value for `mode`.
    pub fn last(&self, mode: LockMode) -> Option<u64> {
        match mode {
            LockMode::Height => self.last_height,
            LockMode::Time => self.last_time,
        }
    }

    /// Record `value`; the clock is left unchanged on regression.
    pub fn observe(&mut self, mode: LockMode, value: u64) -> Result<u64, HtlcError> {
        let slot = match mode {
            LockMode::Height => &mut self.last_height,
            LockMode::Time => &mut self.last_time,
        };
        if let Some(previous) = *slot {
            if value < previous {
                return Err(HtlcError::ClockRegression {
                    mode,
                    previous,
                    observed: value,
                });
            }
        }
        *slot = Some(value);
        Ok(value)
    }

    /// Record both coordinates, all or nothing.
    pub fn observe_position(&mut self, position: LedgerPosition) -> Result<(), HtlcError> {
        let mut next = *self;
        next.observe(LockMode::Height, position.height)?;
        next.observe(LockMode::Time, position.time)?;
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_expiry_rejected() {
        assert!(matches!(
            TimeLock::at_height(0),
            Err(HtlcError::InvalidExpiry)
        ));
    }

    #[test]
    fn test_is_expired_boundary() {
        let lock = TimeLock::at_height(1000).unwrap();
        assert!(!lock.is_expired(999));
        assert!(lock.is_expired(1000));
        assert!(lock.is_expired(1001));
    }

    #[test]
    fn test_is_expired_at_uses_mode() {
        let lock = TimeLock::at_time(5000).unwrap();
        assert!(!lock.is_expired_at(&LedgerPosition::new(9_999, 4_999)));
        assert!(lock.is_expired_at(&LedgerPosition::new(1, 5_000)));
    }

    #[test]
    fn test_remaining_counts_down_to_zero() {
        let lock = TimeLock::at_height(1000).unwrap();
        let mut clock = LedgerClock::new();
        assert_eq!(lock.remaining(400, &mut clock).unwrap(), 600);
        assert_eq!(lock.remaining(1000, &mut clock).unwrap(), 0);
        assert_eq!(lock.remaining(1200, &mut clock).unwrap(), 0);
    }

    #[test]
    fn test_remaining_rejects_regression() {
        let lock = TimeLock::at_height(1000).unwrap();
        let mut clock = LedgerClock::new();
        lock.remaining(500, &mut clock).unwrap();
        let err = lock.remaining(499, &mut clock).unwrap_err();
        assert!(matches!(
            err,
            HtlcError::ClockRegression {
                previous: 500,
                observed: 499,
                ..
            }
        ));
        // Rejected value is not recorded
        assert_eq!(clock.last(LockMode::Height), Some(500));
    }

    #[test]
    fn test_clock_modes_are_independent() {
        let mut clock = LedgerClock::new();
        clock.observe(LockMode::Height, 100).unwrap();
        clock.observe(LockMode::Time, 5).unwrap();
        assert!(clock.observe(LockMode::Time, 6).is_ok());
        assert!(clock.observe(LockMode::Height, 100).is_ok());
    }

    #[test]
    fn test_observe_position_all_or_nothing() {
        let mut clock = LedgerClock::starting_at(LedgerPosition::new(10, 100));
        assert!(clock
            .observe_position(LedgerPosition::new(11, 99))
            .is_err());
        assert_eq!(clock.last(LockMode::Height), Some(10));
    }
}
