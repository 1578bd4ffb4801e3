//! # Domain Errors
//!
//! Error taxonomy for the HTLC engine.
//!
//! Every variant belongs to exactly one [`ErrorCategory`]; the category decides
//! whether the watcher retries, rejects the triggering event, or surfaces the
//! failure to an operator.

use super::time_lock::LockMode;
use super::value_objects::{ContractId, ContractState, TxRef};
use serde::Serialize;
use thiserror::Error;

/// Hash type (32-byte SHA-256).
pub type Hash = [u8; 32];

/// Party address type (20-byte).
pub type Address = [u8; 20];

/// Coarse classification of [`HtlcError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input, rejected before any state change.
    Validation,
    /// An observed or requested action breaks the protocol; state unchanged.
    ProtocolViolation,
    /// Ledger adapter timeout or connection failure; retried with backoff.
    LedgerUnavailable,
    /// Persistence failed; the transition is not considered applied.
    StoreFailure,
    /// The ledger clock moved backward; needs an operator.
    ClockRegression,
    /// Unknown contract.
    NotFound,
    /// The signer refused or failed to produce a transaction.
    SignerFailure,
}

impl ErrorCategory {
    /// Stable lowercase name used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ProtocolViolation => "protocol_violation",
            Self::LedgerUnavailable => "ledger_unavailable",
            Self::StoreFailure => "store_failure",
            Self::ClockRegression => "clock_regression",
            Self::NotFound => "not_found",
            Self::SignerFailure => "signer_failure",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTLC engine error types.
#[derive(Debug, Error)]
pub enum HtlcError {
    /// Preimage length is zero or above the maximum.
    #[error("Invalid preimage length: {len} (must be 1..={max})")]
    InvalidLength {
        /// Requested length
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Amount must be strictly positive.
    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    /// Expiry must be strictly positive.
    #[error("Invalid expiry: must be greater than zero")]
    InvalidExpiry,

    /// Expiry already reached at creation time.
    #[error("Expiry {expiry} already reached at {current}")]
    ExpiryInPast {
        /// Requested expiry
        expiry: u64,
        /// Current ledger height or time
        current: u64,
    },

    /// Hash is not 32 bytes of hex.
    #[error("Malformed hash: {0}")]
    MalformedHash(String),

    /// Preimage is not valid hex.
    #[error("Malformed preimage: {0}")]
    MalformedPreimage(String),

    /// Party address is not 20 bytes of hex.
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    /// Contract id is not 32 bytes of hex.
    #[error("Malformed contract id: {0}")]
    MalformedContractId(String),

    /// Encoded locking condition could not be decoded.
    #[error("Malformed locking condition: {0}")]
    MalformedLockingCondition(String),

    /// A contract with the same id is already recorded.
    #[error("Contract already exists: {0}")]
    DuplicateContract(ContractId),

    /// Observed funding does not match the recorded amount or hash.
    #[error("Funding mismatch for {id}: expected amount {expected_amount}, observed {observed_amount} (hash match: {hash_matches})")]
    FundingMismatch {
        /// Contract
        id: ContractId,
        /// Recorded amount
        expected_amount: u64,
        /// Amount seen on the ledger
        observed_amount: u64,
        /// Whether the committed hash matched
        hash_matches: bool,
    },

    /// Refund attempted or observed before the time lock expired.
    #[error("Premature refund for {id}: current {current} < expiry {expiry}")]
    PrematureRefund {
        /// Contract
        id: ContractId,
        /// Ledger height or time of the attempt
        current: u64,
        /// Time lock expiry
        expiry: u64,
    },

    /// Claim attempted or observed at or after expiry.
    #[error("Claim after expiry for {id}: current {current} >= expiry {expiry}")]
    ClaimAfterExpiry {
        /// Contract
        id: ContractId,
        /// Ledger height or time of the attempt
        current: u64,
        /// Time lock expiry
        expiry: u64,
    },

    /// Preimage does not hash to the committed digest.
    #[error("Invalid preimage: digest does not match hash lock")]
    InvalidPreimage,

    /// Refund not authorized by the sender.
    #[error("Unauthorized refund for {id}: authorizer is not the sender")]
    UnauthorizedRefund {
        /// Contract
        id: ContractId,
    },

    /// Spend of an output that is not the contract's funding output.
    #[error("Spend {tx_ref} for {id} does not consume the funding output")]
    UnrelatedSpend {
        /// Contract
        id: ContractId,
        /// Offending transaction
        tx_ref: TxRef,
    },

    /// State machine does not allow the transition.
    #[error("Invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Contract
        id: ContractId,
        /// Current state
        from: ContractState,
        /// Attempted state
        to: ContractState,
    },

    /// Contract already reached a terminal state.
    #[error("Contract {id} already settled ({state})")]
    AlreadySettled {
        /// Contract
        id: ContractId,
        /// Terminal state
        state: ContractState,
    },

    /// Ledger adapter timeout or connection failure.
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Store write or read failure.
    #[error("Store failure: {0}")]
    StoreFailure(String),

    /// Ledger height or time moved backward.
    #[error("Clock regression ({mode}): observed {observed} after {previous}")]
    ClockRegression {
        /// Which clock regressed
        mode: LockMode,
        /// Last accepted value
        previous: u64,
        /// Offending value
        observed: u64,
    },

    /// Contract not in the store.
    #[error("Contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Signer failure.
    #[error("Signer error: {0}")]
    Signer(String),
}

impl HtlcError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidLength { .. }
            | Self::InvalidAmount
            | Self::InvalidExpiry
            | Self::ExpiryInPast { .. }
            | Self::MalformedHash(_)
            | Self::MalformedPreimage(_)
            | Self::MalformedAddress(_)
            | Self::MalformedContractId(_)
            | Self::MalformedLockingCondition(_)
            | Self::DuplicateContract(_) => ErrorCategory::Validation,
            Self::FundingMismatch { .. }
            | Self::PrematureRefund { .. }
            | Self::ClaimAfterExpiry { .. }
            | Self::InvalidPreimage
            | Self::UnauthorizedRefund { .. }
            | Self::UnrelatedSpend { .. }
            | Self::InvalidTransition { .. }
            | Self::AlreadySettled { .. } => ErrorCategory::ProtocolViolation,
            Self::LedgerUnavailable(_) => ErrorCategory::LedgerUnavailable,
            Self::StoreFailure(_) => ErrorCategory::StoreFailure,
            Self::ClockRegression { .. } => ErrorCategory::ClockRegression,
            Self::ContractNotFound(_) => ErrorCategory::NotFound,
            Self::Signer(_) => ErrorCategory::SignerFailure,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::LedgerUnavailable)
    }
}
