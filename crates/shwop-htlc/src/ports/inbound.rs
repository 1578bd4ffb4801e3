//! # Inbound Ports
//!
//! API trait defining what the HTLC engine offers its callers.

use crate::domain::{
    Address, AuditEntry, Contract, ContractId, ContractState, Hash, HtlcError, LedgerAddress,
    LockMode, Preimage, RawTx,
};
use async_trait::async_trait;
use serde::Serialize;

/// Request to create a contract.
#[derive(Clone, Debug)]
pub struct CreateContract {
    /// Party that funds and may refund.
    pub sender: Address,
    /// Party that may claim.
    pub receiver: Address,
    /// Amount to lock.
    pub amount: u64,
    /// Absolute expiry.
    pub expiry: u64,
    /// Whether `expiry` is a height or a time.
    pub mode: LockMode,
    /// Use this hash instead of generating a preimage.
    pub hash: Option<Hash>,
    /// Preimage length when generating; the configured default otherwise.
    pub secret_len: Option<usize>,
    /// Current height or time, if known, to reject an expiry already reached.
    pub current: Option<u64>,
}

/// A created contract.
#[derive(Clone, Debug, Serialize)]
pub struct CreatedContract {
    /// The recorded contract.
    pub contract: Contract,
    /// Generated preimage, returned once to the creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preimage: Option<Preimage>,
}

/// Contract status report.
#[derive(Clone, Debug, Serialize)]
pub struct ContractStatus {
    /// Contract id.
    pub id: ContractId,
    /// Current state.
    pub state: ContractState,
    /// Locked amount.
    pub amount: u64,
    /// Expiry mode.
    pub mode: LockMode,
    /// Expiry value.
    pub expiry: u64,
    /// Distance to expiry, when a current position was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    /// Whether the contract is past expiry, when a current position was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    /// Address the funding output is paid to.
    pub locking_address: LedgerAddress,
    /// Human-readable policy.
    pub descriptor: String,
    /// Full record, including refs, revealed preimage and audit log.
    pub contract: Contract,
}

impl ContractStatus {
    /// Non-transition events recorded for the contract.
    pub fn audit_log(&self) -> &[AuditEntry] {
        self.contract.audit_log()
    }
}

/// HTLC API - inbound port.
#[async_trait]
pub trait HtlcApi: Send + Sync {
    /// Record a new contract in [`ContractState::Created`].
    async fn create_contract(&self, request: CreateContract) -> Result<CreatedContract, HtlcError>;

    /// Status of a contract, with expiry information when `current` is given.
    async fn status(
        &self,
        id: &ContractId,
        current: Option<u64>,
    ) -> Result<ContractStatus, HtlcError>;

    /// Signed funding transaction.
    async fn prepare_funding(&self, id: &ContractId) -> Result<RawTx, HtlcError>;

    /// Signed claim transaction, checked against the ledger at `current`.
    async fn prepare_claim(
        &self,
        id: &ContractId,
        preimage: &Preimage,
        current: u64,
    ) -> Result<RawTx, HtlcError>;

    /// Signed refund transaction, checked against the ledger at `current`.
    async fn prepare_refund(&self, id: &ContractId, current: u64) -> Result<RawTx, HtlcError>;
}
