//! Envelope Signer Adapter
//!
//! Implements the `Signer` port without holding keys: each "signed"
//! transaction is an unsigned JSON envelope describing the spend, handed to an
//! external wallet for signing and broadcast.

use crate::domain::{Contract, ContractId, HtlcError, LedgerAddress, Preimage, RawTx, TxRef};
use crate::ports::outbound::Signer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Which spend an envelope describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Pay into the locking condition.
    Funding,
    /// Hash-lock spend.
    Claim,
    /// Time-lock spend.
    Refund,
}

/// Unsigned spend description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendEnvelope {
    /// Format version.
    pub version: u8,
    /// Spend kind.
    pub kind: EnvelopeKind,
    /// Contract being funded or settled.
    pub contract_id: ContractId,
    /// Address of the locking condition.
    pub address: LedgerAddress,
    /// Encoded locking condition, hex.
    pub locking_condition: String,
    /// Locked amount.
    pub amount: u64,
    /// Output being spent, for claims and refunds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_ref: Option<TxRef>,
    /// Preimage, for claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preimage: Option<Preimage>,
}

impl SpendEnvelope {
    /// Parse an envelope back from a raw transaction.
    pub fn decode(raw: &RawTx) -> Result<Self, HtlcError> {
        serde_json::from_slice(&raw.0).map_err(|e| HtlcError::Signer(e.to_string()))
    }
}

/// Signer that emits [`SpendEnvelope`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvelopeSigner;

impl EnvelopeSigner {
    /// Create a signer.
    pub fn new() -> Self {
        Self
    }

    fn envelope(
        kind: EnvelopeKind,
        contract: &Contract,
        preimage: Option<&Preimage>,
    ) -> Result<RawTx, HtlcError> {
        let condition = contract.locking_condition();
        let funding_ref = match kind {
            EnvelopeKind::Funding => None,
            EnvelopeKind::Claim | EnvelopeKind::Refund => {
                Some(contract.funding_ref().ok_or_else(|| {
                    HtlcError::Signer(format!("contract {} has no funding output", contract.id()))
                })?)
            }
        };
        let envelope = SpendEnvelope {
            version: ENVELOPE_VERSION,
            kind,
            contract_id: contract.id(),
            address: condition.address(),
            locking_condition: hex::encode(condition.encode()),
            amount: contract.amount(),
            funding_ref,
            preimage: preimage.cloned(),
        };
        serde_json::to_vec(&envelope)
            .map(RawTx)
            .map_err(|e| HtlcError::Signer(e.to_string()))
    }
}

#[async_trait]
impl Signer for EnvelopeSigner {
    async fn sign_funding(&self, contract: &Contract) -> Result<RawTx, HtlcError> {
        Self::envelope(EnvelopeKind::Funding, contract, None)
    }

    async fn sign_claim(
        &self,
        contract: &Contract,
        preimage: &Preimage,
    ) -> Result<RawTx, HtlcError> {
        Self::envelope(EnvelopeKind::Claim, contract, Some(preimage))
    }

    async fn sign_refund(&self, contract: &Contract) -> Result<RawTx, HtlcError> {
        Self::envelope(EnvelopeKind::Refund, contract, None)
    }
}
