//! # Outbound Ports
//!
//! Traits for the engine's external collaborators: the ledger it watches,
//! the signer that builds transactions, and the store that owns contract
//! records.

use crate::domain::{
    Address, Contract, ContractId, HtlcError, LedgerAddress, LedgerPosition, LockingCondition,
    Preimage, RawTx, TxRef,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Bounded, ordered feed of transactions touching one address.
pub type EventStream = mpsc::Receiver<TransactionEvent>;

/// Output of a ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Address paid to.
    pub address: LedgerAddress,
    /// Amount paid.
    pub amount: u64,
    /// Encoded locking condition carried by the output.
    #[serde(with = "hex_bytes")]
    pub locking_condition: Vec<u8>,
}

impl TxOutput {
    /// Output locked by `condition`.
    pub fn locked_to(condition: &LockingCondition, amount: u64) -> Self {
        Self {
            address: condition.address(),
            amount,
            locking_condition: condition.encode(),
        }
    }
}

/// How an input unlocks the output it spends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum SpendWitness {
    /// Hash-lock path.
    Claim {
        /// Revealed preimage
        preimage: Preimage,
        /// Signing key
        #[serde(with = "crate::domain::hex_array")]
        claimant: Address,
    },
    /// Time-lock path.
    Refund {
        /// Signing key
        #[serde(with = "crate::domain::hex_array")]
        authorizer: Address,
    },
}

/// Input of a ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Transaction whose output is consumed.
    pub spends: TxRef,
    /// Unlocking data.
    pub witness: SpendWitness,
}

/// A transaction seen on a watched address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Transaction reference.
    pub tx_ref: TxRef,
    /// Inclusion height.
    pub height: u64,
    /// Inclusion time.
    pub timestamp: u64,
    /// Confirmations when the event was emitted.
    pub confirmations: u64,
    /// Outputs.
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
    /// Inputs.
    #[serde(default)]
    pub inputs: Vec<TxInput>,
}

impl TransactionEvent {
    /// Empty transaction included at `position`.
    pub fn new(tx_ref: TxRef, position: LedgerPosition) -> Self {
        Self {
            tx_ref,
            height: position.height,
            timestamp: position.time,
            confirmations: 0,
            outputs: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Add an output.
    pub fn with_output(mut self, output: TxOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// Add an input.
    pub fn with_input(mut self, input: TxInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Set the confirmation count.
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Inclusion height and time.
    pub fn position(&self) -> LedgerPosition {
        LedgerPosition::new(self.height, self.timestamp)
    }

    /// Ledger ordering key.
    pub fn order_key(&self) -> (u64, TxRef) {
        (self.height, self.tx_ref)
    }
}

/// Ledger adapter - outbound port.
///
/// Implementations bound their own I/O; the engine additionally wraps every
/// call in a timeout and retries [`HtlcError::LedgerUnavailable`].
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current block height.
    async fn current_height(&self) -> Result<u64, HtlcError>;

    /// Current ledger time (unix seconds).
    async fn current_time(&self) -> Result<u64, HtlcError>;

    /// Confirmations required before an event is final.
    fn confirmation_depth(&self) -> u64;

    /// Subscribe to transactions touching `address`, replaying those
    /// included at or above `from_height`.
    async fn watch_address(
        &self,
        address: &LedgerAddress,
        from_height: u64,
    ) -> Result<EventStream, HtlcError>;

    /// Submit a signed transaction.
    async fn broadcast(&self, raw: &RawTx) -> Result<TxRef, HtlcError>;

    /// Confirmations of a transaction; zero if unknown.
    async fn get_confirmations(&self, tx_ref: &TxRef) -> Result<u64, HtlcError>;

    /// Mark an event as processed.
    async fn acknowledge(&self, address: &LedgerAddress, tx_ref: &TxRef)
        -> Result<(), HtlcError>;

    /// Height and time together.
    async fn current_position(&self) -> Result<LedgerPosition, HtlcError> {
        let height = self.current_height().await?;
        let time = self.current_time().await?;
        Ok(LedgerPosition::new(height, time))
    }
}

/// Transaction signer - outbound port.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Transaction paying `amount` to the contract's locking condition.
    async fn sign_funding(&self, contract: &Contract) -> Result<RawTx, HtlcError>;

    /// Hash-lock spend revealing `preimage`.
    async fn sign_claim(&self, contract: &Contract, preimage: &Preimage)
        -> Result<RawTx, HtlcError>;

    /// Time-lock spend back to the sender.
    async fn sign_refund(&self, contract: &Contract) -> Result<RawTx, HtlcError>;
}

/// Contract registry - outbound port.
///
/// The store owns the durable contract record; callers hold working copies.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace a contract record.
    async fn save(&self, contract: &Contract) -> Result<(), HtlcError>;

    /// Load a contract record.
    async fn load(&self, id: &ContractId) -> Result<Option<Contract>, HtlcError>;

    /// All contracts not yet Claimed or Refunded.
    async fn list_active(&self) -> Result<Vec<Contract>, HtlcError>;

    /// Record the height below which every event has been processed.
    async fn save_checkpoint(&self, height: u64) -> Result<(), HtlcError>;

    /// Last recorded checkpoint.
    async fn load_checkpoint(&self) -> Result<Option<u64>, HtlcError>;
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(de::Error::custom)
    }
}
