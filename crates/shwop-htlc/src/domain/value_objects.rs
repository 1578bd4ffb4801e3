//! # Domain Value Objects
//!
//! Immutable value types shared by the HTLC engine.

use super::errors::{Address, Hash, HtlcError};
use super::time_lock::LockMode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Domain tag mixed into every contract id.
const CONTRACT_ID_TAG: &[u8] = b"shwop/htlc/v1";

/// Serde helper: fixed-size byte arrays as lowercase hex strings.
pub mod hex_array {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as hex.
    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserialize from hex, enforcing the length.
    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| de::Error::custom(format!("expected {} bytes, got {}", N, len)))
    }
}

/// Parse a fixed-size hex string.
pub fn parse_hex_array<const N: usize>(s: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(s.trim().trim_start_matches("0x")).ok()?;
    bytes.try_into().ok()
}

/// Parse a 20-byte party address from hex.
pub fn parse_address(s: &str) -> Result<Address, HtlcError> {
    parse_hex_array(s).ok_or_else(|| HtlcError::MalformedAddress(s.to_string()))
}

/// Unique contract identifier.
///
/// Derived from hash, parties and amount so that a replayed contract maps to
/// the same id instead of a second record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(#[serde(with = "hex_array")] pub Hash);

impl ContractId {
    /// Derive the id for a contract.
    pub fn derive(hash: &Hash, sender: &Address, receiver: &Address, amount: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(CONTRACT_ID_TAG);
        hasher.update(hash);
        hasher.update(sender);
        hasher.update(receiver);
        hasher.update(amount.to_be_bytes());
        Self(hasher.finalize().into())
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", self.short())
    }
}

impl FromStr for ContractId {
    type Err = HtlcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array(s)
            .map(Self)
            .ok_or_else(|| HtlcError::MalformedContractId(s.to_string()))
    }
}

/// External transaction reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxRef(#[serde(with = "hex_array")] pub Hash);

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxRef({})", hex::encode(&self.0[..4]))
    }
}

/// Ledger address a contract's funding output is locked to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerAddress(pub String);

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized transaction produced by a signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTx(pub Vec<u8>);

impl RawTx {
    /// Hex encoding for hand-off.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// Ledger height and time observed together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPosition {
    /// Block height.
    pub height: u64,
    /// Ledger time (unix seconds).
    pub time: u64,
}

impl LedgerPosition {
    /// Create a position.
    pub fn new(height: u64, time: u64) -> Self {
        Self { height, time }
    }

    /// The coordinate a time lock of `mode` compares against.
    pub fn at(&self, mode: LockMode) -> u64 {
        match mode {
            LockMode::Height => self.height,
            LockMode::Time => self.time,
        }
    }
}

/// HTLC state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    /// Recorded, funding not yet observed.
    #[default]
    Created,
    /// Funding confirmed on the ledger.
    Funded,
    /// Receiver claimed with the preimage.
    Claimed,
    /// Sender refunded after expiry.
    Refunded,
}

impl ContractState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: ContractState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Funded)
                | (Self::Funded, Self::Claimed)
                | (Self::Funded, Self::Refunded)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Claimed | Self::Refunded)
    }
}

impl fmt::Display for ContractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Funded => "funded",
            Self::Claimed => "claimed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// The two ways a funding output can be spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// Hash-lock path.
    Claim,
    /// Time-lock path.
    Refund,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_state_transitions() {
        assert!(ContractState::Created.can_transition_to(ContractState::Funded));
        assert!(ContractState::Funded.can_transition_to(ContractState::Claimed));
        assert!(ContractState::Funded.can_transition_to(ContractState::Refunded));
        assert!(!ContractState::Created.can_transition_to(ContractState::Claimed));
        assert!(!ContractState::Claimed.can_transition_to(ContractState::Refunded));
        assert!(!ContractState::Refunded.can_transition_to(ContractState::Funded));
    }

    #[test]
    fn test_contract_state_terminal() {
        assert!(ContractState::Claimed.is_terminal());
        assert!(ContractState::Refunded.is_terminal());
        assert!(!ContractState::Funded.is_terminal());
    }

    #[test]
    fn test_contract_id_depends_on_amount() {
        let a = ContractId::derive(&[1u8; 32], &[2u8; 20], &[3u8; 20], 100);
        let b = ContractId::derive(&[1u8; 32], &[2u8; 20], &[3u8; 20], 101);
        assert_ne!(a, b);
        assert_eq!(a, ContractId::derive(&[1u8; 32], &[2u8; 20], &[3u8; 20], 100));
    }

    #[test]
    fn test_contract_id_parse_display() {
        let id = ContractId([0xABu8; 32]);
        let parsed: ContractId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("abcd".parse::<ContractId>().is_err());
    }

    #[test]
    fn test_contract_id_serializes_as_hex() {
        let json = serde_json::to_string(&ContractId([0x01u8; 32])).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
    }

    #[test]
    fn test_position_at_mode() {
        let pos = LedgerPosition::new(500, 1_700_000_000);
        assert_eq!(pos.at(LockMode::Height), 500);
        assert_eq!(pos.at(LockMode::Time), 1_700_000_000);
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address(&"11".repeat(20)).is_ok());
        assert!(parse_address("0x1234").is_err());
    }
}
