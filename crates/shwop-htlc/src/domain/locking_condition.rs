//! # Locking Condition
//!
//! Chain-agnostic encoding of the HTLC predicate:
//!
//! ```text
//! or(and(sha256(H), pk(receiver)), and(after(expiry), pk(sender)))
//! ```
//!
//! ## Wire format (82 bytes)
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 1 | version (`0x01`) |
//! | 1 | 1 | mode (`0` height, `1` time) |
//! | 2 | 32 | SHA-256 hash |
//! | 34 | 8 | expiry, big-endian |
//! | 42 | 20 | receiver |
//! | 62 | 20 | sender |
//!
//! Ledger adapters translate this into their native script; the commitment
//! (SHA-256 of the encoding) doubles as the address the watcher follows.

use super::errors::{Address, Hash, HtlcError};
use super::time_lock::{LockMode, TimeLock};
use super::value_objects::LedgerAddress;
use crate::algorithms::secret::digest;

/// Current encoding version.
pub const LOCKING_CONDITION_VERSION: u8 = 1;

/// Encoded length in bytes.
pub const LOCKING_CONDITION_LEN: usize = 82;

/// The on-ledger predicate guarding a funding output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockingCondition {
    /// Hash-lock digest.
    pub hash: Hash,
    /// Refund gate.
    pub time_lock: TimeLock,
    /// Party allowed to claim with the preimage.
    pub receiver: Address,
    /// Party allowed to refund after expiry.
    pub sender: Address,
}

impl LockingCondition {
    /// Canonical byte encoding.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LOCKING_CONDITION_LEN);
        out.push(LOCKING_CONDITION_VERSION);
        out.push(self.time_lock.mode().to_byte());
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.time_lock.expiry().to_be_bytes());
        out.extend_from_slice(&self.receiver);
        out.extend_from_slice(&self.sender);
        out
    }

    /// Decode the canonical encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, HtlcError> {
        if bytes.len() != LOCKING_CONDITION_LEN {
            return Err(HtlcError::MalformedLockingCondition(format!(
                "expected {} bytes, got {}",
                LOCKING_CONDITION_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != LOCKING_CONDITION_VERSION {
            return Err(HtlcError::MalformedLockingCondition(format!(
                "unsupported version {}",
                bytes[0]
            )));
        }
        let mode = LockMode::from_byte(bytes[1]).ok_or_else(|| {
            HtlcError::MalformedLockingCondition(format!("unknown mode {}", bytes[1]))
        })?;

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        let mut expiry = [0u8; 8];
        expiry.copy_from_slice(&bytes[34..42]);
        let mut receiver = [0u8; 20];
        receiver.copy_from_slice(&bytes[42..62]);
        let mut sender = [0u8; 20];
        sender.copy_from_slice(&bytes[62..82]);

        let time_lock = TimeLock::new(u64::from_be_bytes(expiry), mode)
            .map_err(|e| HtlcError::MalformedLockingCondition(e.to_string()))?;

        Ok(Self {
            hash,
            time_lock,
            receiver,
            sender,
        })
    }

    /// SHA-256 of the encoding.
    pub fn commitment(&self) -> Hash {
        digest(&self.encode())
    }

    /// Address the funding output is paid to.
    pub fn address(&self) -> LedgerAddress {
        LedgerAddress(hex::encode(self.commitment()))
    }

    /// Human-readable policy.
    pub fn descriptor(&self) -> String {
        let after = match self.time_lock.mode() {
            LockMode::Height => "after",
            LockMode::Time => "after_time",
        };
        format!(
            "or(and(sha256({}),pk({})),and({}({}),pk({})))",
            hex::encode(self.hash),
            hex::encode(self.receiver),
            after,
            self.time_lock.expiry(),
            hex::encode(self.sender)
        )
    }
}
