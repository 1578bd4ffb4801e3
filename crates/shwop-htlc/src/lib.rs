//! # Shwop HTLC Engine
//!
//! Hash Time-Locked Contracts: value locked so the receiver can claim it by
//! revealing a secret before a deadline, and the sender can reclaim it after.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Create contracts with a SHA-256 hash lock and a height or time lock
//! - Prepare funding, claim and refund transactions through a pluggable signer
//! - Watch a ledger and drive each contract through
//!   `Created → Funded → Claimed | Refunded`, one transition per confirmed
//!   event, persisted before the event is acknowledged
//!
//! ## Safety Properties
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | Claim needs the preimage | `sha256(preimage) == hash`, constant-time compare |
//! | Claim only before expiry | `current < expiry`, checked at the claim's own position |
//! | Refund only after expiry | `current >= expiry`, and only by the sender |
//! | No double settlement | `Claimed` and `Refunded` are terminal |
//! | Crash safety | store write completes before ledger acknowledgement |
//! | Clock sanity | a backward-moving height or time is an error |
//!
//! ## Module Structure
//!
//! ```text
//! shwop-htlc/
//! ├── domain/          # Contract, HashLock, TimeLock, LockingCondition, errors
//! ├── algorithms/      # Secret generation, ledger call retry
//! ├── ports/           # HtlcApi (inbound); Ledger, Signer, Store (outbound)
//! ├── adapters/        # In-memory ledger and store, JSON file store, envelope signer
//! ├── application/     # HtlcService, Watcher
//! └── config.rs        # HtlcConfig, WatcherConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{EnvelopeSigner, InMemoryLedger, InMemoryStore, JsonFileStore};
pub use application::{Disposition, EventReport, HtlcService, PollReport, Watcher};
pub use config::{HtlcConfig, WatcherConfig};
pub use domain::{
    Address, Contract, ContractId, ContractState, ErrorCategory, Hash, HashLock, HtlcError,
    LedgerAddress, LedgerPosition, LockMode, LockingCondition, Preimage, RawTx, TimeLock,
    TransitionOutcome, TxRef,
};
pub use ports::{
    ContractStatus, CreateContract, CreatedContract, HtlcApi, Ledger, Signer, SpendWitness,
    Store, TransactionEvent, TxInput, TxOutput,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
