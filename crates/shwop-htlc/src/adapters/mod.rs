//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: a simulated ledger, two contract stores
//! and a keyless signer.

mod envelope_signer;
mod in_memory_ledger;
mod in_memory_store;
mod json_file_store;

pub use envelope_signer::{EnvelopeKind, EnvelopeSigner, SpendEnvelope, ENVELOPE_VERSION};
pub use in_memory_ledger::{InMemoryLedger, BLOCK_INTERVAL_SECS};
pub use in_memory_store::InMemoryStore;
pub use json_file_store::JsonFileStore;
