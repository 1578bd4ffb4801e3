//! # Domain Module
//!
//! Core domain types for the HTLC engine.

pub mod entities;
pub mod errors;
pub mod hash_lock;
pub mod invariants;
pub mod locking_condition;
pub mod time_lock;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use hash_lock::{HashLock, Preimage, DEFAULT_PREIMAGE_LEN, MAX_PREIMAGE_LEN};
pub use invariants::*;
pub use locking_condition::{LockingCondition, LOCKING_CONDITION_LEN, LOCKING_CONDITION_VERSION};
pub use time_lock::{LedgerClock, LockMode, TimeLock};
pub use value_objects::*;
