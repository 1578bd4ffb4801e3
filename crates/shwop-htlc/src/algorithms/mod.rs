//! # Algorithms Module
//!
//! Hash-lock cryptography and the ledger retry loop.

pub mod retry;
pub mod secret;

pub use retry::{with_retry, RetryPolicy};
pub use secret::{digest, digests_equal, generate_random_bytes, verify_secret};
