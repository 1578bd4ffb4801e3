//! # Ports Module
//!
//! Hexagonal architecture ports for the HTLC engine.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
