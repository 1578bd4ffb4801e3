//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod service;
pub mod watcher;

pub use service::HtlcService;
pub use watcher::{Disposition, EventReport, PollReport, Watcher};
