//! # Shwop CLI
//!
//! Thin shell over the HTLC engine:
//!
//! ```text
//! shwop [--store-dir DIR] [--config FILE] htlc create|status|fund|claim|refund
//! ```
//!
//! Results are printed as JSON on stdout. Logs go to stderr, filtered by
//! `RUST_LOG` (default `info`). Failures print `error[<category>]: <message>`
//! and exit with a code per error category:
//!
//! | Category | Exit code |
//! |----------|-----------|
//! | validation | 2 |
//! | protocol_violation | 3 |
//! | ledger_unavailable | 4 |
//! | store_failure | 5 |
//! | clock_regression | 6 |
//! | not_found | 7 |
//! | signer_failure | 8 |
//! | anything else | 1 |

mod cli;
mod commands;
mod config;

use clap::Parser;
use shwop_htlc::{ErrorCategory, HtlcError};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::Cli;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber already installed by an embedder wins
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Category of the first [`HtlcError`] in the error chain.
fn error_category(err: &anyhow::Error) -> Option<ErrorCategory> {
    err.chain()
        .find_map(|e| e.downcast_ref::<HtlcError>())
        .map(HtlcError::category)
}

fn exit_code(category: Option<ErrorCategory>) -> u8 {
    match category {
        Some(ErrorCategory::Validation) => 2,
        Some(ErrorCategory::ProtocolViolation) => 3,
        Some(ErrorCategory::LedgerUnavailable) => 4,
        Some(ErrorCategory::StoreFailure) => 5,
        Some(ErrorCategory::ClockRegression) => 6,
        Some(ErrorCategory::NotFound) => 7,
        Some(ErrorCategory::SignerFailure) => 8,
        None => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(output) => {
            println!("{:#}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let category = error_category(&err);
            let label = category.map_or("internal", |c| c.as_str());
            eprintln!("error[{}]: {:#}", label, err);
            ExitCode::from(exit_code(category))
        }
    }
}
