//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use shwop_htlc::LockMode;
use std::path::PathBuf;

/// Shwop: hash time-locked contracts
#[derive(Parser, Debug)]
#[command(name = "shwop", version)]
#[command(about = "Create, inspect and settle hash time-locked contracts")]
pub struct Cli {
    /// Contract store directory (overrides config and SHWOP_STORE_DIR)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level command groups.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hash time-locked contracts
    #[command(subcommand)]
    Htlc(HtlcCommand),
}

/// `shwop htlc ...`
#[derive(Subcommand, Debug)]
pub enum HtlcCommand {
    /// Record a new contract
    Create(CreateArgs),

    /// Show a contract's state and expiry
    Status {
        /// Contract id (hex)
        id: String,

        /// Current height or time, to report remaining distance to expiry
        #[arg(long)]
        at: Option<u64>,
    },

    /// Prepare the funding transaction
    Fund {
        /// Contract id (hex)
        id: String,
    },

    /// Prepare a claim revealing the preimage
    Claim {
        /// Contract id (hex)
        id: String,

        /// Preimage (hex)
        #[arg(long)]
        preimage: String,

        /// Current height or time
        #[arg(long)]
        at: u64,
    },

    /// Prepare a refund back to the sender
    Refund {
        /// Contract id (hex)
        id: String,

        /// Current height or time
        #[arg(long)]
        at: u64,
    },
}

/// Arguments of `shwop htlc create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Sender address (20 bytes hex)
    #[arg(long)]
    pub sender: String,

    /// Receiver address (20 bytes hex)
    #[arg(long)]
    pub receiver: String,

    /// Amount to lock
    #[arg(long)]
    pub amount: u64,

    /// Absolute expiry height or unix time
    #[arg(long)]
    pub expiry: u64,

    /// How to read `--expiry`
    #[arg(long, value_enum, default_value_t = Mode::Height)]
    pub mode: Mode,

    /// Existing SHA-256 hash (hex); a preimage is generated otherwise
    #[arg(long, conflicts_with = "secret_len")]
    pub hash: Option<String>,

    /// Length of the generated preimage
    #[arg(long)]
    pub secret_len: Option<usize>,

    /// Current height or time, to reject an expiry already reached
    #[arg(long)]
    pub at: Option<u64>,
}

/// Expiry mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Block height
    Height,
    /// Unix seconds
    Time,
}

impl From<Mode> for LockMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Height => LockMode::Height,
            Mode::Time => LockMode::Time,
        }
    }
}
