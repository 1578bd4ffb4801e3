//! `shwop htlc` command handlers. Each returns the JSON document printed on
//! stdout.

use crate::cli::{Cli, Command, CreateArgs, HtlcCommand};
use crate::config::CliConfig;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use shwop_htlc::adapters::SpendEnvelope;
use shwop_htlc::domain::parse_address;
use shwop_htlc::{
    ContractId, CreateContract, EnvelopeSigner, HashLock, HtlcApi, HtlcService, JsonFileStore,
    Preimage, RawTx,
};
use std::sync::Arc;
use tracing::debug;

type Service = HtlcService<JsonFileStore, EnvelopeSigner>;

/// Resolve configuration, open the store and run the command.
pub async fn run(cli: Cli) -> Result<Value> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.store_dir {
        config.store_dir = dir;
    }
    debug!("[htlc] Using store {}", config.store_dir.display());

    let store = JsonFileStore::open(&config.store_dir)
        .with_context(|| format!("opening store {}", config.store_dir.display()))?;
    let service = HtlcService::new(
        Arc::new(store),
        Arc::new(EnvelopeSigner::new()),
        config.htlc,
    )?;

    match cli.command {
        Command::Htlc(command) => execute(&service, command).await,
    }
}

async fn execute(service: &Service, command: HtlcCommand) -> Result<Value> {
    match command {
        HtlcCommand::Create(args) => create(service, args).await,
        HtlcCommand::Status { id, at } => {
            let id: ContractId = id.parse()?;
            let status = service.status(&id, at).await?;
            Ok(serde_json::to_value(status)?)
        }
        HtlcCommand::Fund { id } => {
            let id: ContractId = id.parse()?;
            let raw = service.prepare_funding(&id).await?;
            transaction(&id, &raw)
        }
        HtlcCommand::Claim { id, preimage, at } => {
            let id: ContractId = id.parse()?;
            let preimage = Preimage::from_hex(&preimage)?;
            let raw = service.prepare_claim(&id, &preimage, at).await?;
            transaction(&id, &raw)
        }
        HtlcCommand::Refund { id, at } => {
            let id: ContractId = id.parse()?;
            let raw = service.prepare_refund(&id, at).await?;
            transaction(&id, &raw)
        }
    }
}

async fn create(service: &Service, args: CreateArgs) -> Result<Value> {
    let hash = args
        .hash
        .as_deref()
        .map(HashLock::from_hex)
        .transpose()?
        .map(|lock| *lock.hash());

    let request = CreateContract {
        sender: parse_address(&args.sender)?,
        receiver: parse_address(&args.receiver)?,
        amount: args.amount,
        expiry: args.expiry,
        mode: args.mode.into(),
        hash,
        secret_len: args.secret_len,
        current: args.at,
    };
    let created = service.create_contract(request).await?;
    Ok(serde_json::to_value(created)?)
}

fn transaction(id: &ContractId, raw: &RawTx) -> Result<Value> {
    let envelope = SpendEnvelope::decode(raw)?;
    Ok(json!({
        "contract_id": id,
        "kind": envelope.kind,
        "raw_tx": raw.to_hex(),
        "envelope": envelope,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use shwop_htlc::{ErrorCategory, HtlcError};
    use tempfile::TempDir;

    const SENDER: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const RECEIVER: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    async fn shwop(dir: &TempDir, args: &[&str]) -> Result<Value> {
        let store = dir.path().to_string_lossy().to_string();
        let mut argv = vec!["shwop", "--store-dir", store.as_str()];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv)?).await
    }

    async fn create(dir: &TempDir) -> (String, String) {
        let created = shwop(
            dir,
            &[
                "htlc", "create", "--sender", SENDER, "--receiver", RECEIVER, "--amount", "100",
                "--expiry", "1000", "--at", "100",
            ],
        )
        .await
        .unwrap();
        let id = created["contract"]["id"].as_str().unwrap().to_string();
        let preimage = created["preimage"].as_str().unwrap().to_string();
        (id, preimage)
    }

    fn category(err: &anyhow::Error) -> Option<ErrorCategory> {
        err.chain()
            .find_map(|e| e.downcast_ref::<HtlcError>())
            .map(HtlcError::category)
    }

    #[tokio::test]
    async fn test_create_then_status() {
        let dir = TempDir::new().unwrap();
        let (id, preimage) = create(&dir).await;
        assert_eq!(preimage.len(), 64);

        let status = shwop(&dir, &["htlc", "status", &id, "--at", "400"])
            .await
            .unwrap();
        assert_eq!(status["state"], "created");
        assert_eq!(status["remaining"], 600);
        assert_eq!(status["expired"], false);
    }

    #[tokio::test]
    async fn test_fund_prints_envelope() {
        let dir = TempDir::new().unwrap();
        let (id, _) = create(&dir).await;
        let output = shwop(&dir, &["htlc", "fund", &id]).await.unwrap();
        assert_eq!(output["kind"], "funding");
        assert_eq!(output["contract_id"], id.as_str());
        assert!(output["raw_tx"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_claim_before_funding_is_protocol_violation() {
        let dir = TempDir::new().unwrap();
        let (id, preimage) = create(&dir).await;
        let err = shwop(
            &dir,
            &["htlc", "claim", &id, "--preimage", &preimage, "--at", "500"],
        )
        .await
        .unwrap_err();
        assert_eq!(category(&err), Some(ErrorCategory::ProtocolViolation));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let dir = TempDir::new().unwrap();
        let missing = "00".repeat(32);
        let err = shwop(&dir, &["htlc", "status", &missing]).await.unwrap_err();
        assert_eq!(category(&err), Some(ErrorCategory::NotFound));

        let err = shwop(&dir, &["htlc", "status", "xyz"]).await.unwrap_err();
        assert_eq!(category(&err), Some(ErrorCategory::Validation));
    }

    #[tokio::test]
    async fn test_duplicate_hash_contract_rejected() {
        let dir = TempDir::new().unwrap();
        let hash = "11".repeat(32);
        let args = [
            "htlc", "create", "--sender", SENDER, "--receiver", RECEIVER, "--amount", "5",
            "--expiry", "10", "--hash", hash.as_str(),
        ];
        let created = shwop(&dir, &args).await.unwrap();
        assert!(created.get("preimage").is_none());

        let err = shwop(&dir, &args).await.unwrap_err();
        assert_eq!(category(&err), Some(ErrorCategory::Validation));
    }
}
