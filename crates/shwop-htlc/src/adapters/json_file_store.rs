//! JSON File Store Adapter
//!
//! Durable contract registry: one JSON file per contract under
//! `contracts/`, plus `checkpoint.json`. Writes go through a temp file,
//! `sync_all` and `rename`, so a crash leaves either the old or the new
//! record. An exclusive `fs2` lock on `LOCK` keeps a second process out of
//! the directory for the lifetime of the store.

use crate::domain::{Contract, ContractId, HtlcError};
use crate::ports::outbound::Store;
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LOCK_FILE: &str = "LOCK";
const CONTRACTS_DIR: &str = "contracts";
const CHECKPOINT_FILE: &str = "checkpoint.json";

#[derive(Serialize, Deserialize)]
struct Checkpoint {
    height: u64,
}

/// Directory-backed contract store.
pub struct JsonFileStore {
    root: PathBuf,
    // Held for the lock; released on drop
    _lock: File,
}

fn io_error(context: &str, path: &Path, e: impl std::fmt::Display) -> HtlcError {
    HtlcError::StoreFailure(format!("{} {}: {}", context, path.display(), e))
}

impl JsonFileStore {
    /// Open (creating if needed) the store at `root`.
    ///
    /// Fails with [`HtlcError::StoreFailure`] if another process holds the
    /// directory lock.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, HtlcError> {
        let root = root.as_ref().to_path_buf();
        let contracts = root.join(CONTRACTS_DIR);
        std::fs::create_dir_all(&contracts).map_err(|e| io_error("create", &contracts, e))?;

        let lock_path = root.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error("open", &lock_path, e))?;
        lock.try_lock_exclusive().map_err(|_| {
            HtlcError::StoreFailure(format!(
                "store directory {} is locked by another process",
                root.display()
            ))
        })?;

        info!("[htlc] Opened contract store at {}", root.display());
        Ok(Self { root, _lock: lock })
    }

    /// Store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn contract_path(&self, id: &ContractId) -> PathBuf {
        self.root.join(CONTRACTS_DIR).join(format!("{}.json", id))
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HtlcError> {
        let temp_path = path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|e| io_error("create", &temp_path, e))?;
        file.write_all(bytes)
            .map_err(|e| io_error("write", &temp_path, e))?;
        file.sync_all()
            .map_err(|e| io_error("sync", &temp_path, e))?;
        std::fs::rename(&temp_path, path).map_err(|e| io_error("rename", path, e))?;
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, HtlcError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| io_error("decode", path, e))
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn save(&self, contract: &Contract) -> Result<(), HtlcError> {
        let path = self.contract_path(&contract.id());
        let bytes = serde_json::to_vec_pretty(contract)
            .map_err(|e| HtlcError::StoreFailure(e.to_string()))?;
        Self::write_atomic(&path, &bytes)?;
        debug!(contract_id = %contract.id(), state = %contract.state(), "[htlc] Saved contract");
        Ok(())
    }

    async fn load(&self, id: &ContractId) -> Result<Option<Contract>, HtlcError> {
        Self::read_json(&self.contract_path(id))
    }

    async fn list_active(&self) -> Result<Vec<Contract>, HtlcError> {
        let dir = self.root.join(CONTRACTS_DIR);
        let entries = std::fs::read_dir(&dir).map_err(|e| io_error("list", &dir, e))?;

        let mut active = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error("list", &dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_json::<Contract>(&path)? {
                Some(contract) if !contract.is_terminal() => active.push(contract),
                Some(_) => {}
                None => warn!("[htlc] Contract file vanished: {}", path.display()),
            }
        }
        active.sort_by_key(|c| c.id());
        Ok(active)
    }

    async fn save_checkpoint(&self, height: u64) -> Result<(), HtlcError> {
        let bytes = serde_json::to_vec(&Checkpoint { height })
            .map_err(|e| HtlcError::StoreFailure(e.to_string()))?;
        Self::write_atomic(&self.root.join(CHECKPOINT_FILE), &bytes)
    }

    async fn load_checkpoint(&self) -> Result<Option<u64>, HtlcError> {
        Ok(Self::read_json::<Checkpoint>(&self.root.join(CHECKPOINT_FILE))?.map(|c| c.height))
    }
}
