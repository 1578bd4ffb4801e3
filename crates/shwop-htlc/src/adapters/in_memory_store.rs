//! In-memory Store Adapter
//!
//! Map-backed contract registry. Save failures can be injected to simulate a
//! crash between detecting an event and persisting its transition.

use crate::domain::{Contract, ContractId, HtlcError};
use crate::ports::outbound::Store;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::warn;

#[derive(Default)]
struct StoreState {
    contracts: HashMap<ContractId, Contract>,
    checkpoint: Option<u64>,
    failing_saves: usize,
    saves: usize,
}

/// In-memory contract store.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` contract saves with [`HtlcError::StoreFailure`].
    pub fn fail_next_saves(&self, count: usize) {
        self.state.write().failing_saves = count;
    }

    /// Successful contract saves so far.
    pub fn save_count(&self) -> usize {
        self.state.read().saves
    }

    /// Stored copy of a contract.
    pub fn get(&self, id: &ContractId) -> Option<Contract> {
        self.state.read().contracts.get(id).cloned()
    }

    /// Number of stored contracts.
    pub fn len(&self) -> usize {
        self.state.read().contracts.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn save(&self, contract: &Contract) -> Result<(), HtlcError> {
        let mut state = self.state.write();
        if state.failing_saves > 0 {
            state.failing_saves -= 1;
            warn!(contract_id = %contract.id(), "[htlc] Injected store failure");
            return Err(HtlcError::StoreFailure("injected failure".to_string()));
        }
        state.contracts.insert(contract.id(), contract.clone());
        state.saves += 1;
        Ok(())
    }

    async fn load(&self, id: &ContractId) -> Result<Option<Contract>, HtlcError> {
        Ok(self.get(id))
    }

    async fn list_active(&self) -> Result<Vec<Contract>, HtlcError> {
        let mut active: Vec<Contract> = self
            .state
            .read()
            .contracts
            .values()
            .filter(|c| !c.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|c| c.id());
        Ok(active)
    }

    async fn save_checkpoint(&self, height: u64) -> Result<(), HtlcError> {
        self.state.write().checkpoint = Some(height);
        Ok(())
    }

    async fn load_checkpoint(&self) -> Result<Option<u64>, HtlcError> {
        Ok(self.state.read().checkpoint)
    }
}
