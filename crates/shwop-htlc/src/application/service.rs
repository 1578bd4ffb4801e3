//! # HTLC Service
//!
//! Implements [`HtlcApi`] over a contract store and a signer. The service
//! creates contracts and prepares their transactions; it never moves a
//! contract's state. State changes come only from ledger observations via
//! the [`Watcher`](super::Watcher).

use crate::algorithms::retry::{with_retry, RetryPolicy};
use crate::config::HtlcConfig;
use crate::domain::{
    Contract, ContractId, ContractParams, HashLock, HtlcError, LedgerClock, LedgerPosition,
    LockMode, Preimage, RawTx, TimeLock, TxRef,
};
use crate::ports::inbound::{ContractStatus, CreateContract, CreatedContract, HtlcApi};
use crate::ports::outbound::{Ledger, Signer, Store};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// HTLC service: contract creation and transaction preparation.
pub struct HtlcService<S: Store, G: Signer> {
    config: HtlcConfig,
    store: Arc<S>,
    signer: Arc<G>,
    clock: Mutex<LedgerClock>,
    retry: RetryPolicy,
}

impl<S: Store, G: Signer> HtlcService<S, G> {
    /// Create a service, validating `config`.
    pub fn new(store: Arc<S>, signer: Arc<G>, config: HtlcConfig) -> Result<Self, HtlcError> {
        config.validate()?;
        let retry = RetryPolicy::from_config(&config.watcher);
        Ok(Self {
            config,
            store,
            signer,
            clock: Mutex::new(LedgerClock::new()),
            retry,
        })
    }

    /// Get the config.
    pub fn config(&self) -> &HtlcConfig {
        &self.config
    }

    /// Load a contract or fail with [`HtlcError::ContractNotFound`].
    pub async fn contract(&self, id: &ContractId) -> Result<Contract, HtlcError> {
        self.store
            .load(id)
            .await?
            .ok_or(HtlcError::ContractNotFound(*id))
    }

    /// Prepare and broadcast the funding transaction.
    pub async fn submit_funding<L: Ledger>(
        &self,
        ledger: &L,
        id: &ContractId,
    ) -> Result<TxRef, HtlcError> {
        let raw = self.prepare_funding(id).await?;
        self.broadcast(ledger, &raw).await
    }

    /// Prepare and broadcast a claim at the ledger's current position.
    pub async fn submit_claim<L: Ledger>(
        &self,
        ledger: &L,
        id: &ContractId,
        preimage: &Preimage,
    ) -> Result<TxRef, HtlcError> {
        let current = self.current(ledger, id).await?;
        let raw = self.prepare_claim(id, preimage, current).await?;
        self.broadcast(ledger, &raw).await
    }

    /// Prepare and broadcast a refund at the ledger's current position.
    pub async fn submit_refund<L: Ledger>(
        &self,
        ledger: &L,
        id: &ContractId,
    ) -> Result<TxRef, HtlcError> {
        let current = self.current(ledger, id).await?;
        let raw = self.prepare_refund(id, current).await?;
        self.broadcast(ledger, &raw).await
    }

    async fn current<L: Ledger>(&self, ledger: &L, id: &ContractId) -> Result<u64, HtlcError> {
        let mode = self.contract(id).await?.time_lock().mode();
        let position = with_retry(&self.retry, "current_position", move || {
            ledger.current_position()
        })
        .await?;
        Ok(position.at(mode))
    }

    async fn broadcast<L: Ledger>(&self, ledger: &L, raw: &RawTx) -> Result<TxRef, HtlcError> {
        let tx_ref = with_retry(&self.retry, "broadcast", move || ledger.broadcast(raw)).await?;
        info!(tx_ref = %tx_ref, "[htlc] Transaction broadcast");
        Ok(tx_ref)
    }

    fn observe(&self, mode: LockMode, current: u64) -> Result<u64, HtlcError> {
        self.clock.lock().observe(mode, current)
    }
}

#[async_trait]
impl<S: Store, G: Signer> HtlcApi for HtlcService<S, G> {
    async fn create_contract(&self, request: CreateContract) -> Result<CreatedContract, HtlcError> {
        let time_lock = TimeLock::new(request.expiry, request.mode)?;
        let mut created_at = LedgerPosition::default();
        if let Some(current) = request.current {
            if time_lock.is_expired(current) {
                return Err(HtlcError::ExpiryInPast {
                    expiry: request.expiry,
                    current,
                });
            }
            self.observe(request.mode, current)?;
            match request.mode {
                LockMode::Height => created_at.height = current,
                LockMode::Time => created_at.time = current,
            }
        }

        let (hash_lock, preimage) = match request.hash {
            Some(hash) => (HashLock::from_hash(hash), None),
            None => {
                let len = request.secret_len.unwrap_or(self.config.default_secret_len);
                let (hash_lock, preimage) = HashLock::create(len)?;
                (hash_lock, Some(preimage))
            }
        };

        let contract = Contract::new(ContractParams {
            sender: request.sender,
            receiver: request.receiver,
            amount: request.amount,
            hash_lock,
            time_lock,
            created_at,
        })?;

        let id = contract.id();
        if self.store.load(&id).await?.is_some() {
            return Err(HtlcError::DuplicateContract(id));
        }
        self.store.save(&contract).await?;

        info!(
            contract_id = %id,
            amount = contract.amount(),
            expiry = contract.time_lock().expiry(),
            mode = %contract.time_lock().mode(),
            generated_secret = preimage.is_some(),
            "[htlc] Contract created"
        );
        Ok(CreatedContract { contract, preimage })
    }

    async fn status(
        &self,
        id: &ContractId,
        current: Option<u64>,
    ) -> Result<ContractStatus, HtlcError> {
        let contract = self.contract(id).await?;
        let time_lock = *contract.time_lock();

        let (remaining, expired) = match current {
            Some(current) => {
                let remaining = time_lock.remaining(current, &mut self.clock.lock())?;
                (Some(remaining), Some(time_lock.is_expired(current)))
            }
            None => (None, None),
        };

        let condition = contract.locking_condition();
        Ok(ContractStatus {
            id: *id,
            state: contract.state(),
            amount: contract.amount(),
            mode: time_lock.mode(),
            expiry: time_lock.expiry(),
            remaining,
            expired,
            locking_address: condition.address(),
            descriptor: condition.descriptor(),
            contract,
        })
    }

    async fn prepare_funding(&self, id: &ContractId) -> Result<RawTx, HtlcError> {
        let contract = self.contract(id).await?;
        contract.ensure_fundable()?;
        let raw = self.signer.sign_funding(&contract).await?;
        debug!(contract_id = %id, bytes = raw.0.len(), "[htlc] Funding transaction prepared");
        Ok(raw)
    }

    async fn prepare_claim(
        &self,
        id: &ContractId,
        preimage: &Preimage,
        current: u64,
    ) -> Result<RawTx, HtlcError> {
        let contract = self.contract(id).await?;
        self.observe(contract.time_lock().mode(), current)?;
        contract.ensure_claimable(preimage, current)?;
        let raw = self.signer.sign_claim(&contract, preimage).await?;
        debug!(contract_id = %id, "[htlc] Claim transaction prepared");
        Ok(raw)
    }

    async fn prepare_refund(&self, id: &ContractId, current: u64) -> Result<RawTx, HtlcError> {
        let contract = self.contract(id).await?;
        self.observe(contract.time_lock().mode(), current)?;
        contract.ensure_refundable(current)?;
        let raw = self.signer.sign_refund(&contract).await?;
        debug!(contract_id = %id, "[htlc] Refund transaction prepared");
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{EnvelopeKind, EnvelopeSigner, InMemoryLedger, InMemoryStore, SpendEnvelope};
    use crate::domain::{ContractState, FundingObservation, DEFAULT_PREIMAGE_LEN};

    type TestService = HtlcService<InMemoryStore, EnvelopeSigner>;

    fn service() -> (Arc<InMemoryStore>, TestService) {
        let store = Arc::new(InMemoryStore::new());
        let service = HtlcService::new(
            Arc::clone(&store),
            Arc::new(EnvelopeSigner::new()),
            HtlcConfig::for_testing(),
        )
        .unwrap();
        (store, service)
    }

    fn request() -> CreateContract {
        CreateContract {
            sender: [0xAA; 20],
            receiver: [0xBB; 20],
            amount: 100,
            expiry: 1_000,
            mode: LockMode::Height,
            hash: None,
            secret_len: None,
            current: Some(100),
        }
    }

    async fn funded(store: &InMemoryStore, service: &TestService) -> (ContractId, Preimage) {
        let created = service.create_contract(request()).await.unwrap();
        let mut contract = created.contract;
        contract
            .apply_funding(
                &FundingObservation {
                    tx_ref: TxRef([1u8; 32]),
                    amount: 100,
                    committed_hash: Some(*contract.hash_lock().hash()),
                    confirmations: 1,
                    position: LedgerPosition::new(500, 5_000),
                },
                1,
            )
            .unwrap();
        store.save(&contract).await.unwrap();
        (contract.id(), created.preimage.unwrap())
    }

    #[tokio::test]
    async fn test_create_generates_preimage() {
        let (store, service) = service();
        let created = service.create_contract(request()).await.unwrap();
        let preimage = created.preimage.unwrap();
        assert_eq!(preimage.len(), DEFAULT_PREIMAGE_LEN);
        assert!(HashLock::verify(created.contract.hash_lock().hash(), &preimage));
        assert_eq!(created.contract.state(), ContractState::Created);
        assert_eq!(created.contract.created_at().height, 100);
        assert!(store.get(&created.contract.id()).is_some());
    }

    #[tokio::test]
    async fn test_create_with_supplied_hash() {
        let (_, service) = service();
        let mut req = request();
        req.hash = Some([7u8; 32]);
        let created = service.create_contract(req).await.unwrap();
        assert!(created.preimage.is_none());
        assert_eq!(created.contract.hash_lock().hash(), &[7u8; 32]);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_requests() {
        let (_, service) = service();

        let mut req = request();
        req.current = Some(1_000);
        assert!(matches!(
            service.create_contract(req).await,
            Err(HtlcError::ExpiryInPast { expiry: 1_000, current: 1_000 })
        ));

        let mut req = request();
        req.current = None;
        req.amount = 0;
        assert!(matches!(
            service.create_contract(req).await,
            Err(HtlcError::InvalidAmount)
        ));

        let mut req = request();
        req.current = None;
        req.secret_len = Some(65);
        assert!(matches!(
            service.create_contract(req).await,
            Err(HtlcError::InvalidLength { len: 65, .. })
        ));
    }

    #[tokio::test]
    async fn test_rejected_create_leaves_clock_untouched() {
        let (_, service) = service();
        let mut req = request();
        req.current = Some(5_000);
        assert!(matches!(
            service.create_contract(req).await,
            Err(HtlcError::ExpiryInPast { .. })
        ));

        let created = service.create_contract(request()).await.unwrap();
        assert_eq!(created.contract.created_at().height, 100);
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let (_, service) = service();
        let mut req = request();
        req.hash = Some([7u8; 32]);
        service.create_contract(req.clone()).await.unwrap();
        assert!(matches!(
            service.create_contract(req).await,
            Err(HtlcError::DuplicateContract(_))
        ));
    }

    #[tokio::test]
    async fn test_status_reports_remaining() {
        let (_, service) = service();
        let created = service.create_contract(request()).await.unwrap();
        let id = created.contract.id();

        let status = service.status(&id, Some(400)).await.unwrap();
        assert_eq!(status.state, ContractState::Created);
        assert_eq!(status.remaining, Some(600));
        assert_eq!(status.expired, Some(false));
        assert_eq!(status.locking_address, created.contract.address());

        let status = service.status(&id, None).await.unwrap();
        assert_eq!(status.remaining, None);

        assert!(matches!(
            service.status(&id, Some(300)).await,
            Err(HtlcError::ClockRegression { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_contract() {
        let (_, service) = service();
        let id = ContractId([9u8; 32]);
        assert!(matches!(
            service.status(&id, None).await,
            Err(HtlcError::ContractNotFound(_))
        ));
        assert!(matches!(
            service.prepare_funding(&id).await,
            Err(HtlcError::ContractNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_funding_only_when_created() {
        let (store, service) = service();
        let created = service.create_contract(request()).await.unwrap();
        let raw = service.prepare_funding(&created.contract.id()).await.unwrap();
        assert_eq!(SpendEnvelope::decode(&raw).unwrap().kind, EnvelopeKind::Funding);

        let (id, _) = funded(&store, &service).await;
        assert!(matches!(
            service.prepare_funding(&id).await,
            Err(HtlcError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_claim_checks() {
        let (store, service) = service();
        let (id, preimage) = funded(&store, &service).await;

        let wrong = Preimage::new(vec![0u8; 32]).unwrap();
        assert!(matches!(
            service.prepare_claim(&id, &wrong, 600).await,
            Err(HtlcError::InvalidPreimage)
        ));
        let raw = service.prepare_claim(&id, &preimage, 600).await.unwrap();
        assert_eq!(SpendEnvelope::decode(&raw).unwrap().kind, EnvelopeKind::Claim);
        assert!(matches!(
            service.prepare_claim(&id, &preimage, 1_000).await,
            Err(HtlcError::ClaimAfterExpiry { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_refund_waits_for_expiry() {
        let (store, service) = service();
        let (id, _) = funded(&store, &service).await;
        assert!(matches!(
            service.prepare_refund(&id, 999).await,
            Err(HtlcError::PrematureRefund { .. })
        ));
        let raw = service.prepare_refund(&id, 1_000).await.unwrap();
        assert_eq!(SpendEnvelope::decode(&raw).unwrap().kind, EnvelopeKind::Refund);
        // State only moves on ledger observation
        assert_eq!(store.get(&id).unwrap().state(), ContractState::Funded);
    }

    #[tokio::test]
    async fn test_submit_uses_ledger_position() {
        let (store, service) = service();
        let (id, _) = funded(&store, &service).await;
        let ledger = InMemoryLedger::starting_at(LedgerPosition::new(999, 9_990), 1);

        assert!(matches!(
            service.submit_refund(&ledger, &id).await,
            Err(HtlcError::PrematureRefund { .. })
        ));
        ledger.mine(1);
        service.submit_refund(&ledger, &id).await.unwrap();
        assert_eq!(ledger.broadcasts().len(), 1);
    }
}
