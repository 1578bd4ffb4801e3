//! # Watcher
//!
//! Bridges ledger events to the contract state machine.
//!
//! ## Processing discipline
//!
//! - Events are routed to contracts by output address (funding) and by the
//!   funding reference an input spends (claim, refund).
//! - Each tracked contract sits behind its own async mutex, so transitions are
//!   serialized per contract id while different contracts proceed
//!   independently.
//! - Every routed event enters the contract's pending queue, ordered by
//!   `(height, tx_ref)`. The queue drains front to back; an event that is not
//!   yet confirmed, or whose store write failed, stays at the front and holds
//!   back everything behind it.
//! - The store write completes before the event is acknowledged to the
//!   ledger. Replays after a crash are absorbed as duplicates.
//! - The durable checkpoint never passes a pending event or the scan start of
//!   an address whose subscription failed.

use crate::algorithms::retry::{with_retry, RetryPolicy};
use crate::config::WatcherConfig;
use crate::domain::{
    ClaimObservation, Contract, ContractId, ErrorCategory, FundingObservation, HtlcError,
    LedgerAddress, LedgerClock, LedgerPosition, LockingCondition, Observation, RefundObservation,
    TransitionOutcome, TxRef,
};
use crate::ports::outbound::{Ledger, SpendWitness, Store, TransactionEvent};
use parking_lot::{Mutex as SyncMutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// What happened to one observation of one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Disposition {
    /// The state machine accepted the observation.
    Transition {
        /// Resulting outcome
        outcome: TransitionOutcome,
    },
    /// The observation broke the protocol and was discarded.
    Rejected {
        /// Error category
        category: ErrorCategory,
        /// Error message
        reason: String,
    },
    /// The transition could not be persisted; the event stays queued.
    Deferred {
        /// Store error message
        reason: String,
    },
}

/// Per-contract result of processing an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventReport {
    /// Contract the event was routed to.
    pub contract_id: ContractId,
    /// Event transaction.
    pub tx_ref: TxRef,
    /// Result.
    #[serde(flatten)]
    pub disposition: Disposition,
}

impl EventReport {
    /// Outcome, if the state machine accepted the observation.
    pub fn outcome(&self) -> Option<TransitionOutcome> {
        match self.disposition {
            Disposition::Transition { outcome } => Some(outcome),
            _ => None,
        }
    }
}

/// Result of one `poll` cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// Ledger position the cycle ran at.
    pub position: LedgerPosition,
    /// Funded contracts past expiry; the sender may refund.
    pub refund_eligible: Vec<ContractId>,
    /// Queued events processed this cycle.
    pub events: Vec<EventReport>,
    /// Height below which every event has been processed.
    pub checkpoint: u64,
}

/// Working state for one contract.
struct Tracked {
    contract: Contract,
    address: LedgerAddress,
    /// Funding candidates seen on the address, plus the applied funding ref.
    funding_refs: HashSet<TxRef>,
    pending: BTreeMap<(u64, TxRef), TransactionEvent>,
    refund_flagged: bool,
    /// Height of the settlement applied while tracked.
    settled_at: Option<u64>,
}

impl Tracked {
    fn new(contract: Contract) -> Self {
        let address = contract.address();
        let funding_refs = contract.funding_ref().into_iter().collect();
        Self {
            contract,
            address,
            funding_refs,
            pending: BTreeMap::new(),
            refund_flagged: false,
            settled_at: None,
        }
    }

    fn lowest_pending(&self) -> Option<u64> {
        self.pending.keys().next().map(|(height, _)| *height)
    }

    fn observations(&self, event: &TransactionEvent) -> Vec<Observation> {
        let position = event.position();
        let mut observations = Vec::new();

        for output in event.outputs.iter().filter(|o| o.address == self.address) {
            let committed_hash = LockingCondition::decode(&output.locking_condition)
                .ok()
                .map(|c| c.hash);
            observations.push(Observation::Funding(FundingObservation {
                tx_ref: event.tx_ref,
                amount: output.amount,
                committed_hash,
                confirmations: event.confirmations,
                position,
            }));
        }

        for input in event
            .inputs
            .iter()
            .filter(|i| self.funding_refs.contains(&i.spends))
        {
            let observation = match &input.witness {
                SpendWitness::Claim { preimage, claimant } => {
                    Observation::Claim(ClaimObservation {
                        tx_ref: event.tx_ref,
                        spends: input.spends,
                        preimage: preimage.clone(),
                        claimant: *claimant,
                        confirmations: event.confirmations,
                        position,
                    })
                }
                SpendWitness::Refund { authorizer } => Observation::Refund(RefundObservation {
                    tx_ref: event.tx_ref,
                    spends: input.spends,
                    authorizer: *authorizer,
                    confirmations: event.confirmations,
                    position,
                }),
            };
            observations.push(observation);
        }

        observations
    }
}

/// Contracts sharing a locking address, and where to start scanning it.
struct AddressEntry {
    contracts: BTreeSet<ContractId>,
    scan_from: u64,
}

type Subscriptions = StreamMap<LedgerAddress, ReceiverStream<TransactionEvent>>;

/// Ledger event loop driving contract transitions.
pub struct Watcher<L: Ledger, S: Store> {
    ledger: Arc<L>,
    store: Arc<S>,
    config: WatcherConfig,
    retry: RetryPolicy,
    tracked: RwLock<HashMap<ContractId, Arc<Mutex<Tracked>>>>,
    by_address: RwLock<HashMap<LedgerAddress, AddressEntry>>,
    by_funding: RwLock<HashMap<TxRef, BTreeSet<ContractId>>>,
    clock: SyncMutex<LedgerClock>,
    checkpoint: SyncMutex<Option<u64>>,
    /// Lowest `scan_from` among addresses whose subscription failed.
    unsubscribed_from: SyncMutex<Option<u64>>,
    registered: Notify,
}

impl<L: Ledger, S: Store> Watcher<L, S> {
    /// Create a watcher with nothing tracked.
    pub fn new(ledger: Arc<L>, store: Arc<S>, config: WatcherConfig) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            ledger,
            store,
            config,
            retry,
            tracked: RwLock::new(HashMap::new()),
            by_address: RwLock::new(HashMap::new()),
            by_funding: RwLock::new(HashMap::new()),
            clock: SyncMutex::new(LedgerClock::new()),
            checkpoint: SyncMutex::new(None),
            unsubscribed_from: SyncMutex::new(None),
            registered: Notify::new(),
        }
    }

    /// Start monitoring a contract.
    ///
    /// The stored record wins over `contract` when one exists; otherwise
    /// `contract` is saved before tracking starts. Returns `false` if the id
    /// was already tracked.
    #[instrument(skip(self, contract), fields(contract_id = %contract.id()))]
    pub async fn register(&self, contract: Contract) -> Result<bool, HtlcError> {
        let id = contract.id();
        if self.is_tracked(&id) {
            debug!("[htlc] Contract already tracked");
            return Ok(false);
        }

        let contract = match self.store.load(&id).await? {
            Some(stored) => stored,
            None => {
                self.store.save(&contract).await?;
                contract
            }
        };

        let scan_from = contract.created_at().height;
        let inserted = self.track(contract, scan_from);
        if inserted {
            info!(scan_from, "[htlc] Contract registered");
            self.registered.notify_one();
        }
        Ok(inserted)
    }

    /// Stop monitoring a contract. Its stored record is untouched.
    pub fn unregister(&self, id: &ContractId) -> bool {
        if !self.remove(id) {
            return false;
        }
        info!(contract_id = %id, "[htlc] Contract unregistered");
        self.registered.notify_one();
        true
    }

    fn remove(&self, id: &ContractId) -> bool {
        if self.tracked.write().remove(id).is_none() {
            return false;
        }
        {
            let mut by_address = self.by_address.write();
            by_address.retain(|_, entry| {
                entry.contracts.remove(id);
                !entry.contracts.is_empty()
            });
        }
        {
            let mut by_funding = self.by_funding.write();
            by_funding.retain(|_, ids| {
                ids.remove(id);
                !ids.is_empty()
            });
        }
        true
    }

    /// Reload every non-terminal contract and the durable checkpoint.
    ///
    /// Returns the number of contracts newly tracked.
    pub async fn recover(&self) -> Result<usize, HtlcError> {
        let checkpoint = self.store.load_checkpoint().await?;
        let contracts = self.store.list_active().await?;
        *self.checkpoint.lock() = checkpoint;

        let mut recovered = 0;
        for contract in contracts {
            let created = contract.created_at().height;
            // Contracts never funded may have been created while no watcher ran
            let scan_from = match (checkpoint, contract.funding_ref()) {
                (Some(cp), Some(_)) => cp,
                (Some(cp), None) => cp.min(created),
                (None, _) => created,
            };
            if self.track(contract, scan_from) {
                recovered += 1;
            }
        }

        info!(
            recovered,
            checkpoint = ?checkpoint,
            "[htlc] Watcher recovered contracts from store"
        );
        if recovered > 0 {
            self.registered.notify_one();
        }
        Ok(recovered)
    }

    /// Route one ledger event to every contract it touches.
    #[instrument(
        skip(self, event),
        fields(tx_ref = %event.tx_ref, correlation_id = %Uuid::new_v4())
    )]
    pub async fn on_ledger_event(&self, event: TransactionEvent) -> Vec<EventReport> {
        let ids = self.route(&event);
        if ids.is_empty() {
            debug!("[htlc] Event touches no tracked contract");
            return Vec::new();
        }

        let depth = self.ledger.confirmation_depth();
        let mut reports = Vec::new();
        for id in ids {
            let Some(entry) = self.entry(&id) else {
                continue;
            };
            let mut tracked = entry.lock().await;
            self.enqueue(&mut tracked, event.clone());
            reports.extend(self.drain(&mut tracked, depth).await);
        }
        reports
    }

    /// Advance time-based logic to `position`.
    ///
    /// Refreshes confirmations of queued events, drains every queue, reports
    /// refund-eligible contracts and saves the checkpoint. A backward move of
    /// the ledger clock fails with [`HtlcError::ClockRegression`] and changes
    /// nothing.
    #[instrument(skip(self, position), fields(height = position.height, time = position.time))]
    pub async fn poll(&self, position: LedgerPosition) -> Result<PollReport, HtlcError> {
        let observed = self.clock.lock().observe_position(position);
        if let Err(e) = observed {
            warn!(error = %e, "[htlc] Ledger clock moved backward, operator attention required");
            return Err(e);
        }

        let depth = self.ledger.confirmation_depth();
        let mut report = PollReport {
            position,
            refund_eligible: Vec::new(),
            events: Vec::new(),
            checkpoint: position.height,
        };

        let mut settled = Vec::new();
        for entry in self.entries() {
            let mut tracked = entry.lock().await;
            self.refresh_confirmations(&mut tracked, depth).await;
            report.events.extend(self.drain(&mut tracked, depth).await);

            let retained_until = tracked
                .settled_at
                .map(|height| height.saturating_add(self.config.retain_settled_blocks));
            if tracked.pending.is_empty()
                && retained_until.is_some_and(|until| position.height >= until)
            {
                settled.push(tracked.contract.id());
                continue;
            }

            if tracked.contract.is_refund_eligible(&position) {
                if !tracked.refund_flagged {
                    info!(
                        contract_id = %tracked.contract.id(),
                        expiry = tracked.contract.time_lock().expiry(),
                        "[htlc] Contract expired unclaimed, refund eligible"
                    );
                    tracked.refund_flagged = true;
                }
                report.refund_eligible.push(tracked.contract.id());
            }
            if let Some(height) = tracked.lowest_pending() {
                report.checkpoint = report.checkpoint.min(height);
            }
        }

        for id in settled {
            if self.remove(&id) {
                info!(contract_id = %id, "[htlc] Settled contract no longer tracked");
                self.registered.notify_one();
            }
        }

        let unsubscribed_from = *self.unsubscribed_from.lock();
        if let Some(height) = unsubscribed_from {
            debug!(height, "[htlc] Checkpoint held by a missing subscription");
            report.checkpoint = report.checkpoint.min(height);
        }
        self.save_checkpoint(report.checkpoint).await;
        Ok(report)
    }

    /// Run until `shutdown` flips or its sender is dropped.
    ///
    /// Merges every tracked address's event stream, polls every
    /// `poll_interval_ms`, and subscribes contracts registered meanwhile.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let stopped = *shutdown.borrow();
        if stopped {
            return;
        }
        info!(
            contracts = self.tracked_count(),
            "[htlc] Watcher started"
        );

        let mut streams: Subscriptions = StreamMap::new();
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.sync_subscriptions(&mut streams).await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("[htlc] Shutdown signal received");
                    break;
                }
                _ = self.registered.notified() => {
                    self.sync_subscriptions(&mut streams).await;
                }
                Some((_, event)) = streams.next() => {
                    self.on_ledger_event(event).await;
                }
                _ = ticker.tick() => {
                    self.tick(&mut streams).await;
                }
            }
        }

        info!("[htlc] Watcher stopped");
    }

    /// Working copy of a tracked contract.
    pub async fn contract(&self, id: &ContractId) -> Option<Contract> {
        let entry = self.entry(id)?;
        let tracked = entry.lock().await;
        Some(tracked.contract.clone())
    }

    /// Queued events for a tracked contract.
    pub async fn pending_count(&self, id: &ContractId) -> usize {
        match self.entry(id) {
            Some(entry) => entry.lock().await.pending.len(),
            None => 0,
        }
    }

    /// Whether `id` is tracked.
    pub fn is_tracked(&self, id: &ContractId) -> bool {
        self.tracked.read().contains_key(id)
    }

    /// Number of tracked contracts.
    pub fn tracked_count(&self) -> usize {
        self.tracked.read().len()
    }

    /// Last checkpoint written to (or loaded from) the store.
    pub fn checkpoint(&self) -> Option<u64> {
        *self.checkpoint.lock()
    }

    fn track(&self, contract: Contract, scan_from: u64) -> bool {
        let id = contract.id();
        let tracked = Tracked::new(contract);
        let address = tracked.address.clone();
        let funding: Vec<TxRef> = tracked.funding_refs.iter().copied().collect();

        {
            let mut map = self.tracked.write();
            if map.contains_key(&id) {
                return false;
            }
            map.insert(id, Arc::new(Mutex::new(tracked)));
        }
        {
            let mut by_address = self.by_address.write();
            let entry = by_address.entry(address).or_insert_with(|| AddressEntry {
                contracts: BTreeSet::new(),
                scan_from,
            });
            entry.contracts.insert(id);
            entry.scan_from = entry.scan_from.min(scan_from);
        }
        {
            let mut by_funding = self.by_funding.write();
            for tx_ref in funding {
                by_funding.entry(tx_ref).or_default().insert(id);
            }
        }
        true
    }

    fn entry(&self, id: &ContractId) -> Option<Arc<Mutex<Tracked>>> {
        self.tracked.read().get(id).cloned()
    }

    fn entries(&self) -> Vec<Arc<Mutex<Tracked>>> {
        let tracked = self.tracked.read();
        let mut ids: Vec<&ContractId> = tracked.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| tracked.get(id).cloned()).collect()
    }

    fn route(&self, event: &TransactionEvent) -> BTreeSet<ContractId> {
        let mut ids = BTreeSet::new();
        {
            let by_address = self.by_address.read();
            for output in &event.outputs {
                if let Some(entry) = by_address.get(&output.address) {
                    ids.extend(entry.contracts.iter().copied());
                }
            }
        }
        {
            let by_funding = self.by_funding.read();
            for input in &event.inputs {
                if let Some(contracts) = by_funding.get(&input.spends) {
                    ids.extend(contracts.iter().copied());
                }
            }
        }
        ids
    }

    fn enqueue(&self, tracked: &mut Tracked, event: TransactionEvent) {
        let id = tracked.contract.id();
        if event.outputs.iter().any(|o| o.address == tracked.address)
            && tracked.funding_refs.insert(event.tx_ref)
        {
            self.by_funding
                .write()
                .entry(event.tx_ref)
                .or_default()
                .insert(id);
        }

        let key = event.order_key();
        match tracked.pending.get_mut(&key) {
            Some(queued) => queued.confirmations = queued.confirmations.max(event.confirmations),
            None => {
                tracked.pending.insert(key, event);
            }
        }
    }

    fn forget_funding_candidate(&self, tracked: &mut Tracked, tx_ref: &TxRef) {
        if tracked.contract.funding_ref().as_ref() == Some(tx_ref) {
            return;
        }
        tracked.funding_refs.remove(tx_ref);
        let id = tracked.contract.id();
        let mut by_funding = self.by_funding.write();
        if let Some(ids) = by_funding.get_mut(tx_ref) {
            ids.remove(&id);
            if ids.is_empty() {
                by_funding.remove(tx_ref);
            }
        }
    }

    async fn drain(&self, tracked: &mut Tracked, depth: u64) -> Vec<EventReport> {
        let id = tracked.contract.id();
        let mut reports = Vec::new();

        loop {
            let Some((key, event)) = tracked
                .pending
                .first_key_value()
                .map(|(k, e)| (*k, e.clone()))
            else {
                break;
            };
            let tx_ref = event.tx_ref;
            let snapshot = tracked.contract.clone();
            let mut event_reports = Vec::new();
            let mut waiting = None;
            let mut dirty = false;
            let mut mismatched = false;
            let mut settles = false;

            for observation in tracked.observations(&event) {
                match tracked.contract.apply(&observation, depth) {
                    Ok(outcome) if outcome.is_pending() => {
                        waiting = Some(outcome);
                        break;
                    }
                    Ok(outcome) => {
                        log_outcome(id, tx_ref, &outcome);
                        dirty |= outcome.needs_persist();
                        if let TransitionOutcome::Applied { state } = outcome {
                            settles |= state.is_terminal();
                        }
                        event_reports.push(EventReport {
                            contract_id: id,
                            tx_ref,
                            disposition: Disposition::Transition { outcome },
                        });
                    }
                    Err(e) => {
                        warn!(
                            contract_id = %id,
                            tx_ref = %tx_ref,
                            category = %e.category(),
                            error = %e,
                            "[htlc] Event rejected, state unchanged"
                        );
                        if let (Observation::Funding(_), HtlcError::FundingMismatch { .. }) =
                            (&observation, &e)
                        {
                            mismatched = true;
                        }
                        event_reports.push(EventReport {
                            contract_id: id,
                            tx_ref,
                            disposition: Disposition::Rejected {
                                category: e.category(),
                                reason: e.to_string(),
                            },
                        });
                    }
                }
            }

            if let Some(outcome) = waiting {
                tracked.contract = snapshot;
                debug!(
                    contract_id = %id,
                    tx_ref = %tx_ref,
                    ?outcome,
                    "[htlc] Event queued until confirmed"
                );
                reports.push(EventReport {
                    contract_id: id,
                    tx_ref,
                    disposition: Disposition::Transition { outcome },
                });
                break;
            }

            if dirty {
                if let Err(e) = self.store.save(&tracked.contract).await {
                    tracked.contract = snapshot;
                    error!(
                        contract_id = %id,
                        tx_ref = %tx_ref,
                        error = %e,
                        "[htlc] Store write failed, event stays queued"
                    );
                    reports.push(EventReport {
                        contract_id: id,
                        tx_ref,
                        disposition: Disposition::Deferred {
                            reason: e.to_string(),
                        },
                    });
                    break;
                }
            }

            // Another output of the same event may have applied it
            if mismatched {
                self.forget_funding_candidate(tracked, &tx_ref);
            }
            if settles {
                tracked.settled_at = Some(key.0);
            }
            tracked.pending.remove(&key);
            self.acknowledge(&tracked.address, &tx_ref).await;
            reports.extend(event_reports);
        }

        reports
    }

    async fn refresh_confirmations(&self, tracked: &mut Tracked, depth: u64) {
        let stale: Vec<(u64, TxRef)> = tracked
            .pending
            .iter()
            .filter(|(_, e)| e.confirmations < depth)
            .map(|(k, _)| *k)
            .collect();

        let ledger = self.ledger.as_ref();
        for key in &stale {
            let tx_ref = &key.1;
            match with_retry(&self.retry, "get_confirmations", move || {
                ledger.get_confirmations(tx_ref)
            })
            .await
            {
                Ok(confirmations) => {
                    if let Some(event) = tracked.pending.get_mut(key) {
                        event.confirmations = event.confirmations.max(confirmations);
                    }
                }
                Err(e) => {
                    warn!(
                        tx_ref = %tx_ref,
                        error = %e,
                        "[htlc] Could not refresh confirmations, keeping last count"
                    );
                    break;
                }
            }
        }
    }

    async fn acknowledge(&self, address: &LedgerAddress, tx_ref: &TxRef) {
        let ledger = self.ledger.as_ref();
        if let Err(e) = with_retry(&self.retry, "acknowledge", move || {
            ledger.acknowledge(address, tx_ref)
        })
        .await
        {
            // Already persisted; a redelivery is absorbed as a duplicate
            warn!(tx_ref = %tx_ref, error = %e, "[htlc] Acknowledgement failed");
        }
    }

    async fn save_checkpoint(&self, height: u64) {
        let saved = *self.checkpoint.lock();
        if saved == Some(height) {
            return;
        }
        match self.store.save_checkpoint(height).await {
            Ok(()) => {
                *self.checkpoint.lock() = Some(height);
                debug!(height, "[htlc] Checkpoint saved");
            }
            Err(e) => warn!(height, error = %e, "[htlc] Checkpoint write failed"),
        }
    }

    async fn sync_subscriptions(&self, streams: &mut Subscriptions) {
        let wanted: Vec<(LedgerAddress, u64)> = self
            .by_address
            .read()
            .iter()
            .map(|(address, entry)| (address.clone(), entry.scan_from))
            .collect();

        let stale: Vec<LedgerAddress> = streams
            .keys()
            .filter(|a| !wanted.iter().any(|(w, _)| w == *a))
            .cloned()
            .collect();
        for address in stale {
            streams.remove(&address);
            debug!(address = %address, "[htlc] Subscription dropped");
        }

        let ledger = self.ledger.as_ref();
        let mut missing: Option<u64> = None;
        for (address, from_height) in wanted {
            if streams.contains_key(&address) {
                continue;
            }
            let watched = &address;
            match with_retry(&self.retry, "watch_address", move || {
                ledger.watch_address(watched, from_height)
            })
            .await
            {
                Ok(rx) => {
                    streams.insert(address, ReceiverStream::new(rx));
                }
                Err(e) => {
                    warn!(
                        address = %address,
                        error = %e,
                        "[htlc] Subscription failed, retrying next tick"
                    );
                    missing = Some(missing.map_or(from_height, |m| m.min(from_height)));
                }
            }
        }
        *self.unsubscribed_from.lock() = missing;
    }

    async fn tick(&self, streams: &mut Subscriptions) {
        self.sync_subscriptions(streams).await;

        let ledger = self.ledger.as_ref();
        let position = match with_retry(&self.retry, "current_position", move || {
            ledger.current_position()
        })
        .await
        {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, "[htlc] Ledger unavailable, skipping poll");
                return;
            }
        };

        if let Ok(report) = self.poll(position).await {
            if !report.events.is_empty() {
                debug!(
                    events = report.events.len(),
                    checkpoint = report.checkpoint,
                    "[htlc] Poll processed queued events"
                );
            }
        }
    }
}

fn log_outcome(id: ContractId, tx_ref: TxRef, outcome: &TransitionOutcome) {
    match outcome {
        TransitionOutcome::Applied { state } => info!(
            contract_id = %id,
            tx_ref = %tx_ref,
            state = %state,
            "[htlc] Transition applied"
        ),
        TransitionOutcome::Recorded => warn!(
            contract_id = %id,
            tx_ref = %tx_ref,
            "[htlc] Event recorded in audit log"
        ),
        TransitionOutcome::IgnoredTerminal { state } => info!(
            contract_id = %id,
            tx_ref = %tx_ref,
            state = %state,
            "[htlc] Event on settled contract ignored"
        ),
        TransitionOutcome::Duplicate => debug!(
            contract_id = %id,
            tx_ref = %tx_ref,
            "[htlc] Duplicate event"
        ),
        TransitionOutcome::AwaitingConfirmations { .. } | TransitionOutcome::AwaitingFunding => {}
    }
}
