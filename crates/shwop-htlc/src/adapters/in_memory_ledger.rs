//! In-memory Ledger Adapter
//!
//! Simulated ledger implementing the `Ledger` port. Height and time are
//! advanced by hand, transactions are included explicitly, and every
//! broadcast and acknowledgement is captured for inspection.

use crate::algorithms::secret::digest;
use crate::domain::{HtlcError, LedgerAddress, LedgerPosition, RawTx, TxRef};
use crate::ports::outbound::{EventStream, Ledger, TransactionEvent};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Seconds between simulated blocks.
pub const BLOCK_INTERVAL_SECS: u64 = 10;

/// Default subscriber buffer.
const DEFAULT_EVENT_BUFFER: usize = 64;

#[derive(Default)]
struct LedgerState {
    height: u64,
    time: u64,
    unavailable: bool,
    transactions: Vec<TransactionEvent>,
    subscribers: HashMap<LedgerAddress, Vec<mpsc::Sender<TransactionEvent>>>,
    broadcasts: Vec<RawTx>,
    acknowledged: Vec<(LedgerAddress, TxRef)>,
}

impl LedgerState {
    fn confirmations(&self, height: u64) -> u64 {
        if self.height >= height {
            self.height - height + 1
        } else {
            0
        }
    }

    fn with_current_confirmations(&self, event: &TransactionEvent) -> TransactionEvent {
        let mut event = event.clone();
        event.confirmations = self.confirmations(event.height);
        event
    }

    /// Outputs' addresses, plus the addresses of the outputs each input spends.
    fn addresses_touched(&self, event: &TransactionEvent) -> BTreeSet<LedgerAddress> {
        let mut addresses: BTreeSet<LedgerAddress> =
            event.outputs.iter().map(|o| o.address.clone()).collect();
        for input in &event.inputs {
            if let Some(spent) = self.transactions.iter().find(|t| t.tx_ref == input.spends) {
                addresses.extend(spent.outputs.iter().map(|o| o.address.clone()));
            }
        }
        addresses
    }
}

/// Simulated ledger for tests and local runs.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    depth: u64,
    event_buffer: usize,
}

impl InMemoryLedger {
    /// Ledger at height 0 requiring `confirmation_depth` confirmations.
    pub fn new(confirmation_depth: u64) -> Self {
        Self::starting_at(LedgerPosition::new(0, 1_700_000_000), confirmation_depth)
    }

    /// Ledger starting at `position`.
    pub fn starting_at(position: LedgerPosition, confirmation_depth: u64) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                height: position.height,
                time: position.time,
                ..LedgerState::default()
            }),
            depth: confirmation_depth,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Set the per-subscriber buffer.
    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }

    /// Current height and time.
    pub fn position(&self) -> LedgerPosition {
        let state = self.state.read();
        LedgerPosition::new(state.height, state.time)
    }

    /// Advance by `blocks`, [`BLOCK_INTERVAL_SECS`] apart.
    pub fn mine(&self, blocks: u64) -> LedgerPosition {
        let mut state = self.state.write();
        state.height += blocks;
        state.time += blocks * BLOCK_INTERVAL_SECS;
        LedgerPosition::new(state.height, state.time)
    }

    /// Jump to `position`, backward included.
    pub fn set_position(&self, position: LedgerPosition) {
        let mut state = self.state.write();
        state.height = position.height;
        state.time = position.time;
    }

    /// Make every call fail with [`HtlcError::LedgerUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    /// Include a transaction at its own height and notify subscribers.
    pub async fn include(&self, event: TransactionEvent) -> TxRef {
        let tx_ref = event.tx_ref;
        let deliveries = {
            let mut state = self.state.write();
            state.transactions.push(event.clone());
            let delivered = state.with_current_confirmations(&event);
            let mut deliveries = Vec::new();
            for address in state.addresses_touched(&event) {
                if let Some(senders) = state.subscribers.get_mut(&address) {
                    senders.retain(|s| !s.is_closed());
                    deliveries.extend(senders.iter().cloned());
                }
            }
            (delivered, deliveries)
        };

        let (delivered, senders) = deliveries;
        debug!(
            "[htlc] Included tx {} at height {} ({} subscribers)",
            tx_ref,
            delivered.height,
            senders.len()
        );
        for sender in senders {
            let _ = sender.send(delivered.clone()).await;
        }
        tx_ref
    }

    /// Raw transactions broadcast so far.
    pub fn broadcasts(&self) -> Vec<RawTx> {
        self.state.read().broadcasts.clone()
    }

    /// Acknowledged `(address, tx_ref)` pairs, in order.
    pub fn acknowledged(&self) -> Vec<(LedgerAddress, TxRef)> {
        self.state.read().acknowledged.clone()
    }

    /// Whether `tx_ref` was acknowledged on any address.
    pub fn is_acknowledged(&self, tx_ref: &TxRef) -> bool {
        self.state
            .read()
            .acknowledged
            .iter()
            .any(|(_, t)| t == tx_ref)
    }

    /// Live subscriptions on `address`.
    pub fn subscriber_count(&self, address: &LedgerAddress) -> usize {
        self.state
            .read()
            .subscribers
            .get(address)
            .map(|s| s.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), HtlcError> {
        if self.state.read().unavailable {
            return Err(HtlcError::LedgerUnavailable(
                "in-memory ledger offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn current_height(&self) -> Result<u64, HtlcError> {
        self.check_available()?;
        Ok(self.state.read().height)
    }

    async fn current_time(&self) -> Result<u64, HtlcError> {
        self.check_available()?;
        Ok(self.state.read().time)
    }

    fn confirmation_depth(&self) -> u64 {
        self.depth
    }

    async fn watch_address(
        &self,
        address: &LedgerAddress,
        from_height: u64,
    ) -> Result<EventStream, HtlcError> {
        self.check_available()?;
        let mut state = self.state.write();
        let replay: Vec<TransactionEvent> = state
            .transactions
            .iter()
            .filter(|t| t.height >= from_height && state.addresses_touched(t).contains(address))
            .map(|t| state.with_current_confirmations(t))
            .collect();

        let (tx, rx) = mpsc::channel(self.event_buffer.max(replay.len() + 1));
        for event in replay {
            // Capacity covers the replay
            let _ = tx.try_send(event);
        }
        state
            .subscribers
            .entry(address.clone())
            .or_default()
            .push(tx);

        let prefix: String = address.0.chars().take(8).collect();
        info!("[htlc] Watching {} from height {}", prefix, from_height);
        Ok(rx)
    }

    async fn broadcast(&self, raw: &RawTx) -> Result<TxRef, HtlcError> {
        self.check_available()?;
        let tx_ref = TxRef(digest(&raw.0));
        self.state.write().broadcasts.push(raw.clone());
        debug!("[htlc] Broadcast tx {}", tx_ref);
        Ok(tx_ref)
    }

    async fn get_confirmations(&self, tx_ref: &TxRef) -> Result<u64, HtlcError> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .transactions
            .iter()
            .find(|t| &t.tx_ref == tx_ref)
            .map(|t| state.confirmations(t.height))
            .unwrap_or(0))
    }

    async fn acknowledge(&self, address: &LedgerAddress, tx_ref: &TxRef) -> Result<(), HtlcError> {
        self.check_available()?;
        self.state
            .write()
            .acknowledged
            .push((address.clone(), *tx_ref));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LockingCondition, TimeLock};
    use crate::ports::outbound::{SpendWitness, TxInput, TxOutput};

    fn condition() -> LockingCondition {
        LockingCondition {
            hash: [1u8; 32],
            time_lock: TimeLock::at_height(100).unwrap(),
            receiver: [2u8; 20],
            sender: [3u8; 20],
        }
    }

    #[tokio::test]
    async fn test_mine_advances_height_and_time() {
        let ledger = InMemoryLedger::starting_at(LedgerPosition::new(10, 1_000), 1);
        let pos = ledger.mine(3);
        assert_eq!(pos, LedgerPosition::new(13, 1_030));
        assert_eq!(ledger.current_height().await.unwrap(), 13);
        assert_eq!(ledger.current_time().await.unwrap(), 1_030);
    }

    #[tokio::test]
    async fn test_confirmations_grow_with_height() {
        let ledger = InMemoryLedger::starting_at(LedgerPosition::new(10, 1_000), 3);
        let tx = TxRef([5u8; 32]);
        ledger
            .include(TransactionEvent::new(tx, LedgerPosition::new(10, 1_000)))
            .await;
        assert_eq!(ledger.get_confirmations(&tx).await.unwrap(), 1);
        ledger.mine(2);
        assert_eq!(ledger.get_confirmations(&tx).await.unwrap(), 3);
        assert_eq!(ledger.get_confirmations(&TxRef([0u8; 32])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_watch_replays_and_streams() {
        let ledger = InMemoryLedger::starting_at(LedgerPosition::new(10, 1_000), 1);
        let condition = condition();
        let address = condition.address();
        let funding = TxRef([5u8; 32]);
        ledger
            .include(
                TransactionEvent::new(funding, LedgerPosition::new(10, 1_000))
                    .with_output(TxOutput::locked_to(&condition, 50)),
            )
            .await;

        let mut stream = ledger.watch_address(&address, 0).await.unwrap();
        let replayed = stream.recv().await.unwrap();
        assert_eq!(replayed.tx_ref, funding);
        assert_eq!(replayed.confirmations, 1);

        // A spend of the funding output is routed to the same address
        ledger.mine(1);
        let refund = TxRef([6u8; 32]);
        ledger
            .include(
                TransactionEvent::new(refund, LedgerPosition::new(11, 1_010)).with_input(
                    TxInput {
                        spends: funding,
                        witness: SpendWitness::Refund {
                            authorizer: [3u8; 20],
                        },
                    },
                ),
            )
            .await;
        assert_eq!(stream.recv().await.unwrap().tx_ref, refund);
        assert_eq!(ledger.subscriber_count(&address), 1);
    }

    #[tokio::test]
    async fn test_watch_skips_history_below_from_height() {
        let ledger = InMemoryLedger::starting_at(LedgerPosition::new(20, 1_000), 1);
        let condition = condition();
        ledger
            .include(
                TransactionEvent::new(TxRef([5u8; 32]), LedgerPosition::new(10, 900))
                    .with_output(TxOutput::locked_to(&condition, 50)),
            )
            .await;
        let mut stream = ledger.watch_address(&condition.address(), 15).await.unwrap();
        assert!(stream.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_non_ascii_address() {
        let ledger = InMemoryLedger::default();
        let address = LedgerAddress("адрес-получателя".to_string());
        let mut stream = ledger.watch_address(&address, 0).await.unwrap();
        assert!(stream.try_recv().is_err());
        assert_eq!(ledger.subscriber_count(&address), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let ledger = InMemoryLedger::default();
        ledger.set_unavailable(true);
        assert!(matches!(
            ledger.current_height().await,
            Err(HtlcError::LedgerUnavailable(_))
        ));
        ledger.set_unavailable(false);
        assert!(ledger.current_height().await.is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_and_ack_recorded() {
        let ledger = InMemoryLedger::default();
        let tx = ledger.broadcast(&RawTx(vec![1, 2, 3])).await.unwrap();
        assert_eq!(tx, TxRef(digest(&[1, 2, 3])));
        assert_eq!(ledger.broadcasts().len(), 1);

        let address = LedgerAddress("ab".repeat(32));
        ledger.acknowledge(&address, &tx).await.unwrap();
        assert!(ledger.is_acknowledged(&tx));
    }
}
