//! # Domain Entities
//!
//! The HTLC contract record and the ledger observations that drive it.
//!
//! ## State machine
//!
//! ```text
//! Created ──funding──→ Funded ──claim (preimage, before expiry)──→ Claimed
//!                        │
//!                        └──refund (sender, at/after expiry)─────→ Refunded
//! ```
//!
//! Expiry is a gate on the refund path, not a state of its own. Claimed and
//! Refunded are terminal: later events are logged, never re-applied.

use super::errors::{Address, Hash, HtlcError};
use super::hash_lock::{HashLock, Preimage};
use super::invariants::{
    invariant_authorized_claimer, invariant_authorized_refunder, invariant_claim_window,
    invariant_funding_matches, invariant_positive_amount, invariant_refund_window,
    invariant_sufficient_confirmations,
};
use super::locking_condition::LockingCondition;
use super::time_lock::TimeLock;
use super::value_objects::{
    hex_array, ContractId, ContractState, LedgerAddress, LedgerPosition, SettlementKind, TxRef,
};
use serde::{Deserialize, Serialize};

/// Parameters for creating a contract.
#[derive(Clone, Debug)]
pub struct ContractParams {
    /// Party that funds and may refund.
    pub sender: Address,
    /// Party that may claim with the preimage.
    pub receiver: Address,
    /// Locked amount, in the ledger's smallest unit.
    pub amount: u64,
    /// Hash commitment.
    pub hash_lock: HashLock,
    /// Refund gate.
    pub time_lock: TimeLock,
    /// Ledger position at creation.
    pub created_at: LedgerPosition,
}

/// Funding output paid to the contract's address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingObservation {
    /// Funding transaction.
    pub tx_ref: TxRef,
    /// Amount paid to the contract address.
    pub amount: u64,
    /// Hash committed in the output's locking condition, if it decoded.
    pub committed_hash: Option<Hash>,
    /// Confirmations at observation time.
    pub confirmations: u64,
    /// Where the transaction was included.
    pub position: LedgerPosition,
}

/// Hash-lock spend of a funding output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimObservation {
    /// Claim transaction.
    pub tx_ref: TxRef,
    /// Funding transaction it consumes.
    pub spends: TxRef,
    /// Revealed preimage.
    pub preimage: Preimage,
    /// Key that signed the claim.
    pub claimant: Address,
    /// Confirmations at observation time.
    pub confirmations: u64,
    /// Where the transaction was included.
    pub position: LedgerPosition,
}

/// Time-lock spend of a funding output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundObservation {
    /// Refund transaction.
    pub tx_ref: TxRef,
    /// Funding transaction it consumes.
    pub spends: TxRef,
    /// Key that signed the refund.
    pub authorizer: Address,
    /// Confirmations at observation time.
    pub confirmations: u64,
    /// Where the transaction was included.
    pub position: LedgerPosition,
}

/// Any ledger event relevant to a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    /// Funding output.
    Funding(FundingObservation),
    /// Claim spend.
    Claim(ClaimObservation),
    /// Refund spend.
    Refund(RefundObservation),
}

impl Observation {
    /// Transaction the observation came from.
    pub fn tx_ref(&self) -> TxRef {
        match self {
            Self::Funding(o) => o.tx_ref,
            Self::Claim(o) => o.tx_ref,
            Self::Refund(o) => o.tx_ref,
        }
    }

    /// Where the transaction was included.
    pub fn position(&self) -> LedgerPosition {
        match self {
            Self::Funding(o) => o.position,
            Self::Claim(o) => o.position,
            Self::Refund(o) => o.position,
        }
    }
}

/// Result of applying an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// State advanced.
    Applied {
        /// New state
        state: ContractState,
    },
    /// Valid, but not yet buried deep enough.
    AwaitingConfirmations {
        /// Confirmations seen
        confirmations: u64,
        /// Confirmations required
        required: u64,
    },
    /// A spend arrived before the funding it consumes was confirmed.
    AwaitingFunding,
    /// Already applied or already recorded.
    Duplicate,
    /// Contract is terminal; the event changes nothing.
    IgnoredTerminal {
        /// Terminal state
        state: ContractState,
    },
    /// State unchanged, but an audit entry was appended.
    Recorded,
}

impl TransitionOutcome {
    /// Whether the contract record changed and must be saved.
    pub fn needs_persist(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Recorded)
    }

    /// Whether the event should be re-evaluated later.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::AwaitingConfirmations { .. } | Self::AwaitingFunding
        )
    }
}

/// Notable events that did not change the contract's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditKind {
    /// Claim signed by someone other than the receiver.
    UnexpectedClaimant {
        /// Signer of the claim
        #[serde(with = "hex_array")]
        claimant: Address,
    },
    /// A competing spend after the contract settled.
    RejectedSpend {
        /// Which path the spend used
        kind: SettlementKind,
        /// Terminal state at the time
        state: ContractState,
    },
    /// A second funding output paid to the same address.
    DuplicateFunding {
        /// Amount of the extra output
        amount: u64,
    },
}

/// One audit log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened.
    #[serde(flatten)]
    pub kind: AuditKind,
    /// Transaction involved.
    pub tx_ref: TxRef,
    /// Where it was included.
    pub position: LedgerPosition,
}

/// A hash time-locked contract.
///
/// Fields are private: state only moves through [`Contract::apply`] and its
/// per-observation helpers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    id: ContractId,
    #[serde(with = "hex_array")]
    sender: Address,
    #[serde(with = "hex_array")]
    receiver: Address,
    amount: u64,
    hash_lock: HashLock,
    time_lock: TimeLock,
    state: ContractState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    funding_ref: Option<TxRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settlement_ref: Option<TxRef>,
    created_at: LedgerPosition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    audit_log: Vec<AuditEntry>,
}

impl Contract {
    /// Create a contract in [`ContractState::Created`].
    pub fn new(params: ContractParams) -> Result<Self, HtlcError> {
        invariant_positive_amount(params.amount)?;
        let id = ContractId::derive(
            params.hash_lock.hash(),
            &params.sender,
            &params.receiver,
            params.amount,
        );
        Ok(Self {
            id,
            sender: params.sender,
            receiver: params.receiver,
            amount: params.amount,
            hash_lock: params.hash_lock,
            time_lock: params.time_lock,
            state: ContractState::Created,
            funding_ref: None,
            settlement_ref: None,
            created_at: params.created_at,
            audit_log: Vec::new(),
        })
    }

    /// Contract id.
    pub fn id(&self) -> ContractId {
        self.id
    }

    /// Sender.
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    /// Receiver.
    pub fn receiver(&self) -> &Address {
        &self.receiver
    }

    /// Locked amount.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Hash lock, with the preimage once claimed.
    pub fn hash_lock(&self) -> &HashLock {
        &self.hash_lock
    }

    /// Time lock.
    pub fn time_lock(&self) -> &TimeLock {
        &self.time_lock
    }

    /// Current state.
    pub fn state(&self) -> ContractState {
        self.state
    }

    /// Funding transaction, once funded.
    pub fn funding_ref(&self) -> Option<TxRef> {
        self.funding_ref
    }

    /// Claim or refund transaction, once settled.
    pub fn settlement_ref(&self) -> Option<TxRef> {
        self.settlement_ref
    }

    /// Ledger position at creation.
    pub fn created_at(&self) -> LedgerPosition {
        self.created_at
    }

    /// Non-transition events seen so far.
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    /// Whether the contract reached Claimed or Refunded.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The predicate the funding output must carry.
    pub fn locking_condition(&self) -> LockingCondition {
        LockingCondition {
            hash: *self.hash_lock.hash(),
            time_lock: self.time_lock,
            receiver: self.receiver,
            sender: self.sender,
        }
    }

    /// Address the funding output is paid to.
    pub fn address(&self) -> LedgerAddress {
        self.locking_condition().address()
    }

    /// Funded and past expiry, so the sender may refund.
    pub fn is_refund_eligible(&self, position: &LedgerPosition) -> bool {
        self.state == ContractState::Funded && self.time_lock.is_expired_at(position)
    }

    /// Apply an observation requiring `depth` confirmations.
    ///
    /// Protocol violations return an error and leave the contract untouched.
    pub fn apply(
        &mut self,
        observation: &Observation,
        depth: u64,
    ) -> Result<TransitionOutcome, HtlcError> {
        match observation {
            Observation::Funding(o) => self.apply_funding(o, depth),
            Observation::Claim(o) => self.apply_claim(o, depth),
            Observation::Refund(o) => self.apply_refund(o, depth),
        }
    }

    /// Created → Funded.
    pub fn apply_funding(
        &mut self,
        obs: &FundingObservation,
        depth: u64,
    ) -> Result<TransitionOutcome, HtlcError> {
        match self.state {
            ContractState::Created => {
                invariant_funding_matches(
                    self.id,
                    self.amount,
                    self.hash_lock.hash(),
                    obs.amount,
                    obs.committed_hash.as_ref(),
                )?;
                if let Some(pending) = Self::pending(obs.confirmations, depth) {
                    return Ok(pending);
                }
                self.transition_to(ContractState::Funded)?;
                self.funding_ref = Some(obs.tx_ref);
                Ok(TransitionOutcome::Applied {
                    state: self.state,
                })
            }
            ContractState::Funded => {
                if self.funding_ref == Some(obs.tx_ref) || self.has_audit_entry(&obs.tx_ref) {
                    return Ok(TransitionOutcome::Duplicate);
                }
                self.record(
                    AuditKind::DuplicateFunding { amount: obs.amount },
                    obs.tx_ref,
                    obs.position,
                );
                Ok(TransitionOutcome::Recorded)
            }
            state => {
                if self.funding_ref == Some(obs.tx_ref) {
                    return Ok(TransitionOutcome::Duplicate);
                }
                Ok(TransitionOutcome::IgnoredTerminal { state })
            }
        }
    }

    /// Funded → Claimed.
    pub fn apply_claim(
        &mut self,
        obs: &ClaimObservation,
        depth: u64,
    ) -> Result<TransitionOutcome, HtlcError> {
        match self.state {
            ContractState::Created => Ok(TransitionOutcome::AwaitingFunding),
            ContractState::Funded => {
                self.ensure_spends_funding(&obs.spends, &obs.tx_ref)?;
                if !HashLock::verify(self.hash_lock.hash(), &obs.preimage) {
                    return Err(HtlcError::InvalidPreimage);
                }
                invariant_claim_window(
                    self.id,
                    &self.time_lock,
                    obs.position.at(self.time_lock.mode()),
                )?;
                if let Some(pending) = Self::pending(obs.confirmations, depth) {
                    return Ok(pending);
                }
                self.transition_to(ContractState::Claimed)?;
                self.hash_lock.reveal(obs.preimage.clone())?;
                self.settlement_ref = Some(obs.tx_ref);
                if !invariant_authorized_claimer(&self.receiver, &obs.claimant) {
                    self.record(
                        AuditKind::UnexpectedClaimant {
                            claimant: obs.claimant,
                        },
                        obs.tx_ref,
                        obs.position,
                    );
                }
                Ok(TransitionOutcome::Applied {
                    state: self.state,
                })
            }
            _ => Ok(self.settled_spend(SettlementKind::Claim, obs.tx_ref, obs.position)),
        }
    }

    /// Funded → Refunded.
    pub fn apply_refund(
        &mut self,
        obs: &RefundObservation,
        depth: u64,
    ) -> Result<TransitionOutcome, HtlcError> {
        match self.state {
            ContractState::Created => Ok(TransitionOutcome::AwaitingFunding),
            ContractState::Funded => {
                self.ensure_spends_funding(&obs.spends, &obs.tx_ref)?;
                invariant_authorized_refunder(self.id, &self.sender, &obs.authorizer)?;
                invariant_refund_window(
                    self.id,
                    &self.time_lock,
                    obs.position.at(self.time_lock.mode()),
                )?;
                if let Some(pending) = Self::pending(obs.confirmations, depth) {
                    return Ok(pending);
                }
                self.transition_to(ContractState::Refunded)?;
                self.settlement_ref = Some(obs.tx_ref);
                Ok(TransitionOutcome::Applied {
                    state: self.state,
                })
            }
            _ => Ok(self.settled_spend(SettlementKind::Refund, obs.tx_ref, obs.position)),
        }
    }

    /// Guard before signing a funding transaction.
    pub fn ensure_fundable(&self) -> Result<(), HtlcError> {
        match self.state {
            ContractState::Created => Ok(()),
            state if state.is_terminal() => Err(HtlcError::AlreadySettled { id: self.id, state }),
            from => Err(HtlcError::InvalidTransition {
                id: self.id,
                from,
                to: ContractState::Funded,
            }),
        }
    }

    /// Guard before signing a claim at `current` (height or time, per mode).
    pub fn ensure_claimable(&self, preimage: &Preimage, current: u64) -> Result<(), HtlcError> {
        self.ensure_settleable(ContractState::Claimed)?;
        if !HashLock::verify(self.hash_lock.hash(), preimage) {
            return Err(HtlcError::InvalidPreimage);
        }
        invariant_claim_window(self.id, &self.time_lock, current)
    }

    /// Guard before signing a refund at `current` (height or time, per mode).
    pub fn ensure_refundable(&self, current: u64) -> Result<(), HtlcError> {
        self.ensure_settleable(ContractState::Refunded)?;
        invariant_refund_window(self.id, &self.time_lock, current)
    }

    fn ensure_settleable(&self, to: ContractState) -> Result<(), HtlcError> {
        match self.state {
            ContractState::Funded => Ok(()),
            state if state.is_terminal() => Err(HtlcError::AlreadySettled { id: self.id, state }),
            from => Err(HtlcError::InvalidTransition {
                id: self.id,
                from,
                to,
            }),
        }
    }

    fn ensure_spends_funding(&self, spends: &TxRef, tx_ref: &TxRef) -> Result<(), HtlcError> {
        if self.funding_ref.as_ref() != Some(spends) {
            return Err(HtlcError::UnrelatedSpend {
                id: self.id,
                tx_ref: *tx_ref,
            });
        }
        Ok(())
    }

    fn transition_to(&mut self, next: ContractState) -> Result<(), HtlcError> {
        if !self.state.can_transition_to(next) {
            return Err(HtlcError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    fn pending(confirmations: u64, required: u64) -> Option<TransitionOutcome> {
        if invariant_sufficient_confirmations(confirmations, required) {
            None
        } else {
            Some(TransitionOutcome::AwaitingConfirmations {
                confirmations,
                required,
            })
        }
    }

    fn settled_spend(
        &mut self,
        kind: SettlementKind,
        tx_ref: TxRef,
        position: LedgerPosition,
    ) -> TransitionOutcome {
        if self.settlement_ref == Some(tx_ref) || self.has_audit_entry(&tx_ref) {
            return TransitionOutcome::Duplicate;
        }
        self.record(
            AuditKind::RejectedSpend {
                kind,
                state: self.state,
            },
            tx_ref,
            position,
        );
        TransitionOutcome::Recorded
    }

    fn has_audit_entry(&self, tx_ref: &TxRef) -> bool {
        self.audit_log.iter().any(|e| &e.tx_ref == tx_ref)
    }

    fn record(&mut self, kind: AuditKind, tx_ref: TxRef, position: LedgerPosition) {
        self.audit_log.push(AuditEntry {
            kind,
            tx_ref,
            position,
        });
    }
}
