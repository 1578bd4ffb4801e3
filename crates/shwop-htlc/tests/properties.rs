//! # Property Tests
//!
//! "For all" properties of the hash lock, the time lock and the contract
//! state machine.

use proptest::prelude::*;
use shwop_htlc::domain::{
    ClaimObservation, ContractParams, FundingObservation, Observation, RefundObservation,
    MAX_PREIMAGE_LEN,
};
use shwop_htlc::{
    Contract, ContractState, HashLock, HtlcError, LedgerPosition, Preimage, TimeLock, TxRef,
};

const SENDER: [u8; 20] = [0xAA; 20];
const RECEIVER: [u8; 20] = [0xBB; 20];
const FUNDING: TxRef = TxRef([0x01; 32]);

fn make_contract(expiry: u64) -> (Contract, Preimage) {
    let (hash_lock, preimage) = HashLock::create(32).unwrap();
    let contract = Contract::new(ContractParams {
        sender: SENDER,
        receiver: RECEIVER,
        amount: 100,
        hash_lock,
        time_lock: TimeLock::at_height(expiry).unwrap(),
        created_at: LedgerPosition::default(),
    })
    .unwrap();
    (contract, preimage)
}

fn funding(contract: &Contract, tx_ref: TxRef, amount: u64, height: u64) -> FundingObservation {
    FundingObservation {
        tx_ref,
        amount,
        committed_hash: Some(*contract.hash_lock().hash()),
        confirmations: 1,
        position: LedgerPosition::new(height, height),
    }
}

fn funded(expiry: u64) -> (Contract, Preimage) {
    let (mut contract, preimage) = make_contract(expiry);
    let obs = funding(&contract, FUNDING, 100, 0);
    contract.apply_funding(&obs, 1).unwrap();
    (contract, preimage)
}

fn rank(state: ContractState) -> u8 {
    match state {
        ContractState::Created => 0,
        ContractState::Funded => 1,
        ContractState::Claimed | ContractState::Refunded => 2,
    }
}

proptest! {
    #[test]
    fn test_created_preimage_verifies(len in 1usize..=MAX_PREIMAGE_LEN) {
        let (lock, preimage) = HashLock::create(len).unwrap();
        prop_assert_eq!(preimage.len(), len);
        prop_assert!(HashLock::verify(lock.hash(), &preimage));
    }

    #[test]
    fn test_mutated_preimage_fails(index in any::<usize>(), flip in 1u8..=255) {
        let (lock, preimage) = HashLock::create(32).unwrap();
        let mut bytes = preimage.as_bytes().to_vec();
        let at = index % bytes.len();
        bytes[at] ^= flip;
        let mutated = Preimage::new(bytes).unwrap();
        prop_assert!(!HashLock::verify(lock.hash(), &mutated));
    }

    #[test]
    fn test_refund_before_expiry_always_premature(
        expiry in 1u64..u64::MAX / 2,
        offset in 1u64..1_000_000,
    ) {
        let (mut contract, _) = funded(expiry);
        let current = expiry.saturating_sub(offset);
        let obs = RefundObservation {
            tx_ref: TxRef([0x03; 32]),
            spends: FUNDING,
            authorizer: SENDER,
            confirmations: 1,
            position: LedgerPosition::new(current, current),
        };
        let result = contract.apply_refund(&obs, 1);
        let is_premature = matches!(result, Err(HtlcError::PrematureRefund { .. }));
        prop_assert!(is_premature);
        prop_assert_eq!(contract.state(), ContractState::Funded);
    }

    #[test]
    fn test_funding_mismatch_never_advances(amount in any::<u64>()) {
        prop_assume!(amount != 100);
        let (mut contract, _) = make_contract(1_000);
        let before = contract.clone();
        let obs = funding(&contract, FUNDING, amount, 10);
        let result = contract.apply_funding(&obs, 1);
        let is_mismatch = matches!(result, Err(HtlcError::FundingMismatch { .. }));
        prop_assert!(is_mismatch);
        prop_assert_eq!(contract, before);
    }

    #[test]
    fn test_state_never_moves_backward(
        steps in prop::collection::vec((0u8..3, 1u64..2_000, any::<bool>(), any::<bool>()), 1..24),
    ) {
        let (mut contract, preimage) = make_contract(1_000);
        let wrong = Preimage::new(vec![0u8; 32]).unwrap();
        let mut terminal: Option<ContractState> = None;
        let mut last = contract.state();

        for (i, (kind, height, honest, by_sender)) in steps.into_iter().enumerate() {
            let tx_ref = TxRef([i as u8 + 0x10; 32]);
            let position = LedgerPosition::new(height, height);
            let observation = match kind {
                0 => Observation::Funding(FundingObservation {
                    tx_ref: if honest { FUNDING } else { tx_ref },
                    amount: if by_sender { 100 } else { 99 },
                    committed_hash: Some(*contract.hash_lock().hash()),
                    confirmations: 1,
                    position,
                }),
                1 => Observation::Claim(ClaimObservation {
                    tx_ref,
                    spends: FUNDING,
                    preimage: if honest { preimage.clone() } else { wrong.clone() },
                    claimant: RECEIVER,
                    confirmations: 1,
                    position,
                }),
                _ => Observation::Refund(RefundObservation {
                    tx_ref,
                    spends: FUNDING,
                    authorizer: if by_sender { SENDER } else { RECEIVER },
                    confirmations: 1,
                    position,
                }),
            };

            let _ = contract.apply(&observation, 1);
            let state = contract.state();
            prop_assert!(rank(state) >= rank(last));
            if let Some(settled) = terminal {
                prop_assert_eq!(state, settled);
            }
            if state.is_terminal() {
                terminal = Some(state);
            }
            last = state;
        }
    }
}
