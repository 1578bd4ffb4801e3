//! # Domain Invariants
//!
//! Business rules the contract state machine is built from. Each rule is a
//! pure function so the watcher's pre-broadcast guards and the transition
//! methods share one definition.

use super::errors::{Address, Hash, HtlcError};
use super::time_lock::TimeLock;
use super::value_objects::ContractId;
use crate::algorithms::secret::digests_equal;

/// Invariant: amount is strictly positive.
pub fn invariant_positive_amount(amount: u64) -> Result<(), HtlcError> {
    if amount == 0 {
        return Err(HtlcError::InvalidAmount);
    }
    Ok(())
}

/// Invariant: observed funding matches the recorded amount and hash.
///
/// `observed_hash` is `None` when the output's locking condition could not be
/// decoded, which counts as a hash mismatch.
pub fn invariant_funding_matches(
    id: ContractId,
    expected_amount: u64,
    expected_hash: &Hash,
    observed_amount: u64,
    observed_hash: Option<&Hash>,
) -> Result<(), HtlcError> {
    let hash_matches = observed_hash
        .map(|h| digests_equal(h, expected_hash))
        .unwrap_or(false);
    if observed_amount != expected_amount || !hash_matches {
        return Err(HtlcError::FundingMismatch {
            id,
            expected_amount,
            observed_amount,
            hash_matches,
        });
    }
    Ok(())
}

/// Invariant: claims land strictly before expiry.
pub fn invariant_claim_window(
    id: ContractId,
    time_lock: &TimeLock,
    current: u64,
) -> Result<(), HtlcError> {
    if time_lock.is_expired(current) {
        return Err(HtlcError::ClaimAfterExpiry {
            id,
            current,
            expiry: time_lock.expiry(),
        });
    }
    Ok(())
}

/// Invariant: refunds land at or after expiry.
pub fn invariant_refund_window(
    id: ContractId,
    time_lock: &TimeLock,
    current: u64,
) -> Result<(), HtlcError> {
    if !time_lock.is_expired(current) {
        return Err(HtlcError::PrematureRefund {
            id,
            current,
            expiry: time_lock.expiry(),
        });
    }
    Ok(())
}

/// Invariant: only the sender authorizes a refund.
pub fn invariant_authorized_refunder(
    id: ContractId,
    sender: &Address,
    authorizer: &Address,
) -> Result<(), HtlcError> {
    if sender != authorizer {
        return Err(HtlcError::UnauthorizedRefund { id });
    }
    Ok(())
}

/// Whether the claimant is the designated receiver.
///
/// A mismatch does not invalidate the claim (possession of the preimage is
/// what the hash lock checks) but it is flagged for audit.
pub fn invariant_authorized_claimer(receiver: &Address, claimant: &Address) -> bool {
    receiver == claimant
}

/// Whether a transaction is buried deep enough.
pub fn invariant_sufficient_confirmations(confirmations: u64, required: u64) -> bool {
    confirmations >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: ContractId = ContractId([7u8; 32]);

    #[test]
    fn test_positive_amount() {
        assert!(invariant_positive_amount(1).is_ok());
        assert!(matches!(
            invariant_positive_amount(0),
            Err(HtlcError::InvalidAmount)
        ));
    }

    #[test]
    fn test_funding_matches() {
        let hash = [0xAB; 32];
        assert!(invariant_funding_matches(ID, 100, &hash, 100, Some(&hash)).is_ok());
    }

    #[test]
    fn test_funding_amount_mismatch() {
        let hash = [0xAB; 32];
        let err = invariant_funding_matches(ID, 100, &hash, 99, Some(&hash)).unwrap_err();
        assert!(matches!(
            err,
            HtlcError::FundingMismatch {
                hash_matches: true,
                observed_amount: 99,
                ..
            }
        ));
    }

    #[test]
    fn test_funding_hash_mismatch() {
        let err =
            invariant_funding_matches(ID, 100, &[0xAB; 32], 100, Some(&[0xCD; 32])).unwrap_err();
        assert!(matches!(
            err,
            HtlcError::FundingMismatch {
                hash_matches: false,
                ..
            }
        ));
        assert!(invariant_funding_matches(ID, 100, &[0xAB; 32], 100, None).is_err());
    }

    #[test]
    fn test_claim_window() {
        let lock = TimeLock::at_height(1000).unwrap();
        assert!(invariant_claim_window(ID, &lock, 999).is_ok());
        assert!(matches!(
            invariant_claim_window(ID, &lock, 1000),
            Err(HtlcError::ClaimAfterExpiry { .. })
        ));
    }

    #[test]
    fn test_refund_window() {
        let lock = TimeLock::at_height(1000).unwrap();
        assert!(matches!(
            invariant_refund_window(ID, &lock, 999),
            Err(HtlcError::PrematureRefund {
                current: 999,
                expiry: 1000,
                ..
            })
        ));
        assert!(invariant_refund_window(ID, &lock, 1000).is_ok());
    }

    #[test]
    fn test_authorized_refunder() {
        assert!(invariant_authorized_refunder(ID, &[1u8; 20], &[1u8; 20]).is_ok());
        assert!(invariant_authorized_refunder(ID, &[1u8; 20], &[2u8; 20]).is_err());
    }

    #[test]
    fn test_sufficient_confirmations() {
        assert!(invariant_sufficient_confirmations(6, 6));
        assert!(invariant_sufficient_confirmations(12, 6));
        assert!(!invariant_sufficient_confirmations(3, 6));
    }
}
