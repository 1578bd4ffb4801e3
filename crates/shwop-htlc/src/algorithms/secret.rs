//! # Secret Generation and Verification
//!
//! Cryptographic primitives behind the hash lock: SHA-256 digests and
//! constant-time digest comparison.

use crate::domain::Hash;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Fill `len` bytes from the thread-local CSPRNG.
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// SHA-256 of `data`.
pub fn digest(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compare two digests without an early exit.
pub fn digests_equal(a: &Hash, b: &Hash) -> bool {
    a.ct_eq(b).into()
}

/// Check that `preimage` hashes to `hash`, in constant time.
pub fn verify_secret(preimage: &[u8], hash: &Hash) -> bool {
    digests_equal(&digest(preimage), hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_bytes() {
        let a = generate_random_bytes(32);
        let b = generate_random_bytes(32);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_deterministic() {
        assert_eq!(digest(b"secret"), digest(b"secret"));
        assert_ne!(digest(b"secret"), digest(b"secreT"));
    }

    #[test]
    fn test_digest_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_secret() {
        let preimage = generate_random_bytes(32);
        let hash = digest(&preimage);
        assert!(verify_secret(&preimage, &hash));
        assert!(!verify_secret(b"other", &hash));
    }
}
