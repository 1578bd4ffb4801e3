//! # Hash Lock
//!
//! The hash commitment and the preimage that opens it.
//!
//! ## Security
//!
//! [`Preimage`] zeroizes its bytes on drop and never prints them through
//! `Debug`. Digest comparison is constant-time.

use super::errors::{Hash, HtlcError};
use super::value_objects::{hex_array, parse_hex_array};
use crate::algorithms::secret::{digest, generate_random_bytes, verify_secret};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Upper bound on preimage length in bytes.
pub const MAX_PREIMAGE_LEN: usize = 64;

/// Preimage length used when the caller does not pick one.
pub const DEFAULT_PREIMAGE_LEN: usize = 32;

/// A variable-length secret that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Preimage {
    inner: Vec<u8>,
}

impl Preimage {
    /// Wrap secret bytes, enforcing `1..=MAX_PREIMAGE_LEN`.
    pub fn new(bytes: Vec<u8>) -> Result<Self, HtlcError> {
        if bytes.is_empty() || bytes.len() > MAX_PREIMAGE_LEN {
            return Err(HtlcError::InvalidLength {
                len: bytes.len(),
                max: MAX_PREIMAGE_LEN,
            });
        }
        Ok(Self { inner: bytes })
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, HtlcError> {
        let bytes = hex::decode(s.trim().trim_start_matches("0x"))
            .map_err(|e| HtlcError::MalformedPreimage(e.to_string()))?;
        Self::new(bytes)
    }

    /// Get the secret bytes (use carefully!).
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Hex encoding, for intentional reveal only.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.inner)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always false; empty preimages cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// SHA-256 of the secret.
    pub fn digest(&self) -> Hash {
        digest(&self.inner)
    }
}

impl PartialEq for Preimage {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_slice().ct_eq(other.inner.as_slice()).into()
    }
}

impl Eq for Preimage {}

impl std::fmt::Debug for Preimage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the actual secret
        write!(f, "Preimage({} bytes, ***)", self.inner.len())
    }
}

impl Serialize for Preimage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(&self.inner))
    }
}

impl<'de> Deserialize<'de> for Preimage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash commitment with the preimage attached once revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashLock {
    #[serde(with = "hex_array")]
    hash: Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preimage: Option<Preimage>,
}

impl HashLock {
    /// Generate a fresh preimage of `secret_len` bytes and its lock.
    ///
    /// The returned lock is verifier-only; the caller keeps the preimage
    /// confidential until it is intentionally revealed.
    pub fn create(secret_len: usize) -> Result<(Self, Preimage), HtlcError> {
        if secret_len == 0 || secret_len > MAX_PREIMAGE_LEN {
            return Err(HtlcError::InvalidLength {
                len: secret_len,
                max: MAX_PREIMAGE_LEN,
            });
        }
        let preimage = Preimage::new(generate_random_bytes(secret_len))?;
        Ok((Self::from_hash(preimage.digest()), preimage))
    }

    /// Verifier-only lock for a party that only knows the hash.
    pub fn from_hash(hash: Hash) -> Self {
        Self {
            hash,
            preimage: None,
        }
    }

    /// Parse a verifier-only lock from a hex digest.
    pub fn from_hex(s: &str) -> Result<Self, HtlcError> {
        parse_hex_array(s)
            .map(Self::from_hash)
            .ok_or_else(|| HtlcError::MalformedHash(s.to_string()))
    }

    /// True iff `digest(preimage) == hash`, compared in constant time.
    pub fn verify(hash: &Hash, preimage: &Preimage) -> bool {
        verify_secret(preimage.as_bytes(), hash)
    }

    /// Committed digest.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Revealed preimage, if any.
    pub fn preimage(&self) -> Option<&Preimage> {
        self.preimage.as_ref()
    }

    /// Whether the preimage has been attached.
    pub fn is_revealed(&self) -> bool {
        self.preimage.is_some()
    }

    /// Attach the revealed preimage. Happens at most once; repeating the
    /// same reveal is a no-op.
    pub fn reveal(&mut self, preimage: Preimage) -> Result<(), HtlcError> {
        if !Self::verify(&self.hash, &preimage) {
            return Err(HtlcError::InvalidPreimage);
        }
        if self.preimage.is_none() {
            self.preimage = Some(preimage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify() {
        let (lock, preimage) = HashLock::create(32).unwrap();
        assert!(HashLock::verify(lock.hash(), &preimage));
        assert!(!lock.is_revealed());
    }

    #[test]
    fn test_create_rejects_bad_lengths() {
        assert!(matches!(
            HashLock::create(0),
            Err(HtlcError::InvalidLength { len: 0, .. })
        ));
        assert!(matches!(
            HashLock::create(MAX_PREIMAGE_LEN + 1),
            Err(HtlcError::InvalidLength { .. })
        ));
        assert!(HashLock::create(MAX_PREIMAGE_LEN).is_ok());
        assert!(HashLock::create(1).is_ok());
    }

    #[test]
    fn test_from_hex() {
        let lock = HashLock::from_hex(&"ab".repeat(32)).unwrap();
        assert_eq!(lock.hash(), &[0xABu8; 32]);
        assert!(matches!(
            HashLock::from_hex("abcd"),
            Err(HtlcError::MalformedHash(_))
        ));
        assert!(HashLock::from_hex("zz").is_err());
    }

    #[test]
    fn test_reveal_once() {
        let (mut lock, preimage) = HashLock::create(32).unwrap();
        lock.reveal(preimage.clone()).unwrap();
        assert_eq!(lock.preimage(), Some(&preimage));
        // Same reveal again is harmless
        lock.reveal(preimage.clone()).unwrap();
        assert_eq!(lock.preimage(), Some(&preimage));
    }

    #[test]
    fn test_reveal_wrong_preimage_fails() {
        let (mut lock, _) = HashLock::create(32).unwrap();
        let wrong = Preimage::new(vec![0x01; 32]).unwrap();
        assert!(matches!(lock.reveal(wrong), Err(HtlcError::InvalidPreimage)));
        assert!(!lock.is_revealed());
    }

    #[test]
    fn test_preimage_debug_hides_value() {
        let preimage = Preimage::new(vec![0xAB; 32]).unwrap();
        let debug_str = format!("{:?}", preimage);
        assert!(!debug_str.to_lowercase().contains("ab"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn test_preimage_from_hex() {
        let preimage = Preimage::from_hex("0x0102").unwrap();
        assert_eq!(preimage.as_bytes(), &[1, 2]);
        assert!(Preimage::from_hex("").is_err());
        assert!(matches!(
            Preimage::from_hex("xyz"),
            Err(HtlcError::MalformedPreimage(_))
        ));
    }

    #[test]
    fn test_hash_lock_serde_omits_unrevealed_preimage() {
        let lock = HashLock::from_hash([0x11; 32]);
        let json = serde_json::to_value(&lock).unwrap();
        assert!(json.get("preimage").is_none());
        let back: HashLock = serde_json::from_value(json).unwrap();
        assert_eq!(back, lock);
    }
}
