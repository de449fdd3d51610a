//! Pure synchronous hashing used for content addressing and commitments.
//!
//! A single source of truth for the hash algorithm: callers reach for
//! [`hasher`]/[`hash`] rather than importing `sha2` directly, so the
//! algorithm can be swapped in one place.

#![allow(clippy::disallowed_types, clippy::disallowed_methods)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental hasher over the canonical algorithm.
pub struct Hasher(Sha256);

impl Hasher {
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(bytes);
        self
    }

    pub fn finalize(self) -> Hash32 {
        let digest = self.0.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Hash32(out)
    }
}

pub fn hasher() -> Hasher {
    Hasher(Sha256::new())
}

pub fn hash(bytes: &[u8]) -> Hash32 {
    let mut h = hasher();
    h.update(bytes);
    h.finalize()
}

/// Domain-separated hash: prefixes `bytes` with a fixed tag before hashing,
/// so the same bytes hashed for two different purposes never collide.
pub fn domain_hash(domain: &'static str, bytes: &[u8]) -> Hash32 {
    let mut h = hasher();
    h.update(domain.as_bytes());
    h.update(bytes);
    h.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(b"hello"), hash(b"hello"));
    }

    #[test]
    fn domain_separation_changes_digest() {
        assert_ne!(domain_hash("A", b"x"), domain_hash("B", b"x"));
    }

    #[test]
    fn incremental_matches_oneshot() {
        let mut h = hasher();
        h.update(b"hel").update(b"lo");
        assert_eq!(h.finalize(), hash(b"hello"));
    }
}
