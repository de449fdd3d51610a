//! Counting Bloom filter over HTML leaf byte strings.
//!
//! Parameters and hashing resolve Open Question 1 of `spec.md` §9: `u8`
//! buckets, double-hashing over SHA-256 and BLAKE2b-256 ("the version wired
//! into the encrypted pipeline").

use blake2::{Blake2b512, Digest as Blake2Digest};
use cothority_core::CothorityError;
use sha2::{Digest as Sha2Digest, Sha256};

/// Target false-positive rate for HTML consensus (`spec.md` §4.3).
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Derive `(m, k)` from the number of distinct leaves `n`, for a target
/// false-positive rate `p`. `m = ceil(-n*ln(p) / ln(2)^2)`,
/// `k = ceil((m/n) * ln(2))`.
pub fn derive_parameters(distinct_leaves: usize, false_positive_rate: f64) -> (u64, u64) {
    if distinct_leaves == 0 {
        // A single bucket avoids a degenerate zero-sized filter; k is
        // irrelevant since no leaf will ever be inserted.
        return (1, 1);
    }
    let n = distinct_leaves as f64;
    let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
    let m = (-n * false_positive_rate.ln() / ln2_sq).ceil().max(1.0) as u64;
    let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil().max(1.0) as u64;
    (m, k)
}

/// Counting Bloom filter with `u8` saturating buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountingBloomFilter {
    buckets: Vec<u8>,
    k: u64,
}

impl CountingBloomFilter {
    pub fn new(m: u64, k: u64) -> Self {
        Self {
            buckets: vec![0u8; m as usize],
            k,
        }
    }

    pub fn m(&self) -> u64 {
        self.buckets.len() as u64
    }

    pub fn k(&self) -> u64 {
        self.k
    }

    pub fn buckets(&self) -> &[u8] {
        &self.buckets
    }

    /// `H1`/`H2` over the leaf's canonical byte string, reduced mod `m`.
    fn hash_pair(&self, canonical_bytes: &[u8]) -> (u64, u64) {
        let mut sha = Sha256::new();
        sha.update(canonical_bytes);
        let h1_digest = sha.finalize();
        let h1 = u64::from_le_bytes(h1_digest[0..8].try_into().unwrap());

        let mut blake = Blake2b512::new();
        blake.update(canonical_bytes);
        let h2_digest = blake.finalize();
        let h2 = u64::from_le_bytes(h2_digest[0..8].try_into().unwrap());

        (h1, h2)
    }

    fn bucket_indices(&self, canonical_bytes: &[u8]) -> Vec<usize> {
        let (h1, h2) = self.hash_pair(canonical_bytes);
        let m = self.m();
        (0..self.k)
            .map(|i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
            .collect()
    }

    /// Increment the `k` buckets for `canonical_bytes`, saturating at 255.
    pub fn insert(&mut self, canonical_bytes: &[u8]) {
        for idx in self.bucket_indices(canonical_bytes) {
            self.buckets[idx] = self.buckets[idx].saturating_add(1);
        }
    }

    /// `min` over the `k` buckets for `canonical_bytes` — the standard
    /// counting-Bloom-filter membership estimate.
    pub fn count(&self, canonical_bytes: &[u8]) -> u8 {
        self.bucket_indices(canonical_bytes)
            .into_iter()
            .map(|idx| self.buckets[idx])
            .min()
            .unwrap_or(0)
    }

    /// Build a filter over a document's distinct leaf byte strings.
    /// Duplicates within the same document are inserted only once, so
    /// "seen by node i" is a set predicate (`spec.md` §4.3 "Domain").
    pub fn build<'a>(leaves: impl IntoIterator<Item = &'a [u8]>, false_positive_rate: f64) -> Self {
        let mut distinct: Vec<&[u8]> = Vec::new();
        for leaf in leaves {
            if !distinct.contains(&leaf) {
                distinct.push(leaf);
            }
        }
        let (m, k) = derive_parameters(distinct.len(), false_positive_rate);
        let mut cbf = Self::new(m, k);
        for leaf in distinct {
            cbf.insert(leaf);
        }
        cbf
    }

    /// Reconstruct a filter directly from recovered bucket counts (used by
    /// the reconstruction stage after threshold decryption).
    pub fn from_buckets(buckets: Vec<u8>, k: u64) -> Self {
        Self { buckets, k }
    }

    pub fn checked_same_shape(&self, other: &Self) -> Result<(), CothorityError> {
        if self.m() != other.m() || self.k != other.k {
            return Err(CothorityError::invalid(
                "counting bloom filter parameter mismatch",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_scale_with_leaf_count() {
        let (m_small, _) = derive_parameters(10, DEFAULT_FALSE_POSITIVE_RATE);
        let (m_large, _) = derive_parameters(1000, DEFAULT_FALSE_POSITIVE_RATE);
        assert!(m_large > m_small);
    }

    #[test]
    fn inserted_leaf_has_nonzero_count() {
        let mut cbf = CountingBloomFilter::new(64, 4);
        cbf.insert(b"hello");
        assert!(cbf.count(b"hello") >= 1);
    }

    #[test]
    fn duplicate_leaves_in_one_document_insert_once() {
        let leaves: Vec<&[u8]> = vec![b"a", b"a", b"b"];
        let cbf = CountingBloomFilter::build(leaves, DEFAULT_FALSE_POSITIVE_RATE);
        assert_eq!(cbf.count(b"a"), 1);
        assert_eq!(cbf.count(b"b"), 1);
    }

    #[test]
    fn three_identical_documents_sum_to_three_p1() {
        let leaves: Vec<&[u8]> = vec![b"hello"];
        let per_node: Vec<CountingBloomFilter> = (0..3)
            .map(|_| CountingBloomFilter::build(leaves.clone(), DEFAULT_FALSE_POSITIVE_RATE))
            .collect();
        let total: u32 = per_node.iter().map(|cbf| cbf.count(b"hello") as u32).sum();
        assert_eq!(total, 3);
    }
}
