//! ElGamal ciphertexts and cipher vectors over the shared DKG key.
//!
//! Grounded on the `ElGamalCiphertext<C: CurveGroup>` shape from the
//! example pack's shuffle-based ciphertext module, specialized here to the
//! single Ristretto255 group the cothority uses throughout.

use crate::group::{base_point, point_from_bytes, point_to_bytes, Point, Scalar};
use cothority_core::{CothorityError, Result};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// `(K, C) = (r*G, r*X + M)` — one ElGamal ciphertext under the shared key `X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherText {
    pub k: Point,
    pub c: Point,
}

impl CipherText {
    /// Encrypt the plaintext point `message = x*G` under `public_key`.
    pub fn encrypt<R: RngCore + CryptoRng>(
        rng: &mut R,
        message: Point,
        public_key: Point,
    ) -> (Self, Scalar) {
        let r = Scalar::random(rng);
        let k = base_point() * r;
        let c = public_key * r + message;
        (Self { k, c }, r)
    }

    /// Encrypt a small non-negative integer plaintext (the usual CBF bucket
    /// value domain, `x in 0..=C_MAX`).
    pub fn encrypt_int<R: RngCore + CryptoRng>(
        rng: &mut R,
        value: u8,
        public_key: Point,
    ) -> (Self, Scalar) {
        Self::encrypt(rng, base_point() * Scalar::from(value as u64), public_key)
    }

    /// Additive ciphertext combination: `(K1+K2, C1+C2)` encrypts `x1+x2`
    /// (`spec.md` §4.4 "Homomorphic add").
    pub fn add(&self, other: &Self) -> Self {
        Self {
            k: self.k + other.k,
            c: self.c + other.c,
        }
    }

    /// Recover the plaintext point `M = C - v*K` given the full (or, after
    /// threshold recombination, reconstructed) private key `v`.
    pub fn decrypt_to_point(&self, private_key: Scalar) -> Point {
        self.c - self.k * private_key
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&point_to_bytes(&self.k));
        out[32..].copy_from_slice(&point_to_bytes(&self.c));
        out
    }

    pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self> {
        let mut k_bytes = [0u8; 32];
        let mut c_bytes = [0u8; 32];
        k_bytes.copy_from_slice(&bytes[..32]);
        c_bytes.copy_from_slice(&bytes[32..]);
        let k = point_from_bytes(&k_bytes)
            .ok_or_else(|| CothorityError::crypto("invalid K point encoding"))?;
        let c = point_from_bytes(&c_bytes)
            .ok_or_else(|| CothorityError::crypto("invalid C point encoding"))?;
        Ok(Self { k, c })
    }
}

/// Ordered, fixed-length sequence of ciphertexts — one per CBF bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherVector(pub Vec<CipherText>);

impl CipherVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Element-wise addition; `spec.md` I2 requires every non-leaf node's
    /// aggregate to equal this sum of its local filter and its verified
    /// children's aggregates. Fails if lengths mismatch (`spec.md` §4.5
    /// "Parameter mismatch").
    pub fn checked_add(&self, other: &CipherVector) -> Result<CipherVector> {
        if self.len() != other.len() {
            return Err(CothorityError::invalid(format!(
                "cipher vector length mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        Ok(CipherVector(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a.add(b))
                .collect(),
        ))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * 64);
        for ct in &self.0 {
            out.extend_from_slice(&ct.to_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 64 != 0 {
            return Err(CothorityError::invalid(
                "cipher vector byte length is not a multiple of 64",
            ));
        }
        let entries = bytes
            .chunks_exact(64)
            .map(|chunk| {
                let arr: [u8; 64] = chunk.try_into().expect("chunks_exact(64) yields 64 bytes");
                CipherText::from_bytes(&arr)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn discrete_log_small(point: Point, max: u64) -> Option<u64> {
        let mut acc = Point::default();
        for x in 0..=max {
            if acc == point {
                return Some(x);
            }
            acc += base_point();
        }
        None
    }

    #[test]
    fn encrypt_decrypt_round_trip_p2() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        for x in 0u8..=8 {
            let (ct, _) = CipherText::encrypt_int(&mut OsRng, x, public);
            let point = ct.decrypt_to_point(secret);
            assert_eq!(discrete_log_small(point, 16).unwrap(), x as u64);
        }
    }

    #[test]
    fn additive_homomorphism_p3() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (ct_a, _) = CipherText::encrypt_int(&mut OsRng, 3, public);
        let (ct_b, _) = CipherText::encrypt_int(&mut OsRng, 4, public);
        let sum = ct_a.add(&ct_b);
        let point = sum.decrypt_to_point(secret);
        assert_eq!(discrete_log_small(point, 16).unwrap(), 7);
    }

    #[test]
    fn cipher_vector_length_mismatch_is_rejected() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (ct, _) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let short = CipherVector(vec![ct]);
        let long = CipherVector(vec![ct, ct]);
        assert!(short.checked_add(&long).is_err());
    }

    #[test]
    fn cipher_vector_bytes_round_trip() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (ct1, _) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let (ct2, _) = CipherText::encrypt_int(&mut OsRng, 2, public);
        let vector = CipherVector(vec![ct1, ct2]);
        let bytes = vector.to_bytes();
        assert_eq!(CipherVector::from_bytes(&bytes).unwrap(), vector);
    }
}
