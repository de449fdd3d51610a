//! Zero-knowledge proofs that a ciphertext's plaintext is 0 or 1, and the
//! aggregation proof that a parent's published sum equals its children's
//! contributions.
//!
//! The zero/one proof is a Chaum-Pedersen OR-composition (Cramer/Damgård/
//! Schoenmakers): prove `(G, K)` and `(X, C - b*G)` share a discrete log for
//! `b = 0` or `b = 1`, without revealing which `b` is true. This is what
//! forbids a node from stuffing its CBF with out-of-range integers that
//! would poison the homomorphic sum (`spec.md` §4.4, I1).

use crate::cipher::{CipherText, CipherVector};
use crate::group::{base_point, hash_to_scalar, point_to_bytes, Point, Scalar};
use cothority_core::{CothorityError, Result};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// One branch of the OR-proof: `(a1, a2, e, z)` such that
/// `z*G = a1 + e*K` and `z*X = a2 + e*(C - b*G)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Branch {
    a1: Point,
    a2: Point,
    e: Scalar,
    z: Scalar,
}

/// Proof that a single ciphertext encrypts `0` or `1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CipherTextProof {
    branch0: Branch,
    branch1: Branch,
}

impl CipherTextProof {
    /// Build the proof for a ciphertext known (by the prover) to encrypt
    /// `plaintext_bit` under `(k, r, public_key)`.
    pub fn prove<R: RngCore + CryptoRng>(
        rng: &mut R,
        ciphertext: &CipherText,
        randomness: Scalar,
        plaintext_bit: u8,
        public_key: Point,
    ) -> Result<Self> {
        if plaintext_bit > 1 {
            return Err(CothorityError::invalid(
                "zero/one proof requires a plaintext bit in {0,1}",
            ));
        }

        // Simulate the false branch.
        let false_bit = 1 - plaintext_bit;
        let z_false = Scalar::random(rng);
        let e_false = Scalar::random(rng);
        let target_false = ciphertext.c - base_point() * Scalar::from(false_bit as u64);
        let a1_false = base_point() * z_false - ciphertext.k * e_false;
        let a2_false = public_key * z_false - target_false * e_false;

        // Commit for the true branch.
        let w = Scalar::random(rng);
        let a1_true = base_point() * w;
        let a2_true = public_key * w;

        let (a1_0, a2_0, a1_1, a2_1) = if plaintext_bit == 0 {
            (a1_true, a2_true, a1_false, a2_false)
        } else {
            (a1_false, a2_false, a1_true, a2_true)
        };

        let e = challenge(ciphertext, &a1_0, &a2_0, &a1_1, &a2_1);
        let e_true = e - e_false;
        let z_true = w + e_true * randomness;

        let (branch0, branch1) = if plaintext_bit == 0 {
            (
                Branch { a1: a1_0, a2: a2_0, e: e_true, z: z_true },
                Branch { a1: a1_1, a2: a2_1, e: e_false, z: z_false },
            )
        } else {
            (
                Branch { a1: a1_0, a2: a2_0, e: e_false, z: z_false },
                Branch { a1: a1_1, a2: a2_1, e: e_true, z: z_true },
            )
        };

        Ok(Self { branch0, branch1 })
    }

    /// Verify the proof against `ciphertext` and `public_key`. Exactly one
    /// branch must be internally consistent and `e0 + e1` must equal the
    /// Fiat-Shamir challenge for verification to succeed.
    pub fn verify(&self, ciphertext: &CipherText, public_key: Point) -> bool {
        let e = challenge(
            ciphertext,
            &self.branch0.a1,
            &self.branch0.a2,
            &self.branch1.a1,
            &self.branch1.a2,
        );
        if self.branch0.e + self.branch1.e != e {
            return false;
        }
        let target0 = ciphertext.c;
        let target1 = ciphertext.c - base_point();
        let ok0 = base_point() * self.branch0.z == self.branch0.a1 + ciphertext.k * self.branch0.e
            && public_key * self.branch0.z == self.branch0.a2 + target0 * self.branch0.e;
        let ok1 = base_point() * self.branch1.z == self.branch1.a1 + ciphertext.k * self.branch1.e
            && public_key * self.branch1.z == self.branch1.a2 + target1 * self.branch1.e;
        ok0 && ok1
    }
}

fn challenge(ct: &CipherText, a1_0: &Point, a2_0: &Point, a1_1: &Point, a2_1: &Point) -> Scalar {
    let mut bytes = Vec::with_capacity(32 * 6);
    for p in [&ct.k, &ct.c, a1_0, a2_0, a1_1, a2_1] {
        bytes.extend_from_slice(&point_to_bytes(p));
    }
    hash_to_scalar(&bytes)
}

/// One [`CipherTextProof`] per bucket of a [`CipherVector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherVectorProof(pub Vec<CipherTextProof>);

impl CipherVectorProof {
    pub fn verify(&self, vector: &CipherVector, public_key: Point) -> bool {
        if self.0.len() != vector.len() {
            return false;
        }
        self.0
            .iter()
            .zip(vector.0.iter())
            .all(|(proof, ct)| proof.verify(ct, public_key))
    }
}

/// Verify that `aggregation` equals the component-wise sum of
/// `contributions` (`spec.md` §4.5 "Aggregation proof", P5).
pub fn verify_aggregation(contributions: &[CipherVector], aggregation: &CipherVector) -> bool {
    let Some((first, rest)) = contributions.split_first() else {
        return aggregation.0.iter().all(|ct| {
            ct.k == Point::default() && ct.c == Point::default()
        });
    };
    let mut sum = first.clone();
    for next in rest {
        match sum.checked_add(next) {
            Ok(s) => sum = s,
            Err(_) => return false,
        }
    }
    sum == *aggregation
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn proof_for_valid_bit_verifies_p4() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        for bit in [0u8, 1u8] {
            let (ct, r) = CipherText::encrypt_int(&mut OsRng, bit, public);
            let proof = CipherTextProof::prove(&mut OsRng, &ct, r, bit, public).unwrap();
            assert!(proof.verify(&ct, public));
        }
    }

    #[test]
    fn proof_construction_rejects_out_of_range_plaintext_p4() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (ct, r) = CipherText::encrypt_int(&mut OsRng, 2, public);
        assert!(CipherTextProof::prove(&mut OsRng, &ct, r, 2, public).is_err());
    }

    #[test]
    fn proof_for_value_two_never_verifies_p4() {
        // A proof honestly produced for bit=1 must not verify against a
        // ciphertext that actually encrypts 2.
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (ct_two, _) = CipherText::encrypt_int(&mut OsRng, 2, public);
        let (ct_one, r_one) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let proof = CipherTextProof::prove(&mut OsRng, &ct_one, r_one, 1, public).unwrap();
        assert!(!proof.verify(&ct_two, public));
    }

    #[test]
    fn aggregation_proof_matches_sum_p5() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (a, _) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let (b, _) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let va = CipherVector(vec![a]);
        let vb = CipherVector(vec![b]);
        let sum = va.checked_add(&vb).unwrap();
        assert!(verify_aggregation(&[va, vb], &sum));
    }

    #[test]
    fn aggregation_proof_rejects_wrong_sum_p5() {
        let secret = Scalar::random(&mut OsRng);
        let public = base_point() * secret;
        let (a, _) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let (b, _) = CipherText::encrypt_int(&mut OsRng, 1, public);
        let (wrong, _) = CipherText::encrypt_int(&mut OsRng, 5, public);
        let va = CipherVector(vec![a]);
        let vb = CipherVector(vec![b]);
        assert!(!verify_aggregation(&[va, vb], &CipherVector(vec![wrong])));
    }
}
