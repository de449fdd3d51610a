//! Schnorr signatures over the shared group.
//!
//! Used to bind every `CipherVector`/hash-vote crossing the tree overlay to
//! its producer (`spec.md` §4.4 "Signature binding", I3). Long-term node
//! keys are otherwise out of scope (`spec.md` §1: "tree-overlay messaging
//! substrate ... with server identities and long-term keypairs"); this
//! module is the minimal concrete realization of that keypair/signer the
//! rest of the pipeline needs to compile and be tested against.

use crate::group::{base_point, hash_to_scalar, point_from_bytes, point_to_bytes, Point, Scalar};
use cothority_core::{CothorityError, Result};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct SigningKey {
    secret: Scalar,
    pub public: Point,
}

impl SigningKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = Scalar::random(rng);
        Self {
            secret,
            public: base_point() * secret,
        }
    }

    /// Rebuild a keypair from a previously persisted secret scalar
    /// (`spec.md` §6: long-term node keys survive a process restart).
    pub fn from_secret(secret: Scalar) -> Self {
        Self {
            secret,
            public: base_point() * secret,
        }
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.public)
    }

    /// Sign `hash(message)` with a standard Schnorr signature `(R, s)`
    /// where `s = k + e*secret`, `e = H(R || public || message)`.
    pub fn sign<R: RngCore + CryptoRng>(&self, rng: &mut R, message: &[u8]) -> Signature {
        let k = Scalar::random(rng);
        let r_point = base_point() * k;
        let e = challenge(&r_point, &self.public, message);
        let s = k + e * self.secret;
        Signature { r: r_point, s }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey(#[serde(with = "point_serde")] pub Point);

impl VerifyingKey {
    pub fn verify(&self, message: &[u8], sig: &Signature) -> Result<()> {
        let e = challenge(&sig.r, &self.0, message);
        let lhs = base_point() * sig.s;
        let rhs = sig.r + self.0 * e;
        if lhs == rhs {
            Ok(())
        } else {
            Err(CothorityError::crypto("schnorr signature verification failed"))
        }
    }
}

fn challenge(r: &Point, public: &Point, message: &[u8]) -> Scalar {
    let mut bytes = Vec::with_capacity(32 + 32 + message.len());
    bytes.extend_from_slice(&point_to_bytes(r));
    bytes.extend_from_slice(&point_to_bytes(public));
    bytes.extend_from_slice(message);
    hash_to_scalar(&bytes)
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "point_serde")]
    pub r: Point,
    #[serde(with = "scalar_serde")]
    pub s: Scalar,
}

mod point_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(p: &Point, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_bytes(&point_to_bytes(p))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Point, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(d)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32-byte point"))?;
        point_from_bytes(&arr).ok_or_else(|| serde::de::Error::custom("invalid curve point"))
    }
}

mod scalar_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sc: &Scalar, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_bytes(sc.as_bytes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Scalar, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(d)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32-byte scalar"))?;
        Option::from(Scalar::from_canonical_bytes(arr))
            .ok_or_else(|| serde::de::Error::custom("non-canonical scalar"))
    }
}
