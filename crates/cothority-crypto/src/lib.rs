//! # cothority-crypto
//!
//! The homomorphic-encryption core of the structured-consensus pipeline:
//! the shared group (`group`), ElGamal ciphertexts and cipher vectors
//! (`cipher`), zero/one DLEQ proofs and aggregation-proof verification
//! (`proof`), the counting Bloom filter leaves are inserted into (`cbf`),
//! the shared discrete-log lookup service (`dlog`), and the Schnorr
//! signature binding used to authenticate every vector crossing the tree
//! overlay (`schnorr`).

#![forbid(unsafe_code)]

pub mod cbf;
pub mod cipher;
pub mod dlog;
pub mod group;
pub mod proof;
pub mod schnorr;

pub use cbf::{CountingBloomFilter, DEFAULT_FALSE_POSITIVE_RATE};
pub use cipher::{CipherText, CipherVector};
pub use dlog::DiscreteLogTable;
pub use group::{base_point, hash_to_scalar, Point, Scalar};
pub use proof::{verify_aggregation, CipherTextProof, CipherVectorProof};
pub use schnorr::{Signature, SigningKey, VerifyingKey};
