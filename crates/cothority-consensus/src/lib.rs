//! # cothority-consensus
//!
//! Structured and Unstructured Consensus, Threshold Decrypt, and
//! Reconstruction — the four protocols that turn a fetched HTML page and
//! its sub-resources into one sealed, collectively-signed [`Webstore`]
//! record: wire messages (`messages`), Lagrange interpolation at zero
//! (`lagrange`), the counting-Bloom-filter agreement round (`structured`),
//! the hash-voting round for opaque sub-resources (`unstructured`),
//! threshold ElGamal recovery of the agreed bucket counts (`decrypt`), and
//! pruning/signing/sealing the final artifact (`reconstruction`).

#![forbid(unsafe_code)]

pub mod decrypt;
pub mod lagrange;
pub mod messages;
pub mod reconstruction;
pub mod structured;
pub mod unstructured;

pub use cothority_chain::Webstore;
pub use decrypt::{run_threshold_decrypt, DecryptConfig};
pub use lagrange::coefficients_at_zero;
pub use messages::{
    AggregationProof, CompleteProof, CompleteProofs, DecryptMessage, HashVotes, StructuredMessage,
    UnstructuredMessage, UnstructuredPhase,
};
pub use reconstruction::{append_to_chain, prune_document, seal_artifact, wire_timestamp};
pub use structured::{run_structured_consensus, StructuredConfig};
pub use unstructured::{run_unstructured_consensus, UnstructuredConfig};
