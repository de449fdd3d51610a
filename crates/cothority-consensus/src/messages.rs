//! Wire messages and per-node proof artifacts for Structured Consensus,
//! Unstructured Consensus, and Threshold Decrypt (`spec.md` §6).

use cothority_core::{ErrorList, NodeIndex, PublicKeyHex};
use cothority_crypto::{CipherVector, CipherVectorProof, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proof that one node's published aggregate equals the sum of its own
/// local filter and its verified children's aggregates (`spec.md` §3
/// "AggregationProof", P5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationProof {
    /// One raw cipher-vector encoding per contributor, keyed by its
    /// canonical public-key hex: the node's own filter plus every verified
    /// child's published aggregate.
    pub contributions: BTreeMap<PublicKeyHex, Vec<u8>>,
    pub aggregation: Vec<u8>,
    pub length: u64,
}

/// One node's contribution to the structured-consensus run (`spec.md` §3
/// "CompleteProof"), keyed into [`CompleteProofs`] by its public key so the
/// map never needs a custom comparator (`spec.md` §9 "Design Notes").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteProof {
    pub node_id: NodeIndex,
    pub public_key: PublicKeyHex,
    pub aggregation_proof: AggregationProof,
    pub cipher_vector_proof: CipherVectorProof,
    pub encrypted_filter: Vec<u8>,
    pub encrypted_set_signature: Vec<u8>,
}

/// `spec.md` §3 "CompleteProofs": every qualified node's [`CompleteProof`],
/// merged up the tree and broadcast by the root on finalization.
pub type CompleteProofs = BTreeMap<PublicKeyHex, CompleteProof>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StructuredMessage {
    /// Root-to-children, DOWN phase: the url and the filter parameters
    /// derived from the root's own leaf count (`spec.md` §4.5).
    Announce { url: String, m: u64, k: u64 },
    /// Child-to-parent, UP phase.
    Reply {
        url: String,
        encrypted_filter: Vec<u8>,
        encrypted_filter_signature: Vec<u8>,
        complete_proofs: CompleteProofs,
        errors: ErrorList,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnstructuredPhase {
    Consensus,
    RequestMissingData,
    End,
}

/// `hash -> (signer, signature over base64(hash))` ballot box for one
/// sub-resource (`spec.md` §4.6 "Vote").
pub type HashVotes = BTreeMap<String, Vec<(PublicKeyHex, Vec<u8>)>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UnstructuredMessage {
    Announce {
        url: String,
        phase: UnstructuredPhase,
        master_hash: BTreeMap<String, String>,
    },
    Reply {
        phase: UnstructuredPhase,
        url: String,
        master_hash: HashVotes,
        requested_data: BTreeMap<String, Vec<u8>>,
        errors: ErrorList,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DecryptMessage {
    /// Root-to-all: the aggregated, qualified cipher vector to decrypt.
    PromptDecrypt { cipher_vector: CipherVector },
    /// Node-to-root: one partial-decryption point per ciphertext bucket.
    SendPartial { partials: Vec<Point> },
}
