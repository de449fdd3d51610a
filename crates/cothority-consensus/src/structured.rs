//! Structured Consensus Protocol (`spec.md` §4.5): counting-Bloom-filter
//! agreement on a single HTML document's leaf content, aggregated
//! homomorphically up a [`TreeOverlay`].
//!
//! DOWN phase: the root fetches and parses the url, derives `(m, k)` from
//! its own distinct-leaf count, and announces it to the tree; every other
//! node re-fetches independently and builds its own filter against the
//! same parameters. UP phase: each node encrypts its filter bucket-wise
//! under the shared DKG key, signs the encoding, and sums its verified
//! children's published vectors into its own before replying, within a
//! bounded collection window, before the root finalizes by broadcasting
//! the accumulated [`CompleteProofs`] to every node.
//!
//! A run moves through seven phases, tracked explicitly by
//! [`StructuredRunState`]: `Init -> Announced -> ContributionBuilt ->
//! AwaitingChildren -> Aggregated -> ProofsBroadcast -> Done`. `Done` is
//! reached without `AwaitingChildren` on a leaf.

use crate::messages::{AggregationProof, CompleteProof, CompleteProofs, StructuredMessage};
use cothority_core::{CothorityError, ErrorList, NodeIndex, PublicKeyHex, Result, Roster};
use cothority_crypto::group::point_from_bytes;
use cothority_crypto::{
    CipherText, CipherTextProof, CipherVector, CipherVectorProof, CountingBloomFilter, Point,
    Signature, SigningKey, VerifyingKey, DEFAULT_FALSE_POSITIVE_RATE,
};
use cothority_html::{Fetcher, HtmlParser};
use cothority_transport::TreeOverlay;
use rand_core::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Everything one node needs to run Structured Consensus for one url.
pub struct StructuredConfig {
    pub roster: Roster,
    /// The DKG shared public key `X`, used to encrypt every CBF bucket.
    pub shared_public_key: Point,
    /// This node's own Schnorr keypair, used to bind its published filter
    /// to its identity (`spec.md` §4.4 "Signature binding", I3).
    pub signing_key: SigningKey,
    pub false_positive_rate: f64,
}

impl StructuredConfig {
    pub fn new(roster: Roster, shared_public_key: Point, signing_key: SigningKey) -> Self {
        Self {
            roster,
            shared_public_key,
            signing_key,
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
        }
    }

    fn verifying_key_of(&self, index: NodeIndex) -> Result<VerifyingKey> {
        let identity = self
            .roster
            .get(index)
            .ok_or_else(|| CothorityError::invalid(format!("unknown roster node {index}")))?;
        let bytes = hex::decode(identity.public_key.as_str())?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CothorityError::invalid("public key is not 32 bytes"))?;
        let point = point_from_bytes(&arr)
            .ok_or_else(|| CothorityError::invalid("public key is not a valid curve point"))?;
        Ok(VerifyingKey(point))
    }
}

/// The seven phases one Structured Consensus run passes through
/// (`spec.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StructuredPhase {
    Init,
    Announced,
    ContributionBuilt,
    AwaitingChildren,
    Aggregated,
    ProofsBroadcast,
    Done,
}

/// Explicit phase tracker for one run, checked after every mutation
/// (I1: phase never moves backwards; I2: never more children recorded
/// than the tree actually has).
struct StructuredRunState {
    phase: StructuredPhase,
    expected_children: usize,
    received_children: usize,
}

impl StructuredRunState {
    fn new(expected_children: usize) -> Self {
        Self {
            phase: StructuredPhase::Init,
            expected_children,
            received_children: 0,
        }
    }

    fn advance_to(&mut self, phase: StructuredPhase) {
        debug_assert!(
            phase >= self.phase,
            "structured consensus phase went backwards: {:?} -> {:?}",
            self.phase,
            phase
        );
        self.phase = phase;
        self.assert_invariants();
    }

    fn record_child(&mut self) {
        self.received_children += 1;
        self.assert_invariants();
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.received_children <= self.expected_children,
            "recorded {} child replies but only {} children exist",
            self.received_children,
            self.expected_children
        );
    }
}

/// Encrypt a filter's buckets under `public_key`, with a zero/one DLEQ
/// proof per bucket. Distinct leaves are deduplicated before insertion
/// (`spec.md` §4.3 "Domain"), so one node's own filter only ever carries a
/// membership bit per bucket; clamping here keeps every local ciphertext
/// inside the zero/one proof's domain, and the homomorphic sum across the
/// roster — not any single node's filter — recovers the `0..=N` occurrence
/// count (`spec.md` §4.4, I1).
fn encrypt_filter<R: RngCore + CryptoRng>(
    rng: &mut R,
    cbf: &CountingBloomFilter,
    public_key: Point,
) -> (CipherVector, CipherVectorProof) {
    let mut cts = Vec::with_capacity(cbf.buckets().len());
    let mut proofs = Vec::with_capacity(cbf.buckets().len());
    for &bucket in cbf.buckets() {
        let bit = bucket.min(1);
        let (ct, r) = CipherText::encrypt_int(rng, bit, public_key);
        let proof = CipherTextProof::prove(rng, &ct, r, bit, public_key)
            .expect("bit is in {0,1} by construction");
        cts.push(ct);
        proofs.push(proof);
    }
    (CipherVector(cts), CipherVectorProof(proofs))
}

/// Build this node's local filter over an independently fetched document.
/// A fetch or parse failure degrades to a zero-filled filter instead of
/// aborting the node's run (`spec.md` §7: "non-fatal; the node contributes
/// an all-zeros CBF but still signs"); the failure is returned alongside
/// so the caller can record it.
pub async fn build_local_filter(
    fetcher: &dyn Fetcher,
    parser: &dyn HtmlParser,
    url: &str,
    m: u64,
    k: u64,
) -> (CountingBloomFilter, Option<CothorityError>) {
    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => return (CountingBloomFilter::new(m, k), Some(e)),
    };
    let document = match parser.parse(&body.bytes) {
        Ok(document) => document,
        Err(e) => return (CountingBloomFilter::new(m, k), Some(e)),
    };
    let mut cbf = CountingBloomFilter::new(m, k);
    let mut distinct: Vec<Vec<u8>> = Vec::new();
    for leaf in document.leaves() {
        let bytes = leaf.canonical_bytes();
        if !distinct.contains(&bytes) {
            distinct.push(bytes);
        }
    }
    for bytes in &distinct {
        cbf.insert(bytes);
    }
    (cbf, None)
}

fn sign_bytes<R: RngCore + CryptoRng>(key: &SigningKey, rng: &mut R, bytes: &[u8]) -> Vec<u8> {
    let sig = key.sign(rng, bytes);
    bincode::serialize(&sig).expect("Signature serializes")
}

fn verify_bytes(key: &VerifyingKey, bytes: &[u8], signature: &[u8]) -> Result<()> {
    let sig: Signature = bincode::deserialize(signature)
        .map_err(|e| CothorityError::serialization(format!("bad signature encoding: {e}")))?;
    key.verify(bytes, &sig)
}

/// Run Structured Consensus to completion for this node. Returns the root's
/// finalized `(CipherVector, CompleteProofs)`; `None` on every other node
/// once it has replied to its parent.
#[allow(clippy::too_many_arguments)]
pub async fn run_structured_consensus<M, O, R>(
    overlay: &mut O,
    config: &StructuredConfig,
    url: &str,
    fetcher: &dyn Fetcher,
    parser: &dyn HtmlParser,
    collection_timeout: Duration,
    rng: &mut R,
    wrap: impl Fn(StructuredMessage) -> M + Send,
    unwrap: impl Fn(M) -> Option<StructuredMessage> + Send,
) -> Result<Option<(CipherVector, CompleteProofs)>>
where
    M: Clone + Send + Sync + 'static,
    O: TreeOverlay<M>,
    R: RngCore + CryptoRng,
{
    let self_index = overlay.index();
    let self_key = config
        .roster
        .get(self_index)
        .ok_or_else(|| CothorityError::invalid("self index missing from roster"))?
        .public_key
        .clone();

    let mut state = StructuredRunState::new(overlay.children().len());
    let mut errors = ErrorList::new();

    let (m, k) = if overlay.is_root() {
        let (m, k) = match fetcher.fetch(url).await {
            Ok(body) => match parser.parse(&body.bytes) {
                Ok(document) => {
                    let distinct = document.leaves().len();
                    cothority_crypto::cbf::derive_parameters(distinct, config.false_positive_rate)
                }
                Err(e) => {
                    warn!(error = %e, "root failed to parse its own document, falling back to a single-bucket filter");
                    errors.push(self_index, e);
                    (1, 1)
                }
            },
            Err(e) => {
                warn!(error = %e, "root failed to fetch its own document, falling back to a single-bucket filter");
                errors.push(self_index, e);
                (1, 1)
            }
        };
        for (to, result) in overlay
            .send_to_children(wrap(StructuredMessage::Announce {
                url: url.to_string(),
                m,
                k,
            }))
            .await
        {
            if let Err(e) = result {
                warn!(node = to.0, error = %e, "failed to announce to child");
            }
        }
        state.advance_to(StructuredPhase::Announced);
        (m, k)
    } else {
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed before Announce"))?;
        let (m, k) = match unwrap(env.payload) {
            Some(StructuredMessage::Announce { m, k, .. }) => (m, k),
            _ => return Err(CothorityError::invalid("expected Announce from parent")),
        };
        state.advance_to(StructuredPhase::Announced);
        (m, k)
    };

    let (cbf, fetch_error) = build_local_filter(fetcher, parser, url, m, k).await;
    if let Some(e) = fetch_error {
        warn!(error = %e, "failed to fetch or parse document, contributing an all-zeros filter");
        errors.push(self_index, e);
    }
    let (vector, proof) = encrypt_filter(rng, &cbf, config.shared_public_key);
    let vector_bytes = vector.to_bytes();
    let signature = sign_bytes(&config.signing_key, rng, &vector_bytes);
    state.advance_to(StructuredPhase::ContributionBuilt);

    let mut contributions = BTreeMap::new();
    contributions.insert(self_key.clone(), vector_bytes.clone());

    let mut aggregate = vector.clone();
    let mut proofs: CompleteProofs = BTreeMap::new();

    if !overlay.is_leaf() {
        state.advance_to(StructuredPhase::AwaitingChildren);
        let expected = overlay.children().len();
        let mut received = 0usize;
        while received < expected {
            match tokio::time::timeout(collection_timeout, overlay.recv()).await {
                Ok(Some(env)) => {
                    received += 1;
                    state.record_child();
                    let Some(StructuredMessage::Reply {
                        encrypted_filter,
                        encrypted_filter_signature,
                        complete_proofs,
                        errors: child_errors,
                        ..
                    }) = unwrap(env.payload)
                    else {
                        warn!(from = env.from.0, "ignored non-reply message during Structured Consensus");
                        continue;
                    };
                    errors.extend(child_errors);

                    let verifying = match config.verifying_key_of(env.from) {
                        Ok(k) => k,
                        Err(e) => {
                            errors.push(env.from, e);
                            continue;
                        }
                    };
                    if verify_bytes(&verifying, &encrypted_filter, &encrypted_filter_signature).is_err() {
                        errors.push(env.from, CothorityError::crypto("child filter signature failed"));
                        continue;
                    }
                    let child_vector = match CipherVector::from_bytes(&encrypted_filter) {
                        Ok(v) => v,
                        Err(e) => {
                            errors.push(env.from, e);
                            continue;
                        }
                    };
                    match aggregate.checked_add(&child_vector) {
                        Ok(sum) => aggregate = sum,
                        Err(e) => {
                            errors.push(env.from, e);
                            continue;
                        }
                    }
                    let child_key = config
                        .roster
                        .get(env.from)
                        .map(|n| n.public_key.clone())
                        .unwrap_or_else(|| PublicKeyHex::from_bytes(&env.from.0.to_le_bytes()));
                    contributions.insert(child_key, encrypted_filter);
                    debug!(child = env.from.0, "verified and folded in child contribution");
                    proofs.extend(complete_proofs);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        received,
                        expected,
                        "child-reply collection window elapsed; aggregating whatever arrived (spec.md §4.5)"
                    );
                    break;
                }
            }
        }
    }
    state.advance_to(StructuredPhase::Aggregated);

    let aggregation_proof = AggregationProof {
        contributions,
        aggregation: aggregate.to_bytes(),
        length: aggregate.len() as u64,
    };
    proofs.insert(
        self_key.clone(),
        CompleteProof {
            node_id: self_index,
            public_key: self_key,
            aggregation_proof,
            cipher_vector_proof: proof,
            encrypted_filter: vector_bytes.clone(),
            encrypted_set_signature: signature.clone(),
        },
    );

    if overlay.is_root() {
        let required = config.roster.threshold();
        if proofs.len() < required {
            return Err(CothorityError::invalid(format!(
                "too few contributions: {} verified, {required} required",
                proofs.len()
            )));
        }
        overlay
            .broadcast(wrap(StructuredMessage::Reply {
                url: url.to_string(),
                encrypted_filter: aggregate.to_bytes(),
                encrypted_filter_signature: signature,
                complete_proofs: proofs.clone(),
                errors,
            }))
            .await;
        state.advance_to(StructuredPhase::ProofsBroadcast);
        state.advance_to(StructuredPhase::Done);
        Ok(Some((aggregate, proofs)))
    } else {
        overlay
            .send_to_parent(wrap(StructuredMessage::Reply {
                url: url.to_string(),
                encrypted_filter: aggregate.to_bytes(),
                encrypted_filter_signature: signature,
                complete_proofs: proofs,
                errors,
            }))
            .await?;
        state.advance_to(StructuredPhase::Done);
        Ok(None)
    }
}
