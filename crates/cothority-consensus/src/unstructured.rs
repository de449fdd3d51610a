//! Unstructured Consensus Protocol (`spec.md` §4.6): hash-voting agreement
//! on an opaque sub-resource (images, stylesheets, scripts) that the
//! counting-Bloom-filter pipeline does not model.
//!
//! Every node independently fetches the sub-resource, Schnorr-signs its
//! content hash, and the votes are merged up the tree exactly as
//! Structured Consensus merges cipher vectors, within a bounded collection
//! window. The root picks the hash with the most verified signers
//! (`spec.md` "argmax_h |signers(h)|`, requires `>= T`), then asks for the
//! matching plaintext in a Reveal round, also bounded.

use crate::messages::{HashVotes, UnstructuredMessage, UnstructuredPhase};
use cothority_core::{hash, CothorityError, ErrorList, NodeIndex, Result, Roster};
use cothority_crypto::group::point_from_bytes;
use cothority_crypto::{Signature, SigningKey, VerifyingKey};
use cothority_html::{Fetcher, FetchedBody};
use cothority_transport::TreeOverlay;
use rand_core::{CryptoRng, RngCore};
use std::time::Duration;
use tracing::warn;

pub struct UnstructuredConfig {
    pub roster: Roster,
    pub signing_key: SigningKey,
}

impl UnstructuredConfig {
    pub fn new(roster: Roster, signing_key: SigningKey) -> Self {
        Self { roster, signing_key }
    }
}

fn verifying_key_from_hex(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key)?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CothorityError::invalid("public key is not 32 bytes"))?;
    let point = point_from_bytes(&arr)
        .ok_or_else(|| CothorityError::invalid("public key is not a valid curve point"))?;
    Ok(VerifyingKey(point))
}

fn sign_hash<R: RngCore + CryptoRng>(key: &SigningKey, rng: &mut R, hex_hash: &str) -> Vec<u8> {
    let sig = key.sign(rng, hex_hash.as_bytes());
    bincode::serialize(&sig).expect("Signature serializes")
}

/// Merge `from` into `into`, keeping only entries whose signature verifies
/// against the claimed hash (`spec.md` P6: tamper resistance).
fn merge_votes(into: &mut HashVotes, from: HashVotes, errors: &mut ErrorList, source: NodeIndex) {
    for (hex_hash, entries) in from {
        for (public_key, signature_bytes) in entries {
            let verifying = match verifying_key_from_hex(public_key.as_str()) {
                Ok(v) => v,
                Err(e) => {
                    errors.push(source, e);
                    continue;
                }
            };
            let Ok(sig): std::result::Result<Signature, _> = bincode::deserialize(&signature_bytes) else {
                errors.push(source, CothorityError::serialization("bad vote signature encoding"));
                continue;
            };
            if verifying.verify(hex_hash.as_bytes(), &sig).is_err() {
                errors.push(source, CothorityError::crypto("vote signature failed to verify"));
                continue;
            }
            into.entry(hex_hash.clone())
                .or_default()
                .push((public_key, signature_bytes));
        }
    }
}

fn winning_hash(votes: &HashVotes, threshold: usize) -> Result<String> {
    votes
        .iter()
        .max_by_key(|(_, signers)| signers.len())
        .filter(|(_, signers)| signers.len() >= threshold)
        .map(|(hash, _)| hash.clone())
        .ok_or_else(|| CothorityError::invalid("no sub-resource hash reached threshold"))
}

/// Fetch the sub-resource, degrading non-fatally to an empty body on
/// failure (`spec.md` §7): the node still signs and votes, just for a hash
/// that will not match any honest peer's.
async fn fetch_or_empty(fetcher: &dyn Fetcher, url: &str, self_index: NodeIndex, errors: &mut ErrorList) -> FetchedBody {
    match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "failed to fetch sub-resource, contributing an empty vote");
            errors.push(self_index, e);
            FetchedBody {
                content_type: "application/octet-stream".to_string(),
                bytes: Vec::new(),
            }
        }
    }
}

/// Run Unstructured Consensus for one sub-resource url. Returns the
/// revealed plaintext bytes on the root once a winning hash is agreed and
/// reconfirmed; `None` on every other node.
pub async fn run_unstructured_consensus<M, O, R>(
    overlay: &mut O,
    config: &UnstructuredConfig,
    url: &str,
    fetcher: &dyn Fetcher,
    collection_timeout: Duration,
    rng: &mut R,
    wrap: impl Fn(UnstructuredMessage) -> M + Send,
    unwrap: impl Fn(M) -> Option<UnstructuredMessage> + Send,
) -> Result<Option<Vec<u8>>>
where
    M: Clone + Send + Sync + 'static,
    O: TreeOverlay<M>,
    R: RngCore + CryptoRng,
{
    let self_index = overlay.index();
    let mut errors = ErrorList::new();

    if !overlay.is_root() {
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed before Announce"))?;
        match unwrap(env.payload) {
            Some(UnstructuredMessage::Announce { phase: UnstructuredPhase::Consensus, .. }) => {}
            _ => return Err(CothorityError::invalid("expected Consensus Announce from parent")),
        }
    } else {
        for (to, result) in overlay
            .send_to_children(wrap(UnstructuredMessage::Announce {
                url: url.to_string(),
                phase: UnstructuredPhase::Consensus,
                master_hash: Default::default(),
            }))
            .await
        {
            if let Err(e) = result {
                warn!(node = to.0, error = %e, "failed to announce sub-resource to child");
            }
        }
    }

    let body = fetch_or_empty(fetcher, url, self_index, &mut errors).await;
    let own_hash = hash(&body.bytes).to_hex();
    let own_signature = sign_hash(&config.signing_key, rng, &own_hash);
    let self_key = config
        .roster
        .get(self_index)
        .ok_or_else(|| CothorityError::invalid("self index missing from roster"))?
        .public_key
        .clone();

    let mut votes: HashVotes = Default::default();
    votes.entry(own_hash.clone()).or_default().push((self_key, own_signature));

    if !overlay.is_leaf() {
        let expected = overlay.children().len();
        let mut received = 0usize;
        while received < expected {
            match tokio::time::timeout(collection_timeout, overlay.recv()).await {
                Ok(Some(env)) => {
                    received += 1;
                    match unwrap(env.payload) {
                        Some(UnstructuredMessage::Reply { master_hash, errors: child_errors, .. }) => {
                            merge_votes(&mut votes, master_hash, &mut errors, env.from);
                            errors.extend(child_errors);
                        }
                        _ => warn!(from = env.from.0, "ignored non-reply message during Unstructured Consensus"),
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        received,
                        expected,
                        "vote collection window elapsed; finalizing with whatever arrived (spec.md §4.6)"
                    );
                    break;
                }
            }
        }
    }

    if !overlay.is_root() {
        overlay
            .send_to_parent(wrap(UnstructuredMessage::Reply {
                phase: UnstructuredPhase::Consensus,
                url: url.to_string(),
                master_hash: votes,
                requested_data: Default::default(),
                errors,
            }))
            .await?;

        // Stay alive for the Reveal round: the root may ask for this
        // node's plaintext if its own hash matches the winner, then
        // signal completion with an End announce.
        loop {
            let env = overlay
                .recv()
                .await
                .ok_or_else(|| CothorityError::network("overlay closed during Reveal"))?;
            match unwrap(env.payload) {
                Some(UnstructuredMessage::Announce { phase: UnstructuredPhase::RequestMissingData, master_hash, .. }) => {
                    let mut requested_data = std::collections::BTreeMap::new();
                    if let Some(winner) = master_hash.keys().next() {
                        if &own_hash == winner {
                            requested_data.insert(winner.clone(), body.bytes.clone());
                        }
                    }
                    overlay
                        .send_to_parent(wrap(UnstructuredMessage::Reply {
                            phase: UnstructuredPhase::RequestMissingData,
                            url: url.to_string(),
                            master_hash: Default::default(),
                            requested_data,
                            errors: ErrorList::new(),
                        }))
                        .await?;
                }
                Some(UnstructuredMessage::Announce { phase: UnstructuredPhase::End, .. }) => return Ok(None),
                _ => warn!(from = env.from.0, "ignored message while awaiting Reveal"),
            }
        }
    }

    let winner = winning_hash(&votes, config.roster.threshold())?;

    let own_plaintext = if own_hash == winner { Some(body.bytes.clone()) } else { None };
    overlay
        .broadcast(wrap(UnstructuredMessage::Announce {
            url: url.to_string(),
            phase: UnstructuredPhase::RequestMissingData,
            master_hash: [(winner.clone(), String::new())].into_iter().collect(),
        }))
        .await;

    let mut revealed = own_plaintext;
    let expected = config.roster.len().saturating_sub(1);
    let mut received = 0usize;
    while revealed.is_none() && received < expected {
        match tokio::time::timeout(collection_timeout, overlay.recv()).await {
            Ok(Some(env)) => {
                received += 1;
                if let Some(UnstructuredMessage::Reply { requested_data, .. }) = unwrap(env.payload) {
                    if let Some(plaintext) = requested_data.get(&winner) {
                        if hash(plaintext).to_hex() == winner {
                            revealed = Some(plaintext.clone());
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    received,
                    expected,
                    "reveal collection window elapsed; no further plaintext will arrive"
                );
                break;
            }
        }
    }

    overlay
        .broadcast(wrap(UnstructuredMessage::Announce {
            url: url.to_string(),
            phase: UnstructuredPhase::End,
            master_hash: Default::default(),
        }))
        .await;

    Ok(revealed)
}
