//! Async orchestration of one collective-signing round over a
//! [`TreeOverlay`] (`spec.md` §4.8: "tree-structured Schnorr aggregator").
//!
//! The root drives both FROST rounds over broadcast/reply; each non-root
//! node commits, then signs once it has the full commitment set. Only the
//! root produces the final aggregated signature.

use crate::keygen::u16_to_identifier;
use crate::messages::SignMessage;
use cothority_core::{CothorityError, NodeIndex, Result};
use cothority_transport::TreeOverlay;
use frost_ed25519::keys::{KeyPackage, PublicKeyPackage};
use frost_ed25519::{round1, round2, Identifier, SigningPackage};
use rand_core::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use tracing::debug;

fn to_frost_commitments(
    commitments: &BTreeMap<NodeIndex, Vec<u8>>,
) -> Result<BTreeMap<Identifier, round1::SigningCommitments>> {
    commitments
        .iter()
        .map(|(index, bytes)| {
            let identifier = u16_to_identifier(index.0)?;
            let commitment = round1::SigningCommitments::deserialize(bytes)
                .map_err(|e| CothorityError::crypto(format!("bad nonce commitment: {e}")))?;
            Ok((identifier, commitment))
        })
        .collect()
}

/// Run one collective-signing round. Returns `Some(signature)` on the root
/// once aggregation succeeds, `None` on every other node.
pub async fn run_collective_sign<M, O, R>(
    overlay: &mut O,
    participant_count: usize,
    key_package: &KeyPackage,
    public_key_package: &PublicKeyPackage,
    message: &[u8],
    rng: &mut R,
    wrap: impl Fn(SignMessage) -> M + Send,
    unwrap: impl Fn(M) -> Option<SignMessage> + Send,
) -> Result<Option<Vec<u8>>>
where
    M: Clone + Send + Sync + 'static,
    O: TreeOverlay<M>,
    R: RngCore + CryptoRng,
{
    let self_index = overlay.index();
    let (nonces, commitment) = round1::commit(key_package.signing_share(), rng);
    let commitment_bytes = commitment
        .serialize()
        .map_err(|e| CothorityError::crypto(format!("failed to serialize commitment: {e}")))?;

    if !overlay.is_root() {
        // Wait for the root's commit request, then reply with our commitment.
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed before commit request"))?;
        match unwrap(env.payload) {
            Some(SignMessage::CommitRequest { .. }) => {}
            _ => return Err(CothorityError::invalid("expected CommitRequest from root")),
        }
        overlay
            .send_to_parent(wrap(SignMessage::Commit {
                signer: self_index,
                commitment: commitment_bytes,
            }))
            .await?;

        // Wait for the assembled signing package, sign, and reply.
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed before signing package"))?;
        let (msg, commitments) = match unwrap(env.payload) {
            Some(SignMessage::SigningPackage { message, commitments }) => (message, commitments),
            _ => return Err(CothorityError::invalid("expected SigningPackage from root")),
        };
        let commitment_map: BTreeMap<NodeIndex, Vec<u8>> = commitments.into_iter().collect();
        let signing_package = SigningPackage::new(to_frost_commitments(&commitment_map)?, &msg);
        let share = round2::sign(&signing_package, &nonces, key_package)
            .map_err(|e| CothorityError::crypto(format!("FROST signing failed: {e}")))?;
        overlay
            .send_to_parent(wrap(SignMessage::PartialSignature {
                signer: self_index,
                share: share.serialize().to_vec(),
            }))
            .await?;
        return Ok(None);
    }

    // Root: collect every commitment (including its own).
    let mut commitments = BTreeMap::new();
    commitments.insert(self_index, commitment_bytes);
    overlay
        .broadcast(wrap(SignMessage::CommitRequest {
            message: message.to_vec(),
        }))
        .await;

    let expected = participant_count.saturating_sub(1);
    let mut received = 0usize;
    while received < expected {
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed while collecting commitments"))?;
        received += 1;
        if let Some(SignMessage::Commit { signer, commitment }) = unwrap(env.payload) {
            debug!(signer = signer.0, "received nonce commitment");
            commitments.insert(signer, commitment);
        }
    }

    let signing_package = SigningPackage::new(to_frost_commitments(&commitments)?, message);
    overlay
        .broadcast(wrap(SignMessage::SigningPackage {
            message: message.to_vec(),
            commitments: commitments.clone().into_iter().collect(),
        }))
        .await;

    let own_share = round2::sign(&signing_package, &nonces, key_package)
        .map_err(|e| CothorityError::crypto(format!("FROST signing failed: {e}")))?;
    let mut shares = BTreeMap::new();
    shares.insert(self_index, own_share);

    let mut received = 0usize;
    while received < expected {
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed while collecting shares"))?;
        received += 1;
        if let Some(SignMessage::PartialSignature { signer, share }) = unwrap(env.payload) {
            let share_bytes: [u8; 32] = share.as_slice().try_into().map_err(|_| {
                CothorityError::crypto("bad signature share: unexpected length".to_string())
            })?;
            let share = round2::SignatureShare::deserialize(share_bytes)
                .map_err(|e| CothorityError::crypto(format!("bad signature share: {e}")))?;
            shares.insert(signer, share);
        }
    }

    let frost_shares: BTreeMap<Identifier, round2::SignatureShare> = shares
        .into_iter()
        .map(|(index, share)| Ok((u16_to_identifier(index.0)?, share)))
        .collect::<Result<_>>()?;

    let signature = frost_ed25519::aggregate(&signing_package, &frost_shares, public_key_package)
        .map_err(|e| CothorityError::crypto(format!("FROST aggregation failed: {e}")))?;

    public_key_package
        .verifying_key()
        .verify(message, &signature)
        .map_err(|e| CothorityError::crypto(format!("aggregated signature failed to verify: {e}")))?;

    Ok(Some(signature.serialize().as_ref().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::generate_signing_keys;
    use cothority_core::{NodeIdentity, PublicKeyHex, Roster};
    use cothority_transport::{LoopbackOverlay, Tree};
    use rand::rngs::OsRng;

    fn roster(n: u16) -> Roster {
        let nodes = (0..n)
            .map(|i| {
                NodeIdentity::new(
                    NodeIndex(i),
                    format!("node{i}:7000"),
                    PublicKeyHex::from_bytes(&[i as u8; 32]),
                )
            })
            .collect();
        Roster::new(nodes)
    }

    #[tokio::test]
    async fn root_produces_a_verifying_signature() {
        let r = roster(4);
        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|n| n.index).collect();
        let (packages, pubkey_package) = generate_signing_keys(4, 3, &mut OsRng).unwrap();

        let overlays = LoopbackOverlay::<SignMessage>::build_network(tree, indices.clone());
        let message = b"artifact bytes".to_vec();
        let mut handles = Vec::new();
        for mut overlay in overlays {
            let key_package = packages[&(overlay.index().0 + 1)].clone();
            let pubkey_package = pubkey_package.clone();
            let message = message.clone();
            handles.push(tokio::spawn(async move {
                let mut rng = OsRng;
                run_collective_sign(
                    &mut overlay,
                    4,
                    &key_package,
                    &pubkey_package,
                    &message,
                    &mut rng,
                    |m| m,
                    Some,
                )
                .await
            }));
        }

        let mut signature = None;
        for handle in handles {
            if let Some(sig) = handle.await.unwrap().unwrap() {
                signature = Some(sig);
            }
        }
        assert!(signature.is_some());
    }
}
