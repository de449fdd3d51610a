//! Threshold Decrypt Protocol (`spec.md` §4.7): recover each qualified
//! counting-Bloom-filter bucket's plaintext count from the aggregated
//! cipher vector, without any single node ever learning the shared
//! private key.
//!
//! Every node derives a partial decryption `v_i * K_j` per bucket from its
//! own DKG share; the root combines however many partials arrive within a
//! bounded collection window via Lagrange interpolation at zero
//! ([`crate::lagrange`]), then looks each recovered point up in a
//! [`DiscreteLogTable`] to get back the small integer count.

use crate::lagrange::coefficients_at_zero;
use crate::messages::DecryptMessage;
use cothority_core::{CothorityError, NodeIndex, Result, Roster};
use cothority_crypto::{CipherVector, DiscreteLogTable, Point};
use cothority_dkg::SharedSecret;
use cothority_transport::TreeOverlay;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

pub struct DecryptConfig {
    pub roster: Roster,
    pub shared_secret: SharedSecret,
}

impl DecryptConfig {
    pub fn new(roster: Roster, shared_secret: SharedSecret) -> Self {
        Self { roster, shared_secret }
    }
}

/// Run one Threshold Decrypt round. `cipher_vector` is required on the
/// root (the aggregate to decrypt); non-root nodes receive it over the
/// wire and ignore the argument. Returns the recovered per-bucket counts
/// on the root, `None` elsewhere.
pub async fn run_threshold_decrypt<M, O>(
    overlay: &mut O,
    config: &DecryptConfig,
    cipher_vector: Option<&CipherVector>,
    dlog_table: &DiscreteLogTable,
    collection_timeout: Duration,
    wrap: impl Fn(DecryptMessage) -> M + Send,
    unwrap: impl Fn(M) -> Option<DecryptMessage> + Send,
) -> Result<Option<Vec<u64>>>
where
    M: Clone + Send + Sync + 'static,
    O: TreeOverlay<M>,
{
    let self_index = overlay.index();

    let working_vector: CipherVector = if overlay.is_root() {
        let cv = cipher_vector
            .ok_or_else(|| CothorityError::invalid("root must supply the cipher vector to decrypt"))?
            .clone();
        overlay
            .broadcast(wrap(DecryptMessage::PromptDecrypt { cipher_vector: cv.clone() }))
            .await;
        cv
    } else {
        let env = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed before PromptDecrypt"))?;
        match unwrap(env.payload) {
            Some(DecryptMessage::PromptDecrypt { cipher_vector }) => cipher_vector,
            _ => return Err(CothorityError::invalid("expected PromptDecrypt from root")),
        }
    };

    let own_partials: Vec<Point> = working_vector
        .0
        .iter()
        .map(|ct| ct.k * config.shared_secret.v)
        .collect();

    if !overlay.is_root() {
        overlay
            .send_to_parent(wrap(DecryptMessage::SendPartial { partials: own_partials }))
            .await?;
        return Ok(None);
    }

    // Root: collect partials from as many nodes as reply within the
    // window, tolerating offline or slow nodes (`spec.md` §4.7).
    let mut partials_by_index: BTreeMap<NodeIndex, Vec<Point>> = BTreeMap::new();
    partials_by_index.insert(self_index, own_partials);

    let threshold = config.roster.threshold();
    let expected_others = config.roster.len().saturating_sub(1);
    let mut received = 0usize;
    while received < expected_others {
        match tokio::time::timeout(collection_timeout, overlay.recv()).await {
            Ok(Some(env)) => {
                received += 1;
                match unwrap(env.payload) {
                    Some(DecryptMessage::SendPartial { partials }) if partials.len() == working_vector.len() => {
                        partials_by_index.insert(env.from, partials);
                    }
                    Some(DecryptMessage::SendPartial { .. }) => {
                        warn!(from = env.from.0, "dropped partial decryption with mismatched length");
                    }
                    _ => warn!(from = env.from.0, "ignored non-partial message during Threshold Decrypt"),
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    received = partials_by_index.len(),
                    required = threshold,
                    "collection window elapsed before every node replied"
                );
                break;
            }
        }
    }

    if partials_by_index.len() < threshold {
        return Err(CothorityError::timeout(format!(
            "only {} of {} required partial decryptions arrived",
            partials_by_index.len(),
            threshold
        )));
    }

    let indices: Vec<NodeIndex> = partials_by_index.keys().copied().collect();
    let coefficients = coefficients_at_zero(&indices)?;

    let mut counts = Vec::with_capacity(working_vector.len());
    for (bucket, ct) in working_vector.0.iter().enumerate() {
        let mut combined = Point::default();
        for (index, lambda) in indices.iter().zip(coefficients.iter()) {
            combined += partials_by_index[index][bucket] * *lambda;
        }
        let plaintext_point = ct.c - combined;
        counts.push(dlog_table.lookup(plaintext_point)?);
    }

    Ok(Some(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothority_core::{NodeIdentity, PublicKeyHex};
    use cothority_crypto::CipherText;
    use cothority_dkg::{run_setup, DkgConfig};
    use cothority_transport::{LoopbackOverlay, Tree};
    use rand::rngs::OsRng;

    fn roster(n: u16) -> Roster {
        let nodes = (0..n)
            .map(|i| NodeIdentity::new(NodeIndex(i), format!("node{i}:7000"), PublicKeyHex::from_bytes(&[i as u8; 32])))
            .collect();
        Roster::new(nodes)
    }

    async fn run_dkg(n: u16, threshold: usize) -> (Roster, Vec<SharedSecret>, Point) {
        let r = roster(n);
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|x| x.index).collect();
        let config = DkgConfig { participants: indices.clone(), threshold };
        let tree = Tree::derive_star(&r, NodeIndex(0));
        let overlays = LoopbackOverlay::build_network(tree, indices.clone());
        let mut handles = Vec::new();
        for mut overlay in overlays {
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                let mut rng = OsRng;
                run_setup(&mut overlay, &config, &mut rng, |m| m, Some).await.unwrap()
            }));
        }
        let mut secrets = Vec::new();
        for handle in handles {
            secrets.push(handle.await.unwrap());
        }
        secrets.sort_by_key(|s| s.index.0);
        let public = secrets[0].x;
        (r, secrets, public)
    }

    #[tokio::test]
    async fn threshold_decrypt_recovers_the_aggregate_count_p7() {
        let (r, secrets, public) = run_dkg(4, 3).await;

        let mut rng = OsRng;
        let (ct_a, _) = CipherText::encrypt_int(&mut rng, 1, public);
        let (ct_b, _) = CipherText::encrypt_int(&mut rng, 1, public);
        let (ct_c, _) = CipherText::encrypt_int(&mut rng, 1, public);
        let sum = ct_a.add(&ct_b).add(&ct_c);
        let cipher_vector = CipherVector(vec![sum]);

        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|x| x.index).collect();
        let overlays = LoopbackOverlay::build_network(tree, indices.clone());

        let mut handles = Vec::new();
        for mut overlay in overlays {
            let config = DecryptConfig::new(r.clone(), secrets[overlay.index().0 as usize].clone());
            let cv = cipher_vector.clone();
            let table_handle = DiscreteLogTable::new(4);
            handles.push(tokio::spawn(async move {
                let arg = if overlay.index() == NodeIndex(0) { Some(&cv) } else { None };
                run_threshold_decrypt(
                    &mut overlay,
                    &config,
                    arg,
                    &table_handle,
                    Duration::from_secs(5),
                    |m| m,
                    Some,
                )
                .await
            }));
        }

        let mut recovered = None;
        for handle in handles {
            if let Some(counts) = handle.await.unwrap().unwrap() {
                recovered = Some(counts);
            }
        }
        assert_eq!(recovered, Some(vec![3]));
    }

    #[tokio::test]
    async fn too_few_partials_fails_rather_than_hangs() {
        let (r, secrets, public) = run_dkg(4, 3).await;
        let mut rng = OsRng;
        let (ct, _) = CipherText::encrypt_int(&mut rng, 1, public);
        let cipher_vector = CipherVector(vec![ct]);

        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|x| x.index).collect();
        let overlays = LoopbackOverlay::build_network(tree, indices.clone());

        let mut handles = Vec::new();
        for mut overlay in overlays {
            let idx = overlay.index();
            // Node 1 and node 2 never participate: fewer than threshold(3) partials arrive.
            if idx == NodeIndex(1) || idx == NodeIndex(2) {
                continue;
            }
            let config = DecryptConfig::new(r.clone(), secrets[idx.0 as usize].clone());
            let cv = cipher_vector.clone();
            let table = DiscreteLogTable::new(4);
            handles.push(tokio::spawn(async move {
                let arg = if idx == NodeIndex(0) { Some(&cv) } else { None };
                run_threshold_decrypt(&mut overlay, &config, arg, &table, Duration::from_millis(200), |m| m, Some).await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap();
            if let Ok(Some(_)) = result {
                panic!("expected root to fail with too few partials");
            }
        }
    }
}
