//! Reconstruction (`spec.md` §4.8): prune the HTML tree to the leaves that
//! cleared the roster's honest-majority threshold, collectively sign the
//! pruned bytes, and seal the result into a [`Webstore`] record.

use cothority_core::{time::format_wire_timestamp, Result};
use cothority_chain::{Block, FileChainStore, Webstore};
use cothority_crypto::CountingBloomFilter;
use cothority_html::HtmlDocument;
use cothority_sign::SignMessage;
use cothority_transport::TreeOverlay;
use frost_ed25519::keys::{KeyPackage, PublicKeyPackage};
use rand_core::{CryptoRng, RngCore};

/// Detach every leaf whose recovered occurrence count falls below
/// `threshold`, reconstructing the counting Bloom filter from the buckets
/// [`crate::decrypt::run_threshold_decrypt`] recovered.
pub fn prune_document(document: &mut HtmlDocument, buckets: Vec<u64>, k: u64, threshold: u64) {
    let clamped: Vec<u8> = buckets.into_iter().map(|count| count.min(u8::MAX as u64) as u8).collect();
    let cbf = CountingBloomFilter::from_buckets(clamped, k);
    document.prune_below_threshold(threshold, |bytes| cbf.count(bytes) as u64);
}

/// Run one collective-signing round over the pruned document's rendered
/// bytes and, on the root, seal the result into a [`Webstore`] record.
#[allow(clippy::too_many_arguments)]
pub async fn seal_artifact<M, O, R>(
    overlay: &mut O,
    document: &HtmlDocument,
    url: &str,
    content_type: &str,
    adds_url: Vec<String>,
    participant_count: usize,
    key_package: &KeyPackage,
    public_key_package: &PublicKeyPackage,
    rng: &mut R,
    wrap: impl Fn(SignMessage) -> M + Send,
    unwrap: impl Fn(M) -> Option<SignMessage> + Send,
) -> Result<Option<Webstore>>
where
    M: Clone + Send + Sync + 'static,
    O: TreeOverlay<M>,
    R: RngCore + CryptoRng,
{
    let payload = document.render();
    let signature = cothority_sign::run_collective_sign(
        overlay,
        participant_count,
        key_package,
        public_key_package,
        &payload,
        rng,
        wrap,
        unwrap,
    )
    .await?;

    Ok(signature.map(|signature| {
        Webstore::new(url, content_type, &payload, signature, adds_url, chrono::Utc::now())
    }))
}

/// Append the page record plus its sub-resources as one chain block
/// (`spec.md` §4.9: one `Vec<Webstore>` per SAVE). Creates the genesis
/// block if the chain is empty.
pub fn append_to_chain(chain: &mut FileChainStore, page: Webstore, sub_resources: Vec<Webstore>) -> Result<&Block> {
    let mut records = vec![page];
    records.extend(sub_resources);
    let payload = cothority_chain::encode_payload(&records)?;
    if chain.is_empty() {
        chain.genesis_create(payload)
    } else {
        chain.append_block(payload)
    }
}

/// Render the pruning threshold as the canonical timestamp format used on
/// the wire and in [`Webstore`] records (`spec.md` §6).
pub fn wire_timestamp(when: chrono::DateTime<chrono::Utc>) -> String {
    format_wire_timestamp(when)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothority_core::{NodeIdentity, NodeIndex, PublicKeyHex, Roster};
    use cothority_html::HtmlNode;
    use cothority_sign::generate_signing_keys;
    use cothority_transport::{LoopbackOverlay, Tree};
    use rand::rngs::OsRng;

    fn roster(n: u16) -> Roster {
        let nodes = (0..n)
            .map(|i| NodeIdentity::new(NodeIndex(i), format!("node{i}:7000"), PublicKeyHex::from_bytes(&[i as u8; 32])))
            .collect();
        Roster::new(nodes)
    }

    #[test]
    fn leaves_below_threshold_are_pruned() {
        let mut doc = HtmlDocument::new(HtmlNode::element(
            "html",
            vec![HtmlNode::element("body", vec![HtmlNode::text("kept"), HtmlNode::text("dropped")])],
        ));
        let cbf = CountingBloomFilter::build(vec![b"kept".as_slice()], 0.001);
        prune_document(&mut doc, cbf.buckets().iter().map(|b| *b as u64).collect(), cbf.k(), 1);
        let leaves = doc.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].text.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn root_seals_a_webstore_record_p8() {
        let n = 4u16;
        let r = roster(n);
        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|x| x.index).collect();
        let (packages, pubkey_package) = generate_signing_keys(4, 3, &mut OsRng).unwrap();

        let overlays = LoopbackOverlay::<SignMessage>::build_network(tree, indices.clone());
        let doc = HtmlDocument::new(HtmlNode::element("html", vec![HtmlNode::text("hello")]));

        let mut handles = Vec::new();
        for mut overlay in overlays {
            let key_package = packages[&(overlay.index().0 + 1)].clone();
            let pubkey_package = pubkey_package.clone();
            let doc = doc.clone();
            handles.push(tokio::spawn(async move {
                let mut rng = OsRng;
                seal_artifact(
                    &mut overlay,
                    &doc,
                    "http://x/",
                    "text/html",
                    vec![],
                    4,
                    &key_package,
                    &pubkey_package,
                    &mut rng,
                    |m| m,
                    Some,
                )
                .await
                .unwrap()
            }));
        }

        let mut sealed = None;
        for handle in handles {
            if let Some(record) = handle.await.unwrap() {
                sealed = Some(record);
            }
        }
        let record = sealed.expect("root produces a Webstore record");
        assert_eq!(record.payload().unwrap(), doc.render());
    }
}
