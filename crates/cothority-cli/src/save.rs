//! `save`: run Structured Consensus on a url, Threshold Decrypt the agreed
//! bucket counts, prune and collectively sign the result, run Unstructured
//! Consensus + signing for any declared sub-resources, and append the
//! bundle to the chain (`spec.md` §4.5-§4.9).

use crate::config::{
    load_frost_key_package, load_frost_public_key_package, load_node_shared_secret, load_node_signing_key,
    point_of, RunConfig,
};
use cothority_chain::FileChainStore;
use cothority_consensus::{
    append_to_chain, prune_document, run_structured_consensus, run_threshold_decrypt, run_unstructured_consensus,
    seal_artifact, DecryptConfig, StructuredConfig, UnstructuredConfig, Webstore,
};
use cothority_core::config::DEFAULT_SIGNING_SUBTREE_TIMEOUT;
use cothority_core::{CothorityError, NodeIndex, Result, Roster};
use cothority_crypto::DiscreteLogTable;
use cothority_html::{Fetcher, HtmlDocument, HtmlNode, HtmlParser, HttpFetcher, MinimalHtmlParser};
use cothority_sign::SignMessage;
use cothority_transport::{LoopbackOverlay, Tree, TreeOverlay};
use frost_ed25519::keys::PublicKeyPackage;
use rand::rngs::OsRng;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub async fn run(storage_dir: &Path, url: &str, content_type: &str, sub_resources: Vec<String>) -> Result<()> {
    let run_config = RunConfig::load(storage_dir)?;
    let roster = run_config.roster.clone();
    let indices: Vec<NodeIndex> = roster.nodes().iter().map(|n| n.index).collect();
    let threshold = roster.threshold();
    let root = NodeIndex(0);
    let public_key_package = load_frost_public_key_package(storage_dir)?;
    let shared_public_key = point_of(roster.get(root).unwrap().public_key.as_str())?;
    let collection_timeout = Duration::from_secs(run_config.collection_timeout_secs);
    let dlog_table = std::sync::Arc::new(DiscreteLogTable::new(roster.len() as u64));

    let aggregate = run_structured_round(
        storage_dir,
        &roster,
        &indices,
        root,
        url,
        shared_public_key,
        collection_timeout,
    )
    .await?
    .ok_or_else(|| CothorityError::internal("root produced no aggregate filter"))?;

    // Re-derive (m, k) exactly as Structured Consensus did, to rebuild the
    // document for pruning; only `k` is needed to reconstruct the filter.
    let fetcher = HttpFetcher::new();
    let body = fetcher.fetch(url).await?;
    let mut document = MinimalHtmlParser.parse(&body.bytes)?;
    let distinct = document.leaves().len();
    let (_, k) = cothority_crypto::cbf::derive_parameters(distinct, run_config.cbf_false_positive_rate);

    let buckets = run_decrypt_round(storage_dir, &roster, &indices, root, &aggregate, dlog_table.clone(), collection_timeout)
        .await?
        .ok_or_else(|| CothorityError::internal("root recovered no bucket counts"))?;

    prune_document(&mut document, buckets, k, threshold as u64);

    let page = seal_page(
        storage_dir,
        &roster,
        &indices,
        root,
        &document,
        url,
        content_type,
        sub_resources.clone(),
        &public_key_package,
    )
    .await?
    .ok_or_else(|| CothorityError::internal("root did not produce a sealed page"))?;

    let mut sealed_sub_resources = Vec::new();
    for sub_url in &sub_resources {
        let Some(bytes) =
            run_unstructured_round(storage_dir, &roster, &indices, root, sub_url, collection_timeout).await?
        else {
            info!(url = %sub_url, "no majority sub-resource data recovered, skipping");
            continue;
        };
        // Sub-resources are opaque blobs (`spec.md` §4.6); wrap as a single
        // text leaf so the same collective-signing path covers both.
        let sub_document = HtmlDocument::new(HtmlNode::text(String::from_utf8_lossy(&bytes).into_owned()));
        let sealed = seal_page(
            storage_dir,
            &roster,
            &indices,
            root,
            &sub_document,
            sub_url,
            "application/octet-stream",
            Vec::new(),
            &public_key_package,
        )
        .await?;
        if let Some(record) = sealed {
            sealed_sub_resources.push(record);
        }
    }

    let mut chain = FileChainStore::open(storage_dir.join("chain.jsonl"))?;
    let block = append_to_chain(&mut chain, page, sealed_sub_resources)?;
    info!(index = block.index, url, "saved");
    Ok(())
}

async fn run_structured_round(
    storage_dir: &Path,
    roster: &Roster,
    indices: &[NodeIndex],
    root: NodeIndex,
    url: &str,
    shared_public_key: cothority_crypto::Point,
    collection_timeout: Duration,
) -> Result<Option<cothority_crypto::CipherVector>> {
    let tree = Tree::derive_star(roster, root);
    let overlays = LoopbackOverlay::build_network(tree, indices.to_vec());
    let mut handles = Vec::new();
    for mut overlay in overlays {
        let signing_key = load_node_signing_key(storage_dir, overlay.index())?;
        let config = StructuredConfig::new(roster.clone(), shared_public_key, signing_key);
        let url = url.to_string();
        handles.push(tokio::spawn(async move {
            let mut rng = OsRng;
            let fetcher = HttpFetcher::new();
            let parser = MinimalHtmlParser;
            let result = run_structured_consensus(
                &mut overlay,
                &config,
                &url,
                &fetcher,
                &parser,
                collection_timeout,
                &mut rng,
                |m| m,
                Some,
            )
            .await;
            (overlay.index(), result)
        }));
    }
    let mut aggregate = None;
    for handle in handles {
        let (index, result) = handle.await.map_err(|e| CothorityError::internal(e.to_string()))?;
        if let Some((vector, _proofs)) = result? {
            if index == root {
                aggregate = Some(vector);
            }
        }
    }
    Ok(aggregate)
}

async fn run_decrypt_round(
    storage_dir: &Path,
    roster: &Roster,
    indices: &[NodeIndex],
    root: NodeIndex,
    aggregate: &cothority_crypto::CipherVector,
    dlog_table: std::sync::Arc<DiscreteLogTable>,
    collection_timeout: Duration,
) -> Result<Option<Vec<u64>>> {
    let tree = Tree::derive_star(roster, root);
    let overlays = LoopbackOverlay::build_network(tree, indices.to_vec());
    let mut handles = Vec::new();
    for mut overlay in overlays {
        let secret = load_node_shared_secret(storage_dir, overlay.index())?;
        let config = DecryptConfig::new(roster.clone(), secret);
        let aggregate = if overlay.index() == root { Some(aggregate.clone()) } else { None };
        let dlog_table = dlog_table.clone();
        handles.push(tokio::spawn(async move {
            let index = overlay.index();
            let result = run_threshold_decrypt(
                &mut overlay,
                &config,
                aggregate.as_ref(),
                &dlog_table,
                collection_timeout,
                |m| m,
                Some,
            )
            .await;
            (index, result)
        }));
    }
    let mut buckets = None;
    for handle in handles {
        let (index, result) = handle.await.map_err(|e| CothorityError::internal(e.to_string()))?;
        if let Some(recovered) = result? {
            if index == root {
                buckets = Some(recovered);
            }
        }
    }
    Ok(buckets)
}

async fn run_unstructured_round(
    storage_dir: &Path,
    roster: &Roster,
    indices: &[NodeIndex],
    root: NodeIndex,
    url: &str,
    collection_timeout: Duration,
) -> Result<Option<Vec<u8>>> {
    let tree = Tree::derive_star(roster, root);
    let overlays = LoopbackOverlay::build_network(tree, indices.to_vec());
    let mut handles = Vec::new();
    for mut overlay in overlays {
        let signing_key = load_node_signing_key(storage_dir, overlay.index())?;
        let config = UnstructuredConfig::new(roster.clone(), signing_key);
        let url = url.to_string();
        handles.push(tokio::spawn(async move {
            let mut rng = OsRng;
            let fetcher = HttpFetcher::new();
            let result = run_unstructured_consensus(
                &mut overlay,
                &config,
                &url,
                &fetcher,
                collection_timeout,
                &mut rng,
                |m| m,
                Some,
            )
            .await;
            (overlay.index(), result)
        }));
    }
    let mut winning_bytes = None;
    for handle in handles {
        let (index, result) = handle.await.map_err(|e| CothorityError::internal(e.to_string()))?;
        if index == root {
            winning_bytes = result?;
        }
    }
    Ok(winning_bytes)
}

#[allow(clippy::too_many_arguments)]
async fn seal_page(
    storage_dir: &Path,
    roster: &Roster,
    indices: &[NodeIndex],
    root: NodeIndex,
    document: &HtmlDocument,
    url: &str,
    content_type: &str,
    adds_url: Vec<String>,
    public_key_package: &PublicKeyPackage,
) -> Result<Option<Webstore>> {
    let tree = Tree::derive_star(roster, root);
    let overlays = LoopbackOverlay::<SignMessage>::build_network(tree, indices.to_vec());
    let mut handles = Vec::new();
    for mut overlay in overlays {
        let key_package = load_frost_key_package(storage_dir, overlay.index().0 + 1)?;
        let public_key_package = public_key_package.clone();
        let document = document.clone();
        let url = url.to_string();
        let content_type = content_type.to_string();
        let adds_url = adds_url.clone();
        let participant_count = roster.len();
        handles.push(tokio::spawn(async move {
            let mut rng = OsRng;
            let index = overlay.index();
            let signing = seal_artifact(
                &mut overlay,
                &document,
                &url,
                &content_type,
                adds_url,
                participant_count,
                &key_package,
                &public_key_package,
                &mut rng,
                |m| m,
                Some,
            );
            let result = match tokio::time::timeout(DEFAULT_SIGNING_SUBTREE_TIMEOUT, signing).await {
                Ok(result) => result,
                Err(_) => Err(CothorityError::timeout("collective signing subtree did not finish in time")),
            };
            (index, result)
        }));
    }
    let mut sealed = None;
    for handle in handles {
        let (index, result) = handle.await.map_err(|e| CothorityError::internal(e.to_string()))?;
        if let Some(record) = result? {
            if index == root {
                sealed = Some(record);
            }
        }
    }
    Ok(sealed)
}
