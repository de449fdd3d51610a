//! `skipstart`: bootstrap a roster, create the genesis chain block, and run
//! Setup (`spec.md` §6 "bootstrap chain + run DKG").

use crate::config::{save_frost_keys, save_node_shared_secret, save_node_signing_key, RunConfig};
use cothority_chain::FileChainStore;
use cothority_core::{CothorityError, NodeIdentity, NodeIndex, PublicKeyHex, Result, Roster};
use cothority_crypto::group::point_to_bytes;
use cothority_dkg::{run_setup, DkgConfig};
use cothority_sign::generate_signing_keys;
use cothority_transport::{LoopbackOverlay, Tree, TreeOverlay};
use rand::rngs::OsRng;
use std::path::Path;
use tracing::info;

pub async fn run(storage_dir: &Path, nodes: u16) -> Result<()> {
    if nodes < 1 {
        return Err(CothorityError::invalid("a roster needs at least one node"));
    }

    let mut keys = Vec::with_capacity(nodes as usize);
    let mut identities = Vec::with_capacity(nodes as usize);
    for i in 0..nodes {
        let key = cothority_crypto::SigningKey::generate(&mut OsRng);
        identities.push(NodeIdentity::new(
            NodeIndex(i),
            format!("node{i}:local"),
            PublicKeyHex::from_bytes(&point_to_bytes(&key.public)),
        ));
        keys.push(key);
    }
    let roster = Roster::new(identities);
    let threshold = roster.threshold();
    info!(nodes = roster.len(), threshold, "bootstrapping roster");

    let indices: Vec<NodeIndex> = roster.nodes().iter().map(|n| n.index).collect();
    let dkg_config = DkgConfig { participants: indices.clone(), threshold };
    let tree = Tree::derive_star(&roster, NodeIndex(0));
    let overlays = LoopbackOverlay::build_network(tree, indices.clone());

    let mut handles = Vec::new();
    for mut overlay in overlays {
        let dkg_config = dkg_config.clone();
        handles.push(tokio::spawn(async move {
            let mut rng = OsRng;
            let result = run_setup(&mut overlay, &dkg_config, &mut rng, |m| m, Some).await;
            (overlay.index(), result)
        }));
    }
    for handle in handles {
        let (index, result) = handle.await.map_err(|e| CothorityError::internal(e.to_string()))?;
        let secret = result?;
        save_node_shared_secret(storage_dir, index, &secret)?;
    }

    let (packages, pubkey_package) = generate_signing_keys(nodes, threshold as u16, &mut OsRng)?;
    save_frost_keys(storage_dir, &packages, &pubkey_package)?;

    for (i, key) in keys.iter().enumerate() {
        save_node_signing_key(storage_dir, NodeIndex(i as u16), key)?;
    }

    RunConfig::new(roster).save(storage_dir)?;

    let mut chain = FileChainStore::open(storage_dir.join("chain.jsonl"))?;
    if chain.is_empty() {
        chain.genesis_create(cothority_chain::encode_payload(&[])?)?;
    }

    info!(storage_dir = %storage_dir.display(), "skipstart complete");
    Ok(())
}
