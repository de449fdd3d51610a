//! `retrieve`: walk the chain for the latest signed record as of a
//! timestamp and verify its collective signature (`spec.md` §4.9).

use crate::config::RunConfig;
use chrono::Utc;
use cothority_chain::{retrieve as chain_retrieve, FileChainStore, SignatureVerifier};
use cothority_core::time::parse_wire_timestamp;
use cothority_core::{NodeIdentity, Result};
use frost_ed25519::keys::PublicKeyPackage;
use std::path::Path;

struct FrostVerifier {
    public_key_package: PublicKeyPackage,
}

impl SignatureVerifier for FrostVerifier {
    fn verify_collective(&self, payload: &[u8], signature: &[u8], _roster: &[NodeIdentity]) -> bool {
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(sig) = frost_ed25519::Signature::deserialize(sig_bytes) else {
            return false;
        };
        self.public_key_package.verifying_key().verify(payload, &sig).is_ok()
    }
}

pub fn run(storage_dir: &Path, url: &str, timestamp: Option<&str>) -> Result<()> {
    let run_config = RunConfig::load(storage_dir)?;
    let public_key_package = crate::config::load_frost_public_key_package(storage_dir)?;
    let requested = match timestamp {
        Some(t) => parse_wire_timestamp(t)?,
        None => Utc::now(),
    };

    let chain = FileChainStore::open(storage_dir.join("chain.jsonl"))?;
    let verifier = FrostVerifier { public_key_package };
    let record = chain_retrieve(&chain, url, requested, run_config.roster.nodes(), &verifier)?;
    let payload = record.payload()?;

    println!("url: {}", record.url);
    println!("content-type: {}", record.content_type);
    println!("timestamp: {}", record.timestamp);
    println!("sub-resources: {}", record.adds_url.join(", "));
    println!("--- payload ({} bytes) ---", payload.len());
    println!("{}", String::from_utf8_lossy(&payload));
    Ok(())
}
