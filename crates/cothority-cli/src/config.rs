//! Run-wide parameters and per-node key persistence for the single-process
//! `skipstart` demo federation (`spec.md` §3 "RunConfig"/"NodeConfig").
//!
//! A real deployment would run one OS process per node talking over a
//! `TcpOverlay`; this workspace only implements `LoopbackOverlay`
//! (`spec.md` §4.1 "in-process loopback... for the single-process demo
//! mode"), so `skipstart` bootstraps the whole roster inside one process
//! and persists every node's keys under its own subdirectory so `save` and
//! `retrieve` can be invoked as separate process runs against the same
//! state.

use cothority_core::config::DEFAULT_PROTOCOL_TIMEOUT;
use cothority_core::{CothorityError, NodeIndex, Result, Roster};
use cothority_crypto::group::{point_from_bytes, point_to_bytes};
use cothority_crypto::{Scalar, SigningKey, DEFAULT_FALSE_POSITIVE_RATE};
use cothority_dkg::{FileSecretStore, SharedSecret, SharedSecretStore, MAIN_KEY};
use frost_ed25519::keys::{KeyPackage, PublicKeyPackage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted at `<storage_dir>/run.toml` by `skipstart`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub cbf_false_positive_rate: f64,
    pub collection_timeout_secs: u64,
    // Scalars must precede nested tables in a TOML document; keep the
    // roster (the only nested table) last.
    pub roster: Roster,
}

impl RunConfig {
    pub fn new(roster: Roster) -> Self {
        Self {
            cbf_false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            collection_timeout_secs: DEFAULT_PROTOCOL_TIMEOUT.as_secs(),
            roster,
        }
    }

    pub fn load(storage_dir: &Path) -> Result<Self> {
        let bytes = std::fs::read_to_string(run_config_path(storage_dir))?;
        toml::from_str(&bytes).map_err(|e| CothorityError::serialization(format!("bad run.toml: {e}")))
    }

    pub fn save(&self, storage_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(storage_dir)?;
        let text = toml::to_string_pretty(self)
            .map_err(|e| CothorityError::serialization(format!("cannot encode run.toml: {e}")))?;
        std::fs::write(run_config_path(storage_dir), text)?;
        Ok(())
    }
}

fn run_config_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join("run.toml")
}

fn node_dir(storage_dir: &Path, index: NodeIndex) -> PathBuf {
    storage_dir.join(format!("node-{}", index.0))
}

fn frost_dir(storage_dir: &Path) -> PathBuf {
    storage_dir.join("frost")
}

pub fn save_node_signing_key(storage_dir: &Path, index: NodeIndex, key: &SigningKey) -> Result<()> {
    let dir = node_dir(storage_dir, index);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("signing.key"), key.secret_bytes())?;
    Ok(())
}

pub fn load_node_signing_key(storage_dir: &Path, index: NodeIndex) -> Result<SigningKey> {
    let bytes = std::fs::read(node_dir(storage_dir, index).join("signing.key"))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CothorityError::invalid("signing key file is not 32 bytes"))?;
    let secret: Scalar = Option::from(Scalar::from_canonical_bytes(arr))
        .ok_or_else(|| CothorityError::invalid("signing key file is not a canonical scalar"))?;
    Ok(SigningKey::from_secret(secret))
}

pub fn save_node_shared_secret(storage_dir: &Path, index: NodeIndex, secret: &SharedSecret) -> Result<()> {
    FileSecretStore::new(node_dir(storage_dir, index)).put(MAIN_KEY, secret)
}

pub fn load_node_shared_secret(storage_dir: &Path, index: NodeIndex) -> Result<SharedSecret> {
    FileSecretStore::new(node_dir(storage_dir, index)).get(MAIN_KEY)
}

pub fn save_frost_keys(
    storage_dir: &Path,
    packages: &std::collections::BTreeMap<u16, KeyPackage>,
    pubkey_package: &PublicKeyPackage,
) -> Result<()> {
    let dir = frost_dir(storage_dir);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        dir.join("pubkey_package.json"),
        serde_json::to_vec_pretty(pubkey_package)?,
    )?;
    for (signer, package) in packages {
        std::fs::write(dir.join(format!("key-{signer}.json")), serde_json::to_vec_pretty(package)?)?;
    }
    Ok(())
}

pub fn load_frost_public_key_package(storage_dir: &Path) -> Result<PublicKeyPackage> {
    let bytes = std::fs::read(frost_dir(storage_dir).join("pubkey_package.json"))?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn load_frost_key_package(storage_dir: &Path, signer: u16) -> Result<KeyPackage> {
    let bytes = std::fs::read(frost_dir(storage_dir).join(format!("key-{signer}.json")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Rebuild a [`cothority_crypto::Point`] from a roster entry's stored hex
/// public key, for handing node identities back into protocol configs.
pub fn point_of(hex_key: &str) -> Result<cothority_crypto::Point> {
    let bytes = hex::decode(hex_key)?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CothorityError::invalid("public key is not 32 bytes"))?;
    point_from_bytes(&arr).ok_or_else(|| CothorityError::invalid("public key is not a valid curve point"))
}

pub fn public_key_bytes(key: &SigningKey) -> [u8; 32] {
    point_to_bytes(&key.public)
}
