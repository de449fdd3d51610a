//! Append-only "skipchain" block store.
//!
//! `spec.md` §1 treats the skipchain as an external, "presumed available"
//! collaborator offering genesis-create, append-block, and walk-backward
//! operations; the block's payload is opaque to the core. This module is
//! the minimal reference implementation of that collaborator: one
//! file-backed chain of `gzip(json(Vec<Webstore>))` blocks linked by the
//! hash of the previous block's payload.

use cothority_core::{hash, CothorityError, Hash32, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::webstore::Webstore;

/// One block. Opaque to the rest of the core beyond `(index, back_link,
/// payload)` (`spec.md` §3 "Block").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub back_link: Option<Hash32>,
    pub payload: Vec<u8>,
}

impl Block {
    fn link_hash(&self) -> Hash32 {
        hash(&self.payload)
    }
}

/// gzip-compress a JSON array of [`Webstore`] into one block payload.
pub fn encode_payload(records: &[Webstore]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(records)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Inverse of [`encode_payload`].
pub fn decode_payload(bytes: &[u8]) -> Result<Vec<Webstore>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

/// File-backed append-only chain: one JSON [`Block`] per line.
pub struct FileChainStore {
    path: PathBuf,
    blocks: Vec<Block>,
}

impl FileChainStore {
    /// Open an existing chain file, or start empty if none exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let blocks = if path.exists() {
            Self::load(&path)?
        } else {
            Vec::new()
        };
        Ok(Self { path, blocks })
    }

    fn load(path: &Path) -> Result<Vec<Block>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(CothorityError::from))
            .collect()
    }

    fn persist_append(&self, block: &Block) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(block)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Create the genesis block (`spec.md` §1 "genesis-create").
    pub fn genesis_create(&mut self, payload: Vec<u8>) -> Result<&Block> {
        if !self.blocks.is_empty() {
            return Err(CothorityError::invalid("chain already has a genesis block"));
        }
        let block = Block {
            index: 0,
            back_link: None,
            payload,
        };
        self.persist_append(&block)?;
        self.blocks.push(block);
        Ok(self.blocks.last().expect("just pushed"))
    }

    /// Append one block on top of the current tip (`spec.md` §1
    /// "append-block").
    pub fn append_block(&mut self, payload: Vec<u8>) -> Result<&Block> {
        let tip = self
            .blocks
            .last()
            .ok_or_else(|| CothorityError::invalid("chain has no genesis block yet"))?;
        let block = Block {
            index: tip.index + 1,
            back_link: Some(tip.link_hash()),
            payload,
        };
        self.persist_append(&block)?;
        self.blocks.push(block);
        Ok(self.blocks.last().expect("just pushed"))
    }

    /// Walk from the tip backward to genesis (`spec.md` §1
    /// "walk-backward", §4.9 "Retrieval").
    pub fn walk_backward(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        std::env::temp_dir().join(format!(
            "cothority-chain-test-{label}-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }

    #[test]
    fn payload_round_trips_through_gzip() {
        let records = vec![];
        let payload = encode_payload(&records).unwrap();
        assert_eq!(decode_payload(&payload).unwrap(), records);
    }

    #[test]
    fn append_links_to_previous_block() {
        let path = temp_path("append");
        let mut chain = FileChainStore::open(&path).unwrap();
        chain.genesis_create(b"genesis".to_vec()).unwrap();
        chain.append_block(b"second".to_vec()).unwrap();
        let blocks: Vec<&Block> = chain.walk_backward().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index, 1);
        assert_eq!(blocks[0].back_link, Some(hash(b"genesis")));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn append_without_genesis_fails() {
        let path = temp_path("no-genesis");
        let mut chain = FileChainStore::open(&path).unwrap();
        assert!(chain.append_block(b"x".to_vec()).is_err());
    }

    #[test]
    fn reopening_replays_persisted_blocks() {
        let path = temp_path("reopen");
        {
            let mut chain = FileChainStore::open(&path).unwrap();
            chain.genesis_create(b"genesis".to_vec()).unwrap();
            chain.append_block(b"second".to_vec()).unwrap();
        }
        let chain = FileChainStore::open(&path).unwrap();
        assert_eq!(chain.len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
