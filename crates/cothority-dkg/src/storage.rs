//! Persistence for the node-local output of Setup.
//!
//! `spec.md` §3/§6: "Per-node: SharedSecret under stable key 'main'." A node
//! only ever runs Setup once per roster generation and reuses the resulting
//! secret across every later consensus round, so this is a tiny key-value
//! store rather than a full database.

use crate::types::SharedSecret;
use cothority_core::{CothorityError, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MAIN_KEY: &str = "main";

/// Storage boundary for [`SharedSecret`] values, implemented in-memory for
/// tests and on the filesystem for the CLI/demo binary.
pub trait SharedSecretStore: Send + Sync {
    fn put(&self, key: &str, secret: &SharedSecret) -> Result<()>;
    fn get(&self, key: &str) -> Result<SharedSecret>;
}

/// Process-local store backed by a mutex-guarded map, used by tests and the
/// in-process `LoopbackOverlay` demo mode.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<std::collections::HashMap<String, SharedSecret>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedSecretStore for MemorySecretStore {
    fn put(&self, key: &str, secret: &SharedSecret) -> Result<()> {
        self.entries
            .lock()
            .expect("secret store mutex poisoned")
            .insert(key.to_string(), secret.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<SharedSecret> {
        self.entries
            .lock()
            .expect("secret store mutex poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| CothorityError::not_found(format!("no shared secret under key {key}")))
    }
}

/// Filesystem store: one JSON file per key under a node's storage directory.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("secret-{key}.json"))
    }
}

impl SharedSecretStore for FileSecretStore {
    fn put(&self, key: &str, secret: &SharedSecret) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let bytes = serde_json::to_vec_pretty(secret)?;
        std::fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<SharedSecret> {
        let path: &Path = &self.path_for(key);
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothority_core::NodeIndex;
    use cothority_crypto::base_point;
    use cothority_crypto::group::random_scalar;
    use rand::rngs::OsRng;

    fn sample_secret() -> SharedSecret {
        let v = random_scalar(&mut OsRng);
        SharedSecret {
            index: NodeIndex(0),
            v,
            x: base_point() * v,
            commits: vec![base_point() * v],
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySecretStore::new();
        let secret = sample_secret();
        store.put(MAIN_KEY, &secret).unwrap();
        assert_eq!(store.get(MAIN_KEY).unwrap(), secret);
    }

    #[test]
    fn memory_store_missing_key_is_not_found() {
        let store = MemorySecretStore::new();
        assert!(store.get(MAIN_KEY).is_err());
    }

    #[test]
    fn file_store_round_trips() {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "cothority-dkg-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let store = FileSecretStore::new(&dir);
        let secret = sample_secret();
        store.put(MAIN_KEY, &secret).unwrap();
        assert_eq!(store.get(MAIN_KEY).unwrap(), secret);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
