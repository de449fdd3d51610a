//! Retrieval: walk the chain backward for the latest signed artifact as of
//! a timestamp (`spec.md` §4.9).

use crate::block::{decode_payload, FileChainStore};
use crate::webstore::Webstore;
use chrono::{DateTime, Utc};
use cothority_core::{CothorityError, NodeIdentity, Result};

/// Verify `signature` over `payload` under any of the roster's public keys.
/// The core's Schnorr verifier lives in `cothority-crypto`; retrieval only
/// needs the boundary, so it is injected rather than imported directly
/// (keeps this crate free of a dependency on the group implementation).
pub trait SignatureVerifier {
    fn verify_collective(&self, payload: &[u8], signature: &[u8], roster: &[NodeIdentity]) -> bool;
}

/// `spec.md` §4.9: start at the latest block, walk backward; return the
/// first `Webstore` whose url matches and whose timestamp is `<= requested`
/// and whose signature validates. "not found" otherwise.
pub fn retrieve(
    chain: &FileChainStore,
    url: &str,
    requested: DateTime<Utc>,
    roster: &[NodeIdentity],
    verifier: &dyn SignatureVerifier,
) -> Result<Webstore> {
    for block in chain.walk_backward() {
        let records = decode_payload(&block.payload)?;
        for record in &records {
            if record.url != url {
                continue;
            }
            let Ok(ts) = record.timestamp_utc() else {
                continue;
            };
            if ts > requested {
                continue;
            }
            let payload = record.payload()?;
            if verifier.verify_collective(&payload, &record.signature, roster) {
                return Ok(record.clone());
            }
        }
    }
    Err(CothorityError::not_found(format!(
        "no Webstore found for {url} as of {requested}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::encode_payload;
    use chrono::TimeZone;
    use cothority_core::PublicKeyHex;

    struct AlwaysValid;
    impl SignatureVerifier for AlwaysValid {
        fn verify_collective(&self, _payload: &[u8], _signature: &[u8], _roster: &[NodeIdentity]) -> bool {
            true
        }
    }

    struct NeverValid;
    impl SignatureVerifier for NeverValid {
        fn verify_collective(&self, _payload: &[u8], _signature: &[u8], _roster: &[NodeIdentity]) -> bool {
            false
        }
    }

    fn temp_path(label: &str) -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        std::env::temp_dir().join(format!(
            "cothority-chain-retrieval-{label}-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }

    fn roster() -> Vec<NodeIdentity> {
        vec![NodeIdentity::new(
            cothority_core::NodeIndex(0),
            "node0:7000",
            PublicKeyHex::from_bytes(&[1; 32]),
        )]
    }

    #[test]
    fn retrieves_record_at_or_before_requested_time() {
        let path = temp_path("s6");
        let mut chain = FileChainStore::open(&path).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let record1 = Webstore::new("http://x/", "text/html", b"first", vec![], vec![], t1);
        let record2 = Webstore::new("http://x/", "text/html", b"second", vec![], vec![], t2);
        chain
            .genesis_create(encode_payload(&[record1.clone()]).unwrap())
            .unwrap();
        chain
            .append_block(encode_payload(&[record2.clone()]).unwrap())
            .unwrap();

        let found = retrieve(
            &chain,
            "http://x/",
            t1 + chrono::Duration::seconds(30),
            &roster(),
            &AlwaysValid,
        )
        .unwrap();
        assert_eq!(found.payload().unwrap(), b"first");

        let found = retrieve(
            &chain,
            "http://x/",
            t2 + chrono::Duration::seconds(30),
            &roster(),
            &AlwaysValid,
        )
        .unwrap();
        assert_eq!(found.payload().unwrap(), b"second");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_records_with_invalid_signatures() {
        let path = temp_path("invalid-sig");
        let mut chain = FileChainStore::open(&path).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let record = Webstore::new("http://x/", "text/html", b"body", vec![], vec![], t1);
        chain
            .genesis_create(encode_payload(&[record]).unwrap())
            .unwrap();

        let err = retrieve(
            &chain,
            "http://x/",
            t1 + chrono::Duration::seconds(30),
            &roster(),
            &NeverValid,
        )
        .unwrap_err();
        assert_eq!(err.category(), "not_found");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_url_is_not_found() {
        let path = temp_path("missing");
        let chain = FileChainStore::open(&path).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(retrieve(&chain, "http://nowhere/", now, &roster(), &AlwaysValid).is_err());
    }
}
