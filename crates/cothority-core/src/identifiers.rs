//! Roster and node identity types.
//!
//! A [`Roster`] is immutable for the duration of one run and is the single
//! source of truth both for tree derivation (`cothority-transport`) and for
//! indexing per-node protocol state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable position of a node within a [`Roster`].
///
/// Distinct from the node's long-term public key: the index is only
/// meaningful relative to one roster snapshot and is what Shamir share
/// indices and Lagrange coefficients are computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub u16);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A node's long-term public key, encoded as lowercase hex of its
/// compressed Ristretto255 point. Canonical per `spec.md` §9's "Design
/// Notes" ("canonicalize the key as the lowercase hex of the compressed
/// public-key encoding"), so `CompleteProofs` maps never need a custom
/// comparator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKeyHex(String);

impl PublicKeyHex {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKeyHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Long-term identity of one node: its address and its long-term signing
/// public key (stable across runs; owned by the roster, not by any one
/// protocol instance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub index: NodeIndex,
    pub address: String,
    pub public_key: PublicKeyHex,
}

impl NodeIdentity {
    pub fn new(index: NodeIndex, address: impl Into<String>, public_key: PublicKeyHex) -> Self {
        Self {
            index,
            address: address.into(),
            public_key,
        }
    }
}

/// Ordered, immutable set of node identities participating in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    nodes: Vec<NodeIdentity>,
}

impl Roster {
    /// Build a roster, re-indexing nodes by their position in `nodes`.
    pub fn new(mut nodes: Vec<NodeIdentity>) -> Self {
        for (i, node) in nodes.iter_mut().enumerate() {
            node.index = NodeIndex(i as u16);
        }
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeIdentity] {
        &self.nodes
    }

    pub fn get(&self, index: NodeIndex) -> Option<&NodeIdentity> {
        self.nodes.get(index.0 as usize)
    }

    pub fn root(&self) -> Option<&NodeIdentity> {
        self.nodes.first()
    }

    /// `T = N - floor((N-1)/3)`, the minimum number of honest contributions
    /// required for any consensus step (`spec.md` §2, GLOSSARY "Threshold T").
    pub fn threshold(&self) -> usize {
        let n = self.nodes.len();
        if n == 0 {
            return 0;
        }
        n - (n - 1) / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: u16) -> Roster {
        let nodes = (0..n)
            .map(|i| {
                NodeIdentity::new(
                    NodeIndex(i),
                    format!("node{i}.example:7000"),
                    PublicKeyHex::from_bytes(&[i as u8; 32]),
                )
            })
            .collect();
        Roster::new(nodes)
    }

    #[test]
    fn threshold_matches_spec_formula() {
        assert_eq!(roster(1).threshold(), 1);
        assert_eq!(roster(3).threshold(), 3);
        assert_eq!(roster(4).threshold(), 3);
        assert_eq!(roster(5).threshold(), 4);
        assert_eq!(roster(7).threshold(), 5);
    }

    #[test]
    fn roster_reindexes_on_construction() {
        let r = roster(3);
        for (i, node) in r.nodes().iter().enumerate() {
            assert_eq!(node.index, NodeIndex(i as u16));
        }
    }

    #[test]
    fn public_key_hex_is_lowercase() {
        let key = PublicKeyHex::from_bytes(&[0xAB, 0xCD]);
        assert_eq!(key.as_str(), "abcd");
    }
}
