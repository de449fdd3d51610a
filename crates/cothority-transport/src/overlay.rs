//! Point-to-point and broadcast delivery over a derived [`Tree`].
//!
//! `spec.md` §4.1 guarantees: per-channel FIFO between two tree nodes
//! within one protocol instance, no assumed ordering between siblings,
//! and delivery failure surfaced as a per-recipient error with no retry.
//! `register_handler(kind, fn)` from the same section degenerates, in this
//! implementation, to each protocol matching on its own message enum after
//! `recv()`.

use crate::tree::Tree;
use async_trait::async_trait;
use cothority_core::{CothorityError, NodeIndex, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One message in flight between two overlay participants.
#[derive(Debug, Clone)]
pub struct Envelope<M> {
    pub from: NodeIndex,
    pub payload: M,
}

/// Delivery contract every protocol (DKG, structured/unstructured
/// consensus, threshold decrypt) is driven over.
#[async_trait]
pub trait TreeOverlay<M: Clone + Send + Sync + 'static>: Send + Sync {
    fn index(&self) -> NodeIndex;
    fn is_root(&self) -> bool;
    fn is_leaf(&self) -> bool;
    fn children(&self) -> &[NodeIndex];
    fn parent(&self) -> Option<NodeIndex>;

    /// Multicast to every child; each recipient's delivery result is
    /// returned independently (no retry, no aggregate failure).
    async fn send_to_children(&self, msg: M) -> Vec<(NodeIndex, Result<()>)>;

    /// Reply to the parent. Only valid for a non-root node.
    async fn send_to_parent(&self, msg: M) -> Result<()>;

    /// Deliver to every other node in the roster, bypassing tree shape
    /// (used by the root to publish `CompleteProofs` after Structured
    /// Consensus finalizes, `spec.md` §4.5 "Root finalization").
    async fn broadcast(&self, msg: M) -> Vec<(NodeIndex, Result<()>)>;

    /// Pull the next inbound message for this node, if any has arrived.
    async fn recv(&mut self) -> Option<Envelope<M>>;
}

/// In-process loopback overlay for tests and the `skipstart` single-process
/// demo mode. One [`LoopbackOverlay`] handle exists per node; all handles
/// share an `Arc`-ed routing table of per-node inboxes.
pub struct LoopbackOverlay<M> {
    self_index: NodeIndex,
    tree: Arc<Tree>,
    all_indices: Arc<Vec<NodeIndex>>,
    senders: Arc<HashMap<NodeIndex, mpsc::UnboundedSender<Envelope<M>>>>,
    inbox: mpsc::UnboundedReceiver<Envelope<M>>,
}

impl<M: Clone + Send + Sync + 'static> LoopbackOverlay<M> {
    /// Build one overlay handle per roster node, wired to the same [`Tree`].
    pub fn build_network(tree: Tree, all_indices: Vec<NodeIndex>) -> Vec<Self> {
        let tree = Arc::new(tree);
        let all_indices = Arc::new(all_indices);
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for idx in all_indices.iter() {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(*idx, tx);
            receivers.insert(*idx, rx);
        }
        let senders = Arc::new(senders);
        all_indices
            .iter()
            .map(|idx| Self {
                self_index: *idx,
                tree: tree.clone(),
                all_indices: all_indices.clone(),
                senders: senders.clone(),
                inbox: receivers.remove(idx).expect("inbox created above"),
            })
            .collect()
    }

    fn deliver(&self, to: NodeIndex, msg: M) -> Result<()> {
        self.senders
            .get(&to)
            .ok_or_else(|| CothorityError::network(format!("unknown recipient {to}")))?
            .send(Envelope {
                from: self.self_index,
                payload: msg,
            })
            .map_err(|_| CothorityError::network(format!("recipient {to} inbox closed")))
    }
}

#[async_trait]
impl<M: Clone + Send + Sync + 'static> TreeOverlay<M> for LoopbackOverlay<M> {
    fn index(&self) -> NodeIndex {
        self.self_index
    }

    fn is_root(&self) -> bool {
        self.tree.is_root(self.self_index)
    }

    fn is_leaf(&self) -> bool {
        self.tree.is_leaf(self.self_index)
    }

    fn children(&self) -> &[NodeIndex] {
        &self.tree.node(self.self_index).children
    }

    fn parent(&self) -> Option<NodeIndex> {
        self.tree.node(self.self_index).parent
    }

    async fn send_to_children(&self, msg: M) -> Vec<(NodeIndex, Result<()>)> {
        self.children()
            .iter()
            .map(|child| (*child, self.deliver(*child, msg.clone())))
            .collect()
    }

    async fn send_to_parent(&self, msg: M) -> Result<()> {
        let parent = self
            .parent()
            .ok_or_else(|| CothorityError::invalid("root has no parent to reply to"))?;
        self.deliver(parent, msg)
    }

    async fn broadcast(&self, msg: M) -> Vec<(NodeIndex, Result<()>)> {
        self.all_indices
            .iter()
            .filter(|idx| **idx != self.self_index)
            .map(|idx| (*idx, self.deliver(*idx, msg.clone())))
            .collect()
    }

    async fn recv(&mut self) -> Option<Envelope<M>> {
        self.inbox.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;
    use cothority_core::{NodeIdentity, PublicKeyHex, Roster};

    fn roster(n: u16) -> Roster {
        let nodes = (0..n)
            .map(|i| {
                NodeIdentity::new(
                    NodeIndex(i),
                    format!("node{i}:7000"),
                    PublicKeyHex::from_bytes(&[i as u8; 32]),
                )
            })
            .collect();
        Roster::new(nodes)
    }

    #[tokio::test]
    async fn parent_receives_child_reply() {
        let r = roster(3);
        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|n| n.index).collect();
        let mut overlays = LoopbackOverlay::<String>::build_network(tree, indices);
        let mut root = overlays.remove(0);
        let child = overlays.remove(0);

        child.send_to_parent("hello".to_string()).await.unwrap();
        let envelope = root.recv().await.unwrap();
        assert_eq!(envelope.from, child.index());
        assert_eq!(envelope.payload, "hello");
    }

    #[tokio::test]
    async fn broadcast_reaches_every_other_node() {
        let r = roster(4);
        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|n| n.index).collect();
        let mut overlays = LoopbackOverlay::<u32>::build_network(tree, indices);
        let root = overlays.remove(0);
        let results = root.broadcast(42).await;
        assert_eq!(results.len(), 3);
        for (_, res) in &results {
            assert!(res.is_ok());
        }
        for mut overlay in overlays {
            let envelope = overlay.recv().await.unwrap();
            assert_eq!(envelope.payload, 42);
        }
    }

    #[tokio::test]
    async fn send_to_unknown_recipient_is_a_network_error() {
        let r = roster(2);
        let tree = Tree::derive_star(&r, NodeIndex(0));
        let indices: Vec<NodeIndex> = r.nodes().iter().map(|n| n.index).collect();
        let overlays = LoopbackOverlay::<u8>::build_network(tree, indices);
        let root = &overlays[0];
        let err = root.deliver(NodeIndex(99), 1).unwrap_err();
        assert_eq!(err.category(), "network");
    }
}
