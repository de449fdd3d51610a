//! Rooted n-ary tree derivation over a [`Roster`].
//!
//! `spec.md` §4.1: "Given a Roster and a root node, derive a rooted n-ary
//! tree for a given run (fan-out = N gives a star by default)."

use cothority_core::{NodeIndex, Roster};
use serde::{Deserialize, Serialize};

/// One node's position within a derived tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub index: NodeIndex,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
}

/// A rooted n-ary tree over every node in a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    root: NodeIndex,
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Derive a tree with the given `fan_out` (children per internal node).
    /// `fan_out = roster.len() - 1` (the default) produces a star with
    /// `root` at the center.
    pub fn derive(roster: &Roster, root: NodeIndex, fan_out: usize) -> Self {
        let n = roster.len();
        let fan_out = fan_out.max(1);

        // Breadth-first layout of every index other than `root`, starting
        // from `root` itself as the single root of level 0.
        let mut order: Vec<NodeIndex> = roster
            .nodes()
            .iter()
            .map(|node| node.index)
            .filter(|idx| *idx != root)
            .collect();
        order.sort_by_key(|idx| idx.0);

        let mut nodes: Vec<TreeNode> = roster
            .nodes()
            .iter()
            .map(|node| TreeNode {
                index: node.index,
                parent: None,
                children: Vec::new(),
            })
            .collect();

        // BFS queue of parents still accepting children, starting at root.
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(root);
        let mut remaining = order.into_iter();

        'outer: while let Some(parent_idx) = queue.front().copied() {
            let parent_slot = parent_idx.0 as usize;
            while nodes[parent_slot].children.len() < fan_out {
                let Some(child) = remaining.next() else {
                    break 'outer;
                };
                nodes[parent_slot].children.push(child);
                nodes[child.0 as usize].parent = Some(parent_idx);
                queue.push_back(child);
            }
            queue.pop_front();
        }

        debug_assert_eq!(nodes.len(), n);
        Self { root, nodes }
    }

    /// Derive the default star topology (`fan_out = N - 1`).
    pub fn derive_star(roster: &Roster, root: NodeIndex) -> Self {
        Self::derive(roster, root, roster.len().saturating_sub(1))
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.0 as usize]
    }

    pub fn is_root(&self, index: NodeIndex) -> bool {
        index == self.root
    }

    pub fn is_leaf(&self, index: NodeIndex) -> bool {
        self.node(index).children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothority_core::{NodeIdentity, PublicKeyHex};

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

    #[test]
    fn default_fan_out_produces_a_star() {
        let r = roster(5);
        let tree = Tree::derive_star(&r, NodeIndex(0));
        assert!(tree.is_root(NodeIndex(0)));
        for i in 1..5 {
            assert!(tree.is_leaf(NodeIndex(i)));
            assert_eq!(tree.node(NodeIndex(i)).parent, Some(NodeIndex(0)));
        }
        assert_eq!(tree.node(NodeIndex(0)).children.len(), 4);
    }

    #[test]
    fn limited_fan_out_produces_multiple_levels() {
        let r = roster(7);
        let tree = Tree::derive(&r, NodeIndex(0), 2);
        assert_eq!(tree.node(NodeIndex(0)).children.len(), 2);
        // every non-root node has exactly one parent
        for i in 1..7 {
            assert!(tree.node(NodeIndex(i)).parent.is_some());
        }
    }

    #[test]
    fn every_node_is_reachable_exactly_once() {
        let r = roster(9);
        let tree = Tree::derive(&r, NodeIndex(2), 3);
        let mut seen = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(tree.root());
        seen.insert(tree.root());
        while let Some(idx) = queue.pop_front() {
            for child in &tree.node(idx).children {
                assert!(seen.insert(*child), "node visited twice");
                queue.push_back(*child);
            }
        }
        assert_eq!(seen.len(), 9);
    }
}
