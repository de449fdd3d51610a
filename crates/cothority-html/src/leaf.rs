//! The HTML document tree consensus and reconstruction operate over.
//!
//! `spec.md` §1 lists the HTML parser/renderer as a "presumed available"
//! external collaborator; this module is the minimal reference shape that
//! collaborator must produce, plus the tree-walking operations Structured
//! Consensus and Reconstruction actually need: enumerating leaves in a
//! stable order, and rendering a pruned tree back to bytes.

use serde::{Deserialize, Serialize};

/// One node of a parsed HTML document. A leaf is any node with no children;
/// its `text` is the canonical byte string `spec.md` §4.3 "Domain" inserts
/// into the counting Bloom filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
    pub text: Option<String>,
}

impl HtmlNode {
    pub fn element(tag: impl Into<String>, children: Vec<HtmlNode>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children,
            text: None,
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            tag: String::from("#text"),
            attrs: Vec::new(),
            children: Vec::new(),
            text: Some(body.into()),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The canonical byte string inserted into the CBF: a leaf's trimmed
    /// text, or its bare tag name for an empty element (`<img>`, `<br>`).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match &self.text {
            Some(text) => text.trim().as_bytes().to_vec(),
            None => self.tag.as_bytes().to_vec(),
        }
    }

    fn render(&self, out: &mut String) {
        if self.tag == "#text" {
            out.push_str(self.text.as_deref().unwrap_or(""));
            return;
        }
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
        out.push('>');
        for child in &self.children {
            child.render(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// A parsed document: a single root node (conventionally `<html>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlDocument {
    pub root: HtmlNode,
}

impl HtmlDocument {
    pub fn new(root: HtmlNode) -> Self {
        Self { root }
    }

    /// Every leaf in the document, in stable depth-first order. Duplicate
    /// canonical byte strings within one document are deduplicated by the
    /// caller before CBF insertion (`spec.md` §4.3 "Domain").
    pub fn leaves(&self) -> Vec<&HtmlNode> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut out);
        out
    }

    /// Render the document back to bytes (`spec.md` §4.8 "render the pruned
    /// tree to bytes").
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        self.root.render(&mut out);
        out.into_bytes()
    }

    /// Depth-first walk that detaches any leaf whose `count(leaf)` is
    /// strictly below `threshold` (`spec.md` §4.8 "Procedure").
    pub fn prune_below_threshold(&mut self, threshold: u64, count: impl Fn(&[u8]) -> u64) {
        prune_node(&mut self.root, threshold, &count);
    }
}

fn collect_leaves<'a>(node: &'a HtmlNode, out: &mut Vec<&'a HtmlNode>) {
    if node.is_leaf() {
        out.push(node);
        return;
    }
    for child in &node.children {
        collect_leaves(child, out);
    }
}

fn prune_node(node: &mut HtmlNode, threshold: u64, count: &impl Fn(&[u8]) -> u64) {
    node.children.retain_mut(|child| {
        if child.is_leaf() {
            count(&child.canonical_bytes()) >= threshold
        } else {
            prune_node(child, threshold, count);
            !child.children.is_empty()
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HtmlDocument {
        HtmlDocument::new(HtmlNode::element(
            "html",
            vec![HtmlNode::element(
                "body",
                vec![HtmlNode::text("hello"), HtmlNode::text("evil")],
            )],
        ))
    }

    #[test]
    fn leaves_are_collected_depth_first() {
        let doc = sample();
        let leaves: Vec<&str> = doc
            .leaves()
            .iter()
            .map(|n| n.text.as_deref().unwrap())
            .collect();
        assert_eq!(leaves, vec!["hello", "evil"]);
    }

    #[test]
    fn pruning_removes_under_threshold_leaves_only() {
        let mut doc = sample();
        doc.prune_below_threshold(3, |bytes| if bytes == b"hello" { 3 } else { 1 });
        let leaves = doc.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn render_round_trips_simple_document() {
        let doc = HtmlDocument::new(HtmlNode::element(
            "html",
            vec![HtmlNode::element("body", vec![HtmlNode::text("hello")])],
        ));
        assert_eq!(doc.render(), b"<html><body>hello</body></html>");
    }
}
