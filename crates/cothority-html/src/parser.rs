//! Reference fetcher/parser collaborators.
//!
//! `spec.md` §1 treats the HTTP fetcher and the HTML parser as external,
//! "presumed available" collaborators the core only consumes through a
//! trait boundary. This module supplies one minimal, real implementation of
//! each so the CLI binary is runnable end-to-end; a deployment is free to
//! swap in a real browser-grade parser or fetcher behind the same traits.

use crate::leaf::{HtmlDocument, HtmlNode};
use async_trait::async_trait;
use cothority_core::{CothorityError, Result};

/// Blocking-GET-shaped fetch boundary (`spec.md` §1: "presumed blocking GET
/// returning body + content-type").
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedBody>;
}

pub struct FetchedBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Parses fetched bytes into a document tree (`spec.md` §1: "the HTML
/// parser/renderer (presumed available)").
pub trait HtmlParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<HtmlDocument>;
}

/// A tiny, tolerant recursive-descent parser: enough structure to exercise
/// Structured Consensus end to end (tags, attributes, nested elements,
/// text), without the error-recovery machinery a browser-grade parser
/// carries. Self-closing void elements are not special-cased; the test
/// fixtures this workspace targets always close their tags explicitly.
#[derive(Debug, Default)]
pub struct MinimalHtmlParser;

impl HtmlParser for MinimalHtmlParser {
    fn parse(&self, bytes: &[u8]) -> Result<HtmlDocument> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CothorityError::invalid(format!("document is not valid utf-8: {e}")))?;
        let mut cursor = Cursor { input: text, pos: 0 };
        let root = cursor.parse_element()?;
        Ok(HtmlDocument::new(root))
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn parse_element(&mut self) -> Result<HtmlNode> {
        self.skip_whitespace();
        if !self.rest().starts_with('<') {
            return Err(CothorityError::invalid("expected '<' at start of element"));
        }
        let close_angle = self.rest().find('>').ok_or_else(|| {
            CothorityError::invalid("unterminated tag: missing '>'")
        })?;
        let tag_source = &self.rest()[1..close_angle];
        let (tag, attrs) = parse_tag(tag_source);
        self.pos += close_angle + 1;

        let closing = format!("</{tag}>");
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            if self.rest().starts_with(&closing) {
                self.pos += closing.len();
                break;
            }
            if self.rest().is_empty() {
                return Err(CothorityError::invalid(format!(
                    "unterminated element <{tag}>: missing {closing}"
                )));
            }
            if self.rest().starts_with('<') {
                children.push(self.parse_element()?);
            } else {
                let next_tag = self.rest().find('<').unwrap_or(self.rest().len());
                let text = &self.rest()[..next_tag];
                self.pos += next_tag;
                if !text.trim().is_empty() {
                    children.push(HtmlNode::text(text));
                }
            }
        }

        Ok(HtmlNode {
            tag,
            attrs,
            children,
            text: None,
        })
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }
}

fn parse_tag(source: &str) -> (String, Vec<(String, String)>) {
    let mut parts = source.split_whitespace();
    let tag = parts.next().unwrap_or_default().to_string();
    let mut attrs = Vec::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            attrs.push((key.to_string(), value.trim_matches('"').to_string()));
        }
    }
    (tag, attrs)
}
