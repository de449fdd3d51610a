//! # cothority-html
//!
//! Reference shapes for the two external collaborators `spec.md` §1 treats
//! as "presumed available": the HTTP fetcher ([`fetch::Fetcher`]) and the
//! HTML parser/renderer ([`leaf::HtmlDocument`], [`parser::HtmlParser`]).
//! A deployment may swap either for a production-grade implementation
//! without touching the consensus pipeline, which only depends on these
//! trait boundaries.

#![forbid(unsafe_code)]

pub mod fetch;
pub mod leaf;
pub mod parser;

pub use fetch::{HttpFetcher, StaticFetcher};
pub use leaf::{HtmlDocument, HtmlNode};
pub use parser::{FetchedBody, Fetcher, HtmlParser, MinimalHtmlParser};
