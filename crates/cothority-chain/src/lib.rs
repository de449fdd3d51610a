//! # cothority-chain
//!
//! Reference implementation of the "presumed available" append-only
//! skipchain collaborator (`spec.md` §1): [`Block`]s of
//! `gzip(json(Vec<Webstore>))`, genesis/append/walk-backward operations
//! (`block`), the sealed [`Webstore`] artifact type (`webstore`), and the
//! `spec.md` §4.9 retrieval walk (`retrieval`).

#![forbid(unsafe_code)]

pub mod block;
pub mod retrieval;
pub mod webstore;

pub use block::{decode_payload, encode_payload, Block, FileChainStore};
pub use retrieval::{retrieve, SignatureVerifier};
pub use webstore::Webstore;
