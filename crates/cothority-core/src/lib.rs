//! # cothority-core
//!
//! Foundation types shared by every crate in the archive cothority: node
//! identities and rosters, the unified error type, content-addressing
//! hashes, wire timestamps, and run/node configuration.
//!
//! This crate has no dependency on any other `cothority-*` crate and
//! contains no protocol logic — it is the foundation layer everything else
//! builds on.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod hash;
pub mod identifiers;
pub mod time;

pub use errors::{CothorityError, ErrorList, RecordedError, Result};
pub use hash::{hash, hasher, domain_hash, Hash32};
pub use identifiers::{NodeIdentity, NodeIndex, PublicKeyHex, Roster};
