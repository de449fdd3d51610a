//! # cothority-sign
//!
//! The collective signer: trusted-dealer FROST key generation (`keygen`),
//! wire messages for one signing round (`messages`), and the async
//! orchestration of that round over a tree overlay (`ceremony`).

#![forbid(unsafe_code)]

pub mod ceremony;
pub mod keygen;
pub mod messages;

pub use ceremony::run_collective_sign;
pub use keygen::{generate_signing_keys, identifier_to_u16, u16_to_identifier};
pub use messages::SignMessage;
