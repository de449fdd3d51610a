//! # cothority-dkg
//!
//! Joint-Feldman distributed key generation: dealer-side polynomial and
//! commitment generation (`dealer`), Feldman share verification
//! (`verifier`), the per-node collection/aggregation state machine
//! (`state_machine`), shared-secret persistence (`storage`), and the async
//! orchestration of one Setup run over a tree overlay (`ceremony`).

#![forbid(unsafe_code)]

pub mod ceremony;
pub mod dealer;
pub mod state_machine;
pub mod storage;
pub mod types;
pub mod verifier;

pub use ceremony::run_setup;
pub use state_machine::{DkgCollectionState, DkgPhase};
pub use storage::{FileSecretStore, MemorySecretStore, SharedSecretStore, MAIN_KEY};
pub use types::{Complaint, DealerPackage, DkgConfig, SharedSecret};
pub use verifier::verify_dealer_package;
