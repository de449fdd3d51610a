//! Per-node DKG collection state machine.
//!
//! Each node runs one instance of this state machine: it gathers dealer
//! packages addressed to it, rejects the ones that fail Feldman
//! verification, and aggregates the qualified set into its local
//! [`SharedSecret`] once at least `threshold` dealers have qualified.

use crate::types::{DealerPackage, DkgConfig, SharedSecret};
use crate::verifier::verify_dealer_package;
use cothority_core::{CothorityError, ErrorList, NodeIndex, Result};
use cothority_crypto::Point;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DkgPhase {
    Collecting,
    Aggregated,
}

pub struct DkgCollectionState {
    config: DkgConfig,
    self_index: NodeIndex,
    qualified: BTreeMap<NodeIndex, DealerPackage>,
    errors: ErrorList,
    phase: DkgPhase,
}

impl DkgCollectionState {
    pub fn new(config: DkgConfig, self_index: NodeIndex) -> Self {
        Self {
            config,
            self_index,
            qualified: BTreeMap::new(),
            errors: ErrorList::new(),
            phase: DkgPhase::Collecting,
        }
    }

    pub fn phase(&self) -> DkgPhase {
        self.phase
    }

    pub fn qualified_count(&self) -> usize {
        self.qualified.len()
    }

    pub fn threshold_met(&self) -> bool {
        self.qualified.len() >= self.config.threshold
    }

    /// Record one dealer's package, verifying this node's own share against
    /// the dealer's published commitments. A failing dealer is dropped and
    /// recorded in the run's error list (`spec.md` §4.2: "complaints
    /// resolve faulty dealers"); it does not abort Setup on its own.
    pub fn record_package(&mut self, package: DealerPackage) {
        if self.phase != DkgPhase::Collecting {
            return;
        }
        let dealer = package.dealer;
        match verify_dealer_package(&self.config, &package, self.self_index) {
            Ok(()) => {
                self.qualified.insert(dealer, package);
            }
            Err(e) => self.errors.push(dealer, e),
        }
    }

    /// Aggregate every qualified dealer's contribution into this node's
    /// `SharedSecret`: `v = sum(shares)`, `X = sum(constant-term commits)`.
    pub fn aggregate(&mut self) -> Result<SharedSecret> {
        if self.phase != DkgPhase::Collecting {
            return Err(CothorityError::invalid("DKG state already aggregated"));
        }
        if self.qualified.len() < self.config.threshold {
            return Err(CothorityError::invalid(format!(
                "only {} of {} required dealers qualified",
                self.qualified.len(),
                self.config.threshold
            )));
        }

        let mut v = cothority_crypto::Scalar::ZERO;
        let mut x = Point::default();
        let mut commits = Vec::with_capacity(self.qualified.len());

        for package in self.qualified.values() {
            let (_, share) = package
                .shares
                .iter()
                .find(|(to, _)| *to == self.self_index)
                .expect("qualified package was verified against self_index");
            v += share;
            x += package.commits[0];
            commits.push(package.commits[0]);
        }

        self.phase = DkgPhase::Aggregated;

        Ok(SharedSecret {
            index: self.self_index,
            v,
            x,
            commits,
        })
    }

    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::build_dealer_package;
    use rand::rngs::OsRng;

    fn config() -> DkgConfig {
        DkgConfig {
            participants: vec![NodeIndex(0), NodeIndex(1), NodeIndex(2)],
            threshold: 2,
        }
    }

    #[test]
    fn aggregates_once_threshold_dealers_qualify() {
        let cfg = config();
        let mut state = DkgCollectionState::new(cfg.clone(), NodeIndex(0));
        for dealer in &cfg.participants {
            state.record_package(build_dealer_package(&mut OsRng, &cfg, *dealer));
        }
        assert!(state.threshold_met());
        let secret = state.aggregate().unwrap();
        assert_eq!(secret.index, NodeIndex(0));
    }

    #[test]
    fn aggregate_fails_below_threshold() {
        let cfg = config();
        let mut state = DkgCollectionState::new(cfg.clone(), NodeIndex(0));
        state.record_package(build_dealer_package(&mut OsRng, &cfg, NodeIndex(1)));
        assert!(state.aggregate().is_err());
    }

    #[test]
    fn tampered_dealer_is_dropped_not_fatal() {
        let cfg = config();
        let mut state = DkgCollectionState::new(cfg.clone(), NodeIndex(0));
        let mut bad = build_dealer_package(&mut OsRng, &cfg, NodeIndex(1));
        bad.shares[0].1 += cothority_crypto::Scalar::ONE;
        state.record_package(bad);
        state.record_package(build_dealer_package(&mut OsRng, &cfg, NodeIndex(2)));
        assert_eq!(state.qualified_count(), 1);
        assert_eq!(state.errors().len(), 1);
    }
}
