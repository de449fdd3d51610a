//! Async orchestration of one Setup run over a [`TreeOverlay`].
//!
//! Setup is all-to-all rather than tree-shaped (`spec.md` §4.2: every
//! participant deals to every other participant), so this drives
//! [`TreeOverlay::broadcast`] rather than the parent/child primitives the
//! later consensus protocols use.

use crate::dealer::build_dealer_package;
use crate::state_machine::DkgCollectionState;
use crate::types::{DealerPackage, DkgConfig, SharedSecret};
use cothority_core::{CothorityError, NodeIndex, Result};
use cothority_transport::TreeOverlay;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, warn};

/// Run Setup to completion for this node: deal, broadcast, collect every
/// other dealer's package, and aggregate once threshold dealers qualify.
pub async fn run_setup<M, O, R>(
    overlay: &mut O,
    config: &DkgConfig,
    rng: &mut R,
    wrap: impl Fn(DealerPackage) -> M + Send,
    unwrap: impl Fn(M) -> Option<DealerPackage> + Send,
) -> Result<SharedSecret>
where
    M: Clone + Send + Sync + 'static,
    O: TreeOverlay<M>,
    R: RngCore + CryptoRng,
{
    let self_index = overlay.index();
    let own_package = build_dealer_package(rng, config, self_index);

    let mut state = DkgCollectionState::new(config.clone(), self_index);
    state.record_package(own_package.clone());

    for (to, result) in overlay.broadcast(wrap(own_package)).await {
        if let Err(e) = result {
            warn!(node = to.0, error = %e, "failed to deal to participant");
        }
    }

    // Wait for every participant's package rather than stopping the moment
    // the threshold is met: an early stop would let different nodes settle
    // on different qualified-dealer sets and diverge on the resulting
    // shared public key. Simplifying assumption: this synchronous run
    // assumes honest, responsive dealers (`spec.md` §4.2's Byzantine
    // complaint resolution is not modeled beyond per-dealer verification).
    let expected = config.participants.len().saturating_sub(1);
    let mut received = 0usize;
    while received < expected {
        let envelope = overlay
            .recv()
            .await
            .ok_or_else(|| CothorityError::network("overlay closed before Setup completed"))?;
        received += 1;
        match unwrap(envelope.payload) {
            Some(package) => {
                debug!(dealer = package.dealer.0, "received dealer package");
                state.record_package(package);
            }
            None => warn!(from = envelope.from.0, "ignored non-dealer-package message during Setup"),
        }
    }

    if !state.errors().is_empty() {
        warn!(count = state.errors().len(), "Setup had disqualified dealers");
    }

    state.aggregate()
}
