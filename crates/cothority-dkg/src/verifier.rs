//! Feldman share verification.

use crate::dealer::evaluate_commitments;
use crate::types::{DealerPackage, DkgConfig};
use cothority_core::{CothorityError, NodeIndex, Result};
use cothority_crypto::base_point;

/// Verify that `package` contains a share for `participant` consistent with
/// its own published commitments, and that the commitments have the
/// expected degree for `config.threshold`.
pub fn verify_dealer_package(
    config: &DkgConfig,
    package: &DealerPackage,
    participant: NodeIndex,
) -> Result<()> {
    if package.commits.len() != config.threshold {
        return Err(CothorityError::invalid(format!(
            "dealer {} published {} commitments, expected threshold {}",
            package.dealer.0,
            package.commits.len(),
            config.threshold
        )));
    }

    let (_, share) = package
        .shares
        .iter()
        .find(|(to, _)| *to == participant)
        .ok_or_else(|| {
            CothorityError::invalid(format!(
                "dealer {} sent no share for participant {}",
                package.dealer.0, participant.0
            ))
        })?;

    let x = DkgConfig::evaluation_point(participant);
    let expected = evaluate_commitments(&package.commits, x);
    if base_point() * share != expected {
        return Err(CothorityError::crypto(format!(
            "share from dealer {} fails Feldman verification",
            package.dealer.0
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::build_dealer_package;
    use rand::rngs::OsRng;

    #[test]
    fn honest_package_verifies_for_every_participant() {
        let config = DkgConfig {
            participants: vec![NodeIndex(0), NodeIndex(1), NodeIndex(2)],
            threshold: 2,
        };
        let package = build_dealer_package(&mut OsRng, &config, NodeIndex(0));
        for participant in &config.participants {
            verify_dealer_package(&config, &package, *participant).unwrap();
        }
    }

    #[test]
    fn tampered_share_fails_verification() {
        let config = DkgConfig {
            participants: vec![NodeIndex(0), NodeIndex(1)],
            threshold: 2,
        };
        let mut package = build_dealer_package(&mut OsRng, &config, NodeIndex(0));
        package.shares[0].1 += cothority_crypto::Scalar::ONE;
        assert!(verify_dealer_package(&config, &package, package.shares[0].0).is_err());
    }
}
