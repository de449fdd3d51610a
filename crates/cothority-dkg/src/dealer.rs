//! Dealer-side polynomial generation (Feldman VSS).

use crate::types::{DealerPackage, DkgConfig};
use cothority_core::NodeIndex;
use cothority_crypto::{base_point, Point, Scalar};
use rand_core::{CryptoRng, RngCore};

/// Sample a random degree-`(threshold - 1)` polynomial and build this
/// dealer's public commitments plus one share per configured participant.
pub fn build_dealer_package<R: RngCore + CryptoRng>(
    rng: &mut R,
    config: &DkgConfig,
    dealer: NodeIndex,
) -> DealerPackage {
    let degree = config.threshold.saturating_sub(1);
    let coefficients: Vec<Scalar> = (0..=degree).map(|_| Scalar::random(rng)).collect();
    let commits: Vec<Point> = coefficients.iter().map(|a| base_point() * a).collect();

    let shares = config
        .participants
        .iter()
        .map(|participant| {
            let x = DkgConfig::evaluation_point(*participant);
            (*participant, evaluate_polynomial(&coefficients, x))
        })
        .collect();

    DealerPackage {
        dealer,
        commits,
        shares,
    }
}

fn evaluate_polynomial(coefficients: &[Scalar], x: Scalar) -> Scalar {
    // Horner's method.
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, coeff| acc * x + coeff)
}

/// Evaluate the public commitment polynomial at `x`: `sum_j commits[j] * x^j`.
pub fn evaluate_commitments(commits: &[Point], x: Scalar) -> Point {
    let mut power = Scalar::ONE;
    let mut acc = Point::default();
    for commit in commits {
        acc += commit * power;
        power *= x;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn share_matches_commitment_evaluation() {
        let config = DkgConfig {
            participants: vec![NodeIndex(0), NodeIndex(1), NodeIndex(2)],
            threshold: 2,
        };
        let package = build_dealer_package(&mut OsRng, &config, NodeIndex(9));
        for (participant, share) in &package.shares {
            let x = DkgConfig::evaluation_point(*participant);
            let expected = evaluate_commitments(&package.commits, x);
            assert_eq!(base_point() * share, expected);
        }
    }
}
