//! Types for Joint-Feldman verifiable secret sharing.

use cothority_core::NodeIndex;
use cothority_crypto::{Point, Scalar};
use serde::{Deserialize, Serialize};

/// Parameters for one Setup run (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgConfig {
    pub participants: Vec<NodeIndex>,
    pub threshold: usize,
}

impl DkgConfig {
    /// The scalar a participant's share is evaluated at: `index + 1`, so
    /// no participant sits at the secret's own evaluation point (`x = 0`).
    pub fn evaluation_point(index: NodeIndex) -> Scalar {
        Scalar::from((index.0 as u64) + 1)
    }
}

/// One dealer's Feldman VSS contribution: a polynomial's public
/// commitments plus one share per participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerPackage {
    pub dealer: NodeIndex,
    /// `commits[j] = a_j * G` for the dealer's degree-`(threshold-1)` polynomial.
    pub commits: Vec<Point>,
    /// `shares[i] = f(evaluation_point(i))` for every participant `i`.
    pub shares: Vec<(NodeIndex, Scalar)>,
}

/// A complaint raised when a received share fails Feldman verification
/// against its dealer's published commitments (`spec.md` §4.2: "complaints
/// resolve faulty dealers").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub complainant: NodeIndex,
    pub accused_dealer: NodeIndex,
}

/// Final per-node DKG output (`spec.md` §3 "SharedSecret").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSecret {
    pub index: NodeIndex,
    pub v: Scalar,
    pub x: Point,
    /// Constant-term commitments of every qualified dealer, retained so a
    /// third party can audit which dealers contributed to `x`.
    pub commits: Vec<Point>,
}
