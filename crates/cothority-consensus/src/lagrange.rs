//! Lagrange interpolation at zero over the scalar field (`spec.md` §4.7
//! "Recovery"). Resolves Open Question 5 of `spec.md` §9: coefficients are
//! computed over however many partials actually arrived (`n = T`), never a
//! hard-coded `n = 3`.

use cothority_core::{CothorityError, NodeIndex, Result};
use cothority_crypto::Scalar;

/// `lambda_i(0) = prod_{j != i} x_j / (x_j - x_i)` over the evaluation
/// points derived from `indices`, matching
/// `cothority_dkg::DkgConfig::evaluation_point` (`index + 1`, so no
/// participant sits at the secret's own `x = 0`).
pub fn coefficients_at_zero(indices: &[NodeIndex]) -> Result<Vec<Scalar>> {
    if indices.is_empty() {
        return Err(CothorityError::invalid(
            "cannot Lagrange-interpolate over zero evaluation points",
        ));
    }
    let xs: Vec<Scalar> = indices
        .iter()
        .map(|idx| Scalar::from((idx.0 as u64) + 1))
        .collect();

    let mut out = Vec::with_capacity(xs.len());
    for (i, &xi) in xs.iter().enumerate() {
        let mut num = Scalar::ONE;
        let mut den = Scalar::ONE;
        for (j, &xj) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            num *= xj;
            den *= xj - xi;
        }
        if den == Scalar::ZERO {
            return Err(CothorityError::crypto(
                "duplicate evaluation point in Lagrange set",
            ));
        }
        out.push(num * den.invert());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothority_crypto::base_point;

    #[test]
    fn coefficients_recover_a_constant_polynomial() {
        // f(x) = 7 for all x: any subset of evaluation points must
        // recombine to the same constant via Lagrange-at-zero.
        let secret = Scalar::from(7u64);
        let indices = [NodeIndex(0), NodeIndex(1), NodeIndex(2)];
        let shares: Vec<Scalar> = indices.iter().map(|_| secret).collect();
        let coeffs = coefficients_at_zero(&indices).unwrap();
        let recovered = coeffs
            .iter()
            .zip(shares.iter())
            .fold(Scalar::ZERO, |acc, (c, s)| acc + c * s);
        assert_eq!(recovered, secret);
    }

    #[test]
    fn coefficients_recover_a_linear_polynomial() {
        // f(x) = 3 + 5x, secret = f(0) = 3.
        let a0 = Scalar::from(3u64);
        let a1 = Scalar::from(5u64);
        let indices = [NodeIndex(0), NodeIndex(2), NodeIndex(4)];
        let shares: Vec<Scalar> = indices
            .iter()
            .map(|idx| a0 + a1 * Scalar::from((idx.0 as u64) + 1))
            .collect();
        let coeffs = coefficients_at_zero(&indices).unwrap();
        let recovered = coeffs
            .iter()
            .zip(shares.iter())
            .fold(Scalar::ZERO, |acc, (c, s)| acc + c * s);
        assert_eq!(recovered, a0);
        assert_eq!(base_point() * recovered, base_point() * a0);
    }

    #[test]
    fn empty_index_set_is_rejected() {
        assert!(coefficients_at_zero(&[]).is_err());
    }
}
