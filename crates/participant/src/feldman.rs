//! Feldman Verifiable Secret Sharing over G1.
//!
//! Extends Shamir's secret sharing with commitments that allow
//! verification of shares without revealing the secret.

use bls12_381::{G1Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};

use ethdkg_crypto::{compress_g1, random_scalar};
use ethdkg_types::G1Point;

/// Generate a random polynomial of the given degree with given constant term.
///
/// Returns coefficients [a_0, a_1, ..., a_degree] where:
/// - a_0 is the secret (constant term)
/// - f(x) = a_0 + a_1*x + a_2*x^2 + ... + a_degree*x^degree
pub fn generate_polynomial<R: RngCore + CryptoRng>(
    secret: &Scalar,
    degree: usize,
    rng: &mut R,
) -> Vec<Scalar> {
    let mut coefficients = Vec::with_capacity(degree + 1);
    coefficients.push(*secret);

    for _ in 0..degree {
        coefficients.push(random_scalar(rng));
    }

    coefficients
}

/// Evaluate polynomial at a participant index using Horner's method.
pub fn evaluate_polynomial(coefficients: &[Scalar], index: u32) -> Scalar {
    let x = Scalar::from(index as u64);
    let mut result = Scalar::ZERO;
    for coeff in coefficients.iter().rev() {
        result = result * x + coeff;
    }
    result
}

/// Generate Feldman commitments for polynomial coefficients.
///
/// C_k = a_k·G1 for each coefficient a_k
pub fn generate_commitments(coefficients: &[Scalar]) -> Vec<G1Point> {
    coefficients
        .iter()
        .map(|coeff| compress_g1(&(G1Projective::generator() * coeff).to_affine()))
        .collect()
}

/// Combine shares using Lagrange interpolation to reconstruct secret.
///
/// Given shares (x_i, y_i), computes f(0) = Σ y_i * λ_i
/// where λ_i = Π_{j≠i} (x_j / (x_j - x_i))
pub fn combine_shares(shares: &[(u32, Scalar)]) -> Option<Scalar> {
    if shares.is_empty() {
        return None;
    }

    let mut result = Scalar::ZERO;

    for (i, (x_i, y_i)) in shares.iter().enumerate() {
        let x_i_scalar = Scalar::from(*x_i as u64);

        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;

        for (j, (x_j, _)) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            let x_j_scalar = Scalar::from(*x_j as u64);
            numerator *= x_j_scalar;
            denominator *= x_j_scalar - x_i_scalar;
        }

        let lambda_i = Option::<Scalar>::from(denominator.invert())? * numerator;
        result += y_i * lambda_i;
    }

    Some(result)
}
