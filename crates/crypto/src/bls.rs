//! Pairing checks and BLS group signatures.
//!
//! Key material lives in two groups: secrets times `H1` or `G1` in G1, and
//! secrets times `G2` in G2. The equations checked on-chain are:
//!
//! - key share / master public key: `e(a·H1, G2) == e(H1, a·G2)`
//! - GPKJ: `e(gsk·G1, G2) == e(G1, gsk·G2)`
//! - signature: `e(σ, G2) == e(H(m), pk)` with `σ = sk·H(m)`
//!
//! Group signatures are aggregated from partial signatures using Lagrange
//! coefficients at zero:
//!
//! σ = Σ λ_i · σ_i

use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, Scalar};
use ff::Field;
use group::Curve;
use std::collections::HashSet;

use ethdkg_types::{G1Point, G2Point};

use crate::curve::{compress_g1, decode_g1, decode_g2, h1, hash_to_g1};
use crate::error::CryptoError;

/// Check that the G1 point is `a·H1` and the G2 point is `a·G2` for the same `a`.
pub fn verify_key_share_pair(g1: &G1Affine, g2: &G2Affine) -> bool {
    pairing(g1, &G2Affine::generator()) == pairing(&h1(), g2)
}

/// Check a GPKJ against the value recomputed from all dealers' commitments.
pub fn verify_gpkj(expected_g1: &G1Affine, gpkj: &G2Affine) -> bool {
    pairing(expected_g1, &G2Affine::generator()) == pairing(&G1Affine::generator(), gpkj)
}

/// Sign a message: σ = sk · H(m).
pub fn sign(secret: &Scalar, message: &[u8]) -> G1Affine {
    (G1Projective::from(hash_to_g1(message)) * secret).to_affine()
}

/// Verify a signature over `message` under a G2 public key.
pub fn verify_signature(
    signature: &G1Point,
    public_key: &G2Point,
    message: &[u8],
) -> Result<(), CryptoError> {
    let sig = decode_g1(signature).map_err(|_| CryptoError::SignatureVerificationFailed)?;
    let pk = decode_g2(public_key).map_err(|_| CryptoError::SignatureVerificationFailed)?;

    if pairing(&sig, &G2Affine::generator()) == pairing(&hash_to_g1(message), &pk) {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

/// Aggregate partial signatures into a group signature using Lagrange interpolation.
///
/// # Arguments
/// * `shares` - Vector of (participant_index, partial_signature) pairs
/// * `threshold` - Polynomial degree of the round; `threshold + 1` shares are required
pub fn aggregate_signatures(
    shares: &[(u32, G1Point)],
    threshold: usize,
) -> Result<G1Point, CryptoError> {
    if shares.len() < threshold + 1 {
        return Err(CryptoError::InsufficientShares {
            required: threshold + 1,
            got: shares.len(),
        });
    }

    let indices: HashSet<u32> = shares.iter().map(|(idx, _)| *idx).collect();
    if indices.len() != shares.len() {
        return Err(CryptoError::DuplicateShareIndex);
    }
    if indices.contains(&0) {
        return Err(CryptoError::InvalidShareIndex);
    }

    let indices: Vec<u32> = shares.iter().map(|(idx, _)| *idx).collect();
    let mut result = G1Projective::identity();

    for (idx, sig_point) in shares {
        let sig = decode_g1(sig_point)?;
        let lambda = lagrange_coefficient(*idx, &indices)?;
        result += G1Projective::from(sig) * lambda;
    }

    Ok(compress_g1(&result.to_affine()))
}

/// Compute Lagrange coefficient for index i given all indices.
///
/// λ_i = Π_{j≠i} (x_j / (x_j - x_i))
///
/// where we evaluate at x=0 for secret reconstruction.
fn lagrange_coefficient(i: u32, indices: &[u32]) -> Result<Scalar, CryptoError> {
    let i_scalar = Scalar::from(i as u64);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;

    for &j in indices {
        if j == i {
            continue;
        }

        let j_scalar = Scalar::from(j as u64);
        numerator *= j_scalar;

        let diff = j_scalar - i_scalar;
        if diff == Scalar::ZERO {
            return Err(CryptoError::LagrangeInterpolationFailed);
        }
        denominator *= diff;
    }

    let denom_inv: Option<Scalar> = denominator.invert().into();
    let denom_inv = denom_inv.ok_or(CryptoError::LagrangeInterpolationFailed)?;

    Ok(numerator * denom_inv)
}
