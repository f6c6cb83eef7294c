//! Discrete-log-equality proofs (Chaum-Pedersen).
//!
//! Proves knowledge of `x` such that `x_g = x·g` and `x_h = x·h` without
//! revealing `x`. ETHDKG uses two instances:
//!
//! - key share correctness: `log_G1(commitments[0]) == log_H1(keyShareG1)`
//! - shared key correctness: `log_G1(pk_accuser) == log_{pk_dealer}(sharedKey)`

use bls12_381::{G1Affine, G1Projective, Scalar};
use group::Curve;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use ethdkg_types::DiscreteLogProof;

use crate::curve::{random_scalar, scalar_to_bytes};
use crate::error::CryptoError;

/// Generate a DLEQ proof for `secret` over bases `g` and `h`.
pub fn prove_dleq<R: RngCore + CryptoRng>(
    secret: &Scalar,
    g: &G1Affine,
    h: &G1Affine,
    rng: &mut R,
) -> DiscreteLogProof {
    let x_g = (G1Projective::from(g) * secret).to_affine();
    let x_h = (G1Projective::from(h) * secret).to_affine();

    let k = random_scalar(rng);
    let r1 = (G1Projective::from(g) * k).to_affine();
    let r2 = (G1Projective::from(h) * k).to_affine();

    let c = challenge(g, h, &x_g, &x_h, &r1, &r2);

    // Compute response s = k - c·x
    let s = k - c * secret;

    DiscreteLogProof {
        challenge: scalar_to_bytes(&c),
        response: scalar_to_bytes(&s),
    }
}

/// Verify a DLEQ proof that `log_g(x_g) == log_h(x_h)`.
pub fn verify_dleq(
    proof: &DiscreteLogProof,
    g: &G1Affine,
    x_g: &G1Affine,
    h: &G1Affine,
    x_h: &G1Affine,
) -> Result<(), CryptoError> {
    let c = wide_scalar(&proof.challenge.0);
    let s = wide_scalar(&proof.response.0);

    // r1 = s·g + c·x_g, r2 = s·h + c·x_h
    let r1 = (G1Projective::from(g) * s + G1Projective::from(x_g) * c).to_affine();
    let r2 = (G1Projective::from(h) * s + G1Projective::from(x_h) * c).to_affine();

    if c == challenge(g, h, x_g, x_h, &r1, &r2) {
        Ok(())
    } else {
        Err(CryptoError::DleqVerificationFailed)
    }
}

fn challenge(
    g: &G1Affine,
    h: &G1Affine,
    x_g: &G1Affine,
    x_h: &G1Affine,
    r1: &G1Affine,
    r2: &G1Affine,
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(g.to_compressed());
    hasher.update(h.to_compressed());
    hasher.update(x_g.to_compressed());
    hasher.update(x_h.to_compressed());
    hasher.update(r1.to_compressed());
    hasher.update(r2.to_compressed());
    wide_scalar(&hasher.finalize().into())
}

/// Reduce 32 bytes modulo the field order.
fn wide_scalar(bytes: &[u8; 32]) -> Scalar {
    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(bytes);
    Scalar::from_bytes_wide(&wide)
}
