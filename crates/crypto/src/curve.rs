//! Point encodings and hashing onto BLS12-381.

use bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve};
use bls12_381::{G1Affine, G1Projective, G2Affine, Scalar};
use group::Curve;
use rand::{CryptoRng, RngCore};
use sha2_09::Sha256;

use ethdkg_types::{G1Point, G2Point, Scalar as TypesScalar};

use crate::error::CryptoError;

const HASH_TO_G1_DST: &[u8] = b"ETHDKG-V1_BLS12381G1_XMD:SHA-256_SSWU_RO_";
const H1_SEED: &[u8] = b"ETHDKG-V1 second G1 generator";

/// Hash arbitrary data to a G1 point (RFC 9380, `expand_message_xmd` with SHA-256).
pub fn hash_to_g1(data: &[u8]) -> G1Affine {
    <G1Projective as HashToCurve<ExpandMsgXmd<Sha256>>>::hash_to_curve(data, HASH_TO_G1_DST).to_affine()
}

/// Second G1 generator. Its discrete log relative to the standard generator is unknown.
pub fn h1() -> G1Affine {
    hash_to_g1(H1_SEED)
}

/// Generate a random scalar.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_wide(&bytes)
}

/// Compress a G1 point to bytes.
pub fn compress_g1(point: &G1Affine) -> G1Point {
    G1Point(point.to_compressed())
}

/// Decompress a G1 point from bytes.
pub fn decompress_g1(bytes: &[u8; 48]) -> Result<G1Affine, CryptoError> {
    Option::<G1Affine>::from(G1Affine::from_compressed(bytes)).ok_or(CryptoError::InvalidG1Point)
}

/// Compress a G2 point to bytes.
pub fn compress_g2(point: &G2Affine) -> G2Point {
    G2Point(point.to_compressed())
}

/// Decompress a G2 point from bytes.
pub fn decompress_g2(bytes: &[u8; 96]) -> Result<G2Affine, CryptoError> {
    Option::<G2Affine>::from(G2Affine::from_compressed(bytes)).ok_or(CryptoError::InvalidG2Point)
}

/// Decode a G1 point submitted to the chain, rejecting zero and the identity.
pub fn decode_g1(point: &G1Point) -> Result<G1Affine, CryptoError> {
    if point.is_zero() {
        return Err(CryptoError::ZeroPoint);
    }
    let affine = decompress_g1(&point.0)?;
    if bool::from(affine.is_identity()) {
        return Err(CryptoError::ZeroPoint);
    }
    Ok(affine)
}

/// Decode a G2 point submitted to the chain, rejecting zero and the identity.
pub fn decode_g2(point: &G2Point) -> Result<G2Affine, CryptoError> {
    if point.is_zero() {
        return Err(CryptoError::ZeroPoint);
    }
    let affine = decompress_g2(&point.0)?;
    if bool::from(affine.is_identity()) {
        return Err(CryptoError::ZeroPoint);
    }
    Ok(affine)
}

/// Scalar to its 32-byte little-endian encoding.
pub fn scalar_to_bytes(scalar: &Scalar) -> TypesScalar {
    TypesScalar(scalar.to_bytes())
}

/// Scalar from a canonical 32-byte little-endian encoding.
pub fn scalar_from_bytes(bytes: &TypesScalar) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_bytes(&bytes.0)).ok_or(CryptoError::InvalidScalar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_hash_to_g1() {
        let point1 = hash_to_g1(b"claims 1");
        let point2 = hash_to_g1(b"claims 2");
        let point3 = hash_to_g1(b"claims 1");

        assert_ne!(point1, point2);
        assert_eq!(point1, point3);
    }

    #[test]
    fn test_hash_to_g1_lands_in_subgroup() {
        let point = hash_to_g1(b"");
        assert!(bool::from(point.is_torsion_free()));
        assert!(!bool::from(point.is_identity()));
        assert_eq!(decode_g1(&compress_g1(&point)), Ok(point));
    }

    #[test]
    fn test_h1_is_not_the_standard_generator() {
        assert_ne!(h1(), G1Affine::generator());
        assert!(!bool::from(h1().is_identity()));
    }

    #[test]
    fn test_decode_rejects_zero_and_identity() {
        assert_eq!(decode_g1(&G1Point::default()), Err(CryptoError::ZeroPoint));
        assert_eq!(decode_g1(&compress_g1(&G1Affine::identity())), Err(CryptoError::ZeroPoint));
        assert_eq!(decode_g2(&compress_g2(&G2Affine::identity())), Err(CryptoError::ZeroPoint));

        let mut garbage = [0u8; 48];
        garbage[0] = 0x80;
        garbage[47] = 1;
        assert!(decode_g1(&G1Point(garbage)).is_err());
    }

    #[test]
    fn test_scalar_encoding() {
        let s = random_scalar(&mut OsRng);
        assert_eq!(scalar_from_bytes(&scalar_to_bytes(&s)).unwrap(), s);
        assert_eq!(scalar_from_bytes(&TypesScalar([0xff; 32])), Err(CryptoError::InvalidScalar));
    }
}
