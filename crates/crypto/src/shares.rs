//! Share encryption and Feldman verification.
//!
//! Dealer `i` sends recipient `j` the share `f_i(j)` masked with a pad derived
//! from their Diffie-Hellman shared key `sk_i·pk_j = sk_j·pk_i`. Anyone who
//! learns the shared key (for example from an accusation, together with its
//! DLEQ proof) can unmask the share and check it against the dealer's public
//! commitments: `f_i(j)·G1 == Σ_k C_k·j^k`.

use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::Curve;
use hkdf::Hkdf;
use sha2::Sha256;

use ethdkg_types::EncryptedShare;

use crate::error::CryptoError;

const SHARE_PAD_INFO: &[u8] = b"ETHDKG share";

/// Diffie-Hellman shared key between our secret and another participant's public key.
pub fn shared_key(secret: &Scalar, public_key: &G1Affine) -> G1Affine {
    (G1Projective::from(public_key) * secret).to_affine()
}

fn share_pad(shared_key: &G1Affine, recipient_index: u32) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, &shared_key.to_compressed());
    let mut info = Vec::with_capacity(SHARE_PAD_INFO.len() + 4);
    info.extend_from_slice(SHARE_PAD_INFO);
    info.extend_from_slice(&recipient_index.to_be_bytes());

    let mut pad = [0u8; 32];
    hk.expand(&info, &mut pad)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(pad)
}

/// Mask a share for its recipient.
pub fn encrypt_share(
    share: &Scalar,
    shared_key: &G1Affine,
    recipient_index: u32,
) -> Result<EncryptedShare, CryptoError> {
    let pad = share_pad(shared_key, recipient_index)?;
    let mut out = share.to_bytes();
    for (byte, mask) in out.iter_mut().zip(pad.iter()) {
        *byte ^= mask;
    }
    Ok(out)
}

/// Unmask a share. A non-canonical result means the dealer sent garbage.
pub fn decrypt_share(
    encrypted: &EncryptedShare,
    shared_key: &G1Affine,
    recipient_index: u32,
) -> Result<Scalar, CryptoError> {
    let pad = share_pad(shared_key, recipient_index)?;
    let mut bytes = *encrypted;
    for (byte, mask) in bytes.iter_mut().zip(pad.iter()) {
        *byte ^= mask;
    }
    Option::<Scalar>::from(Scalar::from_bytes(&bytes)).ok_or(CryptoError::InvalidScalar)
}

/// Evaluate a commitment vector at `index`: `Σ_k C_k·index^k`.
pub fn evaluate_commitments(commitments: &[G1Affine], index: u32) -> G1Projective {
    let x = Scalar::from(index as u64);
    let mut x_power = Scalar::ONE;
    let mut result = G1Projective::identity();

    for commitment in commitments {
        result += G1Projective::from(commitment) * x_power;
        x_power *= x;
    }

    result
}

/// Verify a share against Feldman commitments.
pub fn verify_share(share: &Scalar, recipient_index: u32, commitments: &[G1Affine]) -> bool {
    let lhs = G1Projective::generator() * share;
    lhs == evaluate_commitments(commitments, recipient_index)
}

/// Position of recipient `recipient_index`'s share in dealer `dealer_index`'s
/// encrypted share array. Dealers skip themselves, so indices above the
/// dealer shift down by one. Indices are 1-based.
pub fn share_position(dealer_index: u32, recipient_index: u32) -> Option<usize> {
    if dealer_index == 0 || recipient_index == 0 || dealer_index == recipient_index {
        return None;
    }
    if recipient_index < dealer_index {
        Some(recipient_index as usize - 1)
    } else {
        Some(recipient_index as usize - 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::random_scalar;
    use rand::rngs::OsRng;

    #[test]
    fn test_shared_key_is_symmetric() {
        let a = random_scalar(&mut OsRng);
        let b = random_scalar(&mut OsRng);
        let pk_a = (G1Projective::generator() * a).to_affine();
        let pk_b = (G1Projective::generator() * b).to_affine();

        assert_eq!(shared_key(&a, &pk_b), shared_key(&b, &pk_a));
    }

    #[test]
    fn test_share_masking() {
        let key = shared_key(&random_scalar(&mut OsRng), &G1Affine::generator());
        let share = random_scalar(&mut OsRng);

        let encrypted = encrypt_share(&share, &key, 3).unwrap();
        assert_ne!(encrypted, share.to_bytes());
        assert_eq!(decrypt_share(&encrypted, &key, 3).unwrap(), share);

        // Wrong recipient index unmasks to something else
        assert_ne!(decrypt_share(&encrypted, &key, 2).ok(), Some(share));
    }

    #[test]
    fn test_feldman_verification() {
        // f(x) = 5 + 3x + 2x^2
        let coeffs = [Scalar::from(5u64), Scalar::from(3u64), Scalar::from(2u64)];
        let commitments: Vec<G1Affine> = coeffs
            .iter()
            .map(|c| (G1Projective::generator() * c).to_affine())
            .collect();

        // f(2) = 5 + 6 + 8 = 19
        assert!(verify_share(&Scalar::from(19u64), 2, &commitments));
        assert!(!verify_share(&Scalar::from(18u64), 2, &commitments));
    }

    #[test]
    fn test_share_position() {
        assert_eq!(share_position(3, 1), Some(0));
        assert_eq!(share_position(3, 2), Some(1));
        assert_eq!(share_position(3, 4), Some(2));
        assert_eq!(share_position(1, 2), Some(0));
        assert_eq!(share_position(3, 3), None);
        assert_eq!(share_position(0, 1), None);
    }
}
