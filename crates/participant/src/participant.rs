//! ETHDKG participant implementation.

use std::collections::BTreeMap;

use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::debug;

use ethdkg_crypto::{
    compress_g1, compress_g2, decode_g1, decode_g2, decrypt_share, encrypt_share, h1, prove_dleq,
    random_scalar, share_position, shared_key, sign, verify_share, CryptoError,
};
use ethdkg_types::{threshold, Address, DiscreteLogProof, EncryptedShare, G1Point, G2Point};

use crate::feldman::{evaluate_polynomial, generate_commitments, generate_polynomial};
use crate::types::{DistributedShares, KeyShare, RosterEntry};

/// Errors during a round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DkgError {
    #[error("Participant is not in the roster")]
    NotInRoster,

    #[error("Roster is empty")]
    EmptyRoster,

    #[error("Unknown dealer {0}")]
    UnknownDealer(u32),

    #[error("Invalid share from participant {0}")]
    InvalidShare(u32),

    #[error("Dealer {dealer} sent {got} shares, expected {expected}")]
    WrongShareCount { dealer: u32, expected: usize, got: usize },

    #[error("Duplicate shares from participant {0}")]
    DuplicateShares(u32),

    #[error("Missing shares: have {got} of {expected}")]
    MissingShares { expected: usize, got: usize },

    #[error("Shares have not been dealt yet")]
    NotDealt,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// One validator's secrets and view of a single round.
pub struct EthDkgParticipant {
    address: Address,
    secret_key: Scalar,
    public_key: G1Point,
    /// Our 1-based index, known once the roster is fixed
    index: Option<u32>,
    roster: Vec<RosterEntry>,
    polynomial: Option<Vec<Scalar>>,
    /// Shares addressed to us, keyed by dealer index (our own included)
    received_shares: BTreeMap<u32, Scalar>,
}

impl EthDkgParticipant {
    /// Create a participant with a fresh registration key pair.
    pub fn new<R: RngCore + CryptoRng>(address: Address, rng: &mut R) -> Self {
        let secret_key = random_scalar(rng);
        let public_key = compress_g1(&(G1Projective::generator() * secret_key).to_affine());
        Self {
            address,
            secret_key,
            public_key,
            index: None,
            roster: Vec::new(),
            polynomial: None,
            received_shares: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Public key to submit at registration.
    pub fn public_key(&self) -> G1Point {
        self.public_key
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    /// Fix the roster, deal a polynomial and encrypt one share per other participant.
    pub fn deal<R: RngCore + CryptoRng>(
        &mut self,
        roster: &[RosterEntry],
        rng: &mut R,
    ) -> Result<DistributedShares, DkgError> {
        if roster.is_empty() {
            return Err(DkgError::EmptyRoster);
        }
        let mut roster = roster.to_vec();
        roster.sort_by_key(|entry| entry.index);

        let index = roster
            .iter()
            .find(|entry| entry.address == self.address)
            .map(|entry| entry.index)
            .ok_or(DkgError::NotInRoster)?;

        let degree = threshold(roster.len() as u32) as usize;
        let secret = random_scalar(rng);
        let polynomial = generate_polynomial(&secret, degree, rng);
        let commitments = generate_commitments(&polynomial);

        let mut encrypted_shares = Vec::with_capacity(roster.len() - 1);
        for entry in roster.iter().filter(|entry| entry.index != index) {
            let recipient_pk = decode_g1(&entry.public_key)?;
            let key = shared_key(&self.secret_key, &recipient_pk);
            let share = evaluate_polynomial(&polynomial, entry.index);
            encrypted_shares.push(encrypt_share(&share, &key, entry.index)?);
        }

        debug!(index, n = roster.len(), degree, "dealt shares");

        self.received_shares.clear();
        self.received_shares.insert(index, evaluate_polynomial(&polynomial, index));
        self.index = Some(index);
        self.roster = roster;
        self.polynomial = Some(polynomial);

        Ok(DistributedShares {
            encrypted_shares,
            commitments,
        })
    }

    /// Decrypt and verify the share a dealer addressed to us.
    ///
    /// An `InvalidShare` error means the dealer should be accused.
    pub fn receive_shares(
        &mut self,
        dealer: u32,
        encrypted_shares: &[EncryptedShare],
        commitments: &[G1Point],
    ) -> Result<(), DkgError> {
        let index = self.index.ok_or(DkgError::NotDealt)?;
        if self.received_shares.contains_key(&dealer) {
            return Err(DkgError::DuplicateShares(dealer));
        }
        let dealer_pk = self.dealer_public_key(dealer)?;

        let expected = self.roster.len() - 1;
        if encrypted_shares.len() != expected {
            return Err(DkgError::WrongShareCount {
                dealer,
                expected,
                got: encrypted_shares.len(),
            });
        }
        let position = share_position(dealer, index).ok_or(DkgError::UnknownDealer(dealer))?;

        let key = shared_key(&self.secret_key, &dealer_pk);
        let share = decrypt_share(&encrypted_shares[position], &key, index)
            .map_err(|_| DkgError::InvalidShare(dealer))?;

        let commitments = commitments
            .iter()
            .map(decode_g1)
            .collect::<Result<Vec<G1Affine>, _>>()
            .map_err(|_| DkgError::InvalidShare(dealer))?;

        if !verify_share(&share, index, &commitments) {
            debug!(dealer, index, "share failed verification");
            return Err(DkgError::InvalidShare(dealer));
        }

        self.received_shares.insert(dealer, share);
        Ok(())
    }

    /// Evidence for accusing a dealer of a bad share: our shared key with them
    /// and a proof that `log_G1(our pk) == log_{dealer pk}(shared key)`.
    pub fn accusation_evidence<R: RngCore + CryptoRng>(
        &self,
        dealer_public_key: &G1Point,
        rng: &mut R,
    ) -> Result<(G1Point, DiscreteLogProof), DkgError> {
        let dealer_pk = decode_g1(dealer_public_key)?;
        let key = shared_key(&self.secret_key, &dealer_pk);
        let proof = prove_dleq(&self.secret_key, &G1Affine::generator(), &dealer_pk, rng);
        Ok((compress_g1(&key), proof))
    }

    /// Key share for `submitKeyShare`: `a_0·H1`, its correctness proof and `a_0·G2`.
    pub fn key_share<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<KeyShare, DkgError> {
        let polynomial = self.polynomial.as_ref().ok_or(DkgError::NotDealt)?;
        let a0 = polynomial[0];
        let h1 = h1();

        Ok(KeyShare {
            key_share_g1: compress_g1(&(G1Projective::from(h1) * a0).to_affine()),
            correctness_proof: prove_dleq(&a0, &G1Affine::generator(), &h1, rng),
            key_share_g2: compress_g2(&(G2Projective::generator() * a0).to_affine()),
        })
    }

    /// Our group secret: the sum of the shares every participant dealt us.
    pub fn group_secret(&self) -> Result<Scalar, DkgError> {
        let expected = self.roster.len();
        if expected == 0 {
            return Err(DkgError::NotDealt);
        }
        if self.received_shares.len() != expected {
            return Err(DkgError::MissingShares {
                expected,
                got: self.received_shares.len(),
            });
        }
        Ok(self.received_shares.values().fold(Scalar::ZERO, |acc, s| acc + s))
    }

    /// Our group public key share, `gsk·G2`.
    pub fn gpkj(&self) -> Result<G2Point, DkgError> {
        let gsk = self.group_secret()?;
        Ok(compress_g2(&(G2Affine::generator() * gsk).to_affine()))
    }

    /// Partial group signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<G1Point, DkgError> {
        let gsk = self.group_secret()?;
        Ok(compress_g1(&sign(&gsk, message)))
    }

    fn dealer_public_key(&self, dealer: u32) -> Result<G1Affine, DkgError> {
        let entry = self
            .roster
            .iter()
            .find(|entry| entry.index == dealer)
            .ok_or(DkgError::UnknownDealer(dealer))?;
        Ok(decode_g1(&entry.public_key)?)
    }
}

/// Master public key from every participant's `keyShareG2`.
pub fn master_public_key(key_shares_g2: &[G2Point]) -> Result<G2Point, DkgError> {
    let mut sum = G2Projective::identity();
    for point in key_shares_g2 {
        sum += G2Projective::from(decode_g2(point)?);
    }
    Ok(compress_g2(&sum.to_affine()))
}
