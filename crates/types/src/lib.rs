//! Core type definitions for the ETHDKG protocol and sidechain snapshots.
//!
//! This crate provides the data structures shared by the on-chain module, the
//! off-chain participant library and the mock chain: curve point encodings,
//! the round phases, discrete-log proofs and the hashes that bind submitted
//! artifacts to the registry.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use sha2::{Digest, Sha256};
use std::fmt;

pub mod snapshot;

pub use snapshot::{BlockClaims, GroupSignature, Snapshot};

// =========================
// CRYPTOGRAPHIC PRIMITIVES
// =========================

/// Compressed G1 point on BLS12-381 (48 bytes)
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G1Point(#[serde_as(as = "[_; 48]")] pub [u8; 48]);

impl G1Point {
    /// True for the all-zero encoding, which never decodes to a point.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

/// Compressed G2 point on BLS12-381 (96 bytes)
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 96]")] pub [u8; 96]);

impl G2Point {
    /// True for the all-zero encoding, which never decodes to a point.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 96])
    }
}

/// Scalar field element (32 bytes, little-endian)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Scalar(pub [u8; 32]);

/// A share encrypted to its recipient under the dealer/recipient shared key.
pub type EncryptedShare = [u8; 32];

/// DLEQ proof: log_g(x_g) == log_h(x_h)
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DiscreteLogProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

// =========================
// PROTOCOL TYPES
// =========================

/// Validator account (20 bytes, Ethereum style)
pub type Address = [u8; 20];

/// ETHDKG round phases, in the order a round visits them.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum Phase {
    RegistrationOpen,
    ShareDistribution,
    DisputeShareDistribution,
    KeyShareSubmission,
    MPKSubmission,
    GPKJSubmission,
    DisputeGPKJSubmission,
    Completion,
}

impl Phase {
    /// The phase that follows this one within a round. `Completion` is terminal.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::RegistrationOpen => Some(Phase::ShareDistribution),
            Phase::ShareDistribution => Some(Phase::DisputeShareDistribution),
            Phase::DisputeShareDistribution => Some(Phase::KeyShareSubmission),
            Phase::KeyShareSubmission => Some(Phase::MPKSubmission),
            Phase::MPKSubmission => Some(Phase::GPKJSubmission),
            Phase::GPKJSubmission => Some(Phase::DisputeGPKJSubmission),
            Phase::DisputeGPKJSubmission => Some(Phase::Completion),
            Phase::Completion => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::RegistrationOpen => "RegistrationOpen",
            Phase::ShareDistribution => "ShareDistribution",
            Phase::DisputeShareDistribution => "DisputeShareDistribution",
            Phase::KeyShareSubmission => "KeyShareSubmission",
            Phase::MPKSubmission => "MPKSubmission",
            Phase::GPKJSubmission => "GPKJSubmission",
            Phase::DisputeGPKJSubmission => "DisputeGPKJSubmission",
            Phase::Completion => "Completion",
        };
        f.write_str(name)
    }
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Degree of the sharing polynomial for `n` participants.
///
/// `t + 1` partial signatures are needed to sign, and `t + 1 > 2n/3`.
pub fn threshold(n: u32) -> u32 {
    let quotient = n / 3;
    let mut t = 2 * quotient;
    if n - 3 * quotient == 2 {
        t += 1;
    }
    t
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hash of a dealer's encrypted share vector.
pub fn hash_encrypted_shares(encrypted_shares: &[EncryptedShare]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for share in encrypted_shares {
        hasher.update(share);
    }
    hasher.finalize().into()
}

/// Hash of a dealer's Feldman commitment vector.
pub fn hash_commitments(commitments: &[G1Point]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for commitment in commitments {
        hasher.update(commitment.0);
    }
    hasher.finalize().into()
}

/// Binding hash stored for a dealer at share distribution time.
///
/// Accusations re-supply the shares (or their hash) and the commitments, which
/// must reproduce this value exactly.
pub fn hash_distributed_shares(encrypted_shares_hash: &[u8; 32], commitments_hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(encrypted_shares_hash);
    hasher.update(commitments_hash);
    hasher.finalize().into()
}

/// Hash identifying a master public key.
pub fn hash_master_public_key(mpk: &G2Point) -> [u8; 32] {
    sha256(&mpk.0)
}
