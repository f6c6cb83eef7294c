//! Messages a participant publishes during a round.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use ethdkg_types::{Address, DiscreteLogProof, EncryptedShare, G1Point, G2Point};

/// A registered participant as seen on-chain.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RosterEntry {
    /// 1-based registration order
    pub index: u32,
    pub address: Address,
    pub public_key: G1Point,
}

/// Payload of `distributeShares`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DistributedShares {
    /// One share per other participant, ascending by index
    pub encrypted_shares: Vec<EncryptedShare>,
    /// Feldman commitments a_k·G1 for each polynomial coefficient
    pub commitments: Vec<G1Point>,
}

/// Payload of `submitKeyShare`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct KeyShare {
    pub key_share_g1: G1Point,
    pub correctness_proof: DiscreteLogProof,
    pub key_share_g2: G2Point,
}
