//! Events appended to the module's log as calls commit.
//!
//! Participants follow a round through these: shares and commitments are
//! only published here, never stored in full.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use ethdkg_types::{Address, DiscreteLogProof, EncryptedShare, G1Point, G2Point, GroupSignature};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Event {
    RegistrationOpened {
        start_block: u64,
        validators_count: u32,
        nonce: u64,
        phase_length: u64,
        confirmation_length: u64,
    },
    AddressRegistered {
        account: Address,
        index: u32,
        nonce: u64,
        public_key: G1Point,
    },
    RegistrationComplete {
        block: u64,
    },
    SharesDistributed {
        account: Address,
        index: u32,
        nonce: u64,
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1Point>,
    },
    ShareDistributionComplete {
        block: u64,
    },
    KeyShareSubmitted {
        account: Address,
        index: u32,
        nonce: u64,
        key_share_g1: G1Point,
        key_share_g1_correctness_proof: DiscreteLogProof,
        key_share_g2: G2Point,
    },
    KeyShareSubmissionComplete {
        block: u64,
    },
    MPKSet {
        block: u64,
        nonce: u64,
        mpk: G2Point,
    },
    ValidatorMemberAdded {
        account: Address,
        index: u32,
        nonce: u64,
        epoch: u32,
        gpkj: G2Point,
    },
    GPKJSubmissionComplete {
        block: u64,
    },
    ValidatorSetCompleted {
        validator_count: u32,
        nonce: u64,
        epoch: u32,
        eth_height: u64,
        side_chain_height: u32,
        mpk: G2Point,
    },
    /// An accusation resolved against `account`
    ParticipantEvicted {
        account: Address,
        disputer: Address,
        nonce: u64,
        major: bool,
    },
    SnapshotTaken {
        chain_id: u32,
        epoch: u32,
        height: u32,
        validator: Address,
        signature: GroupSignature,
    },
}
