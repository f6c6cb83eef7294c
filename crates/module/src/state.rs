//! On-chain state structures for the ETHDKG and snapshot modules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ethdkg_types::{hash_master_public_key, Address, DiscreteLogProof, G1Point, G2Point, Phase, Snapshot};

use crate::events::Event;
use crate::genesis::{EthDkgGenesisConfig, GenesisValidationError, SnapshotGenesisConfig};
use crate::phase::PhaseController;
use crate::ring_buffer::RingBuffer;

/// A validator's record for the round it last took part in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// 1-based registration order within the round
    pub index: u32,
    /// Round this record belongs to
    pub nonce: u64,
    /// Last phase the participant contributed to
    pub phase: Phase,
    pub public_key: G1Point,
    pub distributed_shares_hash: [u8; 32],
    pub commitments_first_coefficient: G1Point,
    pub key_share_g1: G1Point,
    pub key_share_g1_correctness_proof: DiscreteLogProof,
    pub key_share_g2: G2Point,
    pub gpkj: G2Point,
}

impl Participant {
    pub fn registered(index: u32, nonce: u64, public_key: G1Point) -> Self {
        Self {
            index,
            nonce,
            phase: Phase::RegistrationOpen,
            public_key,
            distributed_shares_hash: [0u8; 32],
            commitments_first_coefficient: G1Point::default(),
            key_share_g1: G1Point::default(),
            key_share_g1_correctness_proof: DiscreteLogProof::default(),
            key_share_g2: G2Point::default(),
            gpkj: G2Point::default(),
        }
    }

    pub fn has_distributed_shares(&self) -> bool {
        self.phase >= Phase::ShareDistribution
    }

    pub fn has_submitted_key_share(&self) -> bool {
        self.phase >= Phase::KeyShareSubmission
    }

    pub fn has_submitted_gpkj(&self) -> bool {
        self.phase >= Phase::GPKJSubmission
    }
}

/// Result of looking a validator up in the registry.
#[derive(Debug, PartialEq, Eq)]
pub enum ParticipantLookup<'a> {
    /// Registered in the current round
    Current(&'a Participant),
    /// Only a record from an earlier round exists
    Stale { nonce: u64 },
    Absent,
}

/// Key generation state.
#[derive(Clone, Debug)]
pub struct EthDkgState {
    pub controller: PhaseController,
    pub min_validators: u32,
    pub validator_pool: Address,
    pub factory: Address,
    /// Records keyed by validator; only those tagged with the current nonce count
    pub participants: BTreeMap<Address, Participant>,
    /// Participants evicted by accusation in the current round
    pub bad_participants: u32,
    /// Running sum of accepted `keyShareG1`s, zero when none
    pub mpk_g1: G1Point,
    /// Master public key submitted this round, active once the round completes
    pub pending_master_public_key: Option<G2Point>,
    /// Key snapshots are verified against
    pub master_public_key: Option<G2Point>,
    pub master_public_key_hash: [u8; 32],
}

impl EthDkgState {
    pub fn new(config: &EthDkgGenesisConfig) -> Self {
        Self {
            controller: PhaseController::new(config.phase_length, config.confirmation_length),
            min_validators: config.min_validators,
            validator_pool: config.validator_pool,
            factory: config.factory,
            participants: BTreeMap::new(),
            bad_participants: 0,
            mpk_g1: G1Point::default(),
            pending_master_public_key: None,
            master_public_key: None,
            master_public_key_hash: [0u8; 32],
        }
    }

    pub fn nonce(&self) -> u64 {
        self.controller.nonce
    }

    pub fn lookup(&self, address: &Address) -> ParticipantLookup<'_> {
        match self.participants.get(address) {
            Some(p) if p.nonce == self.nonce() => ParticipantLookup::Current(p),
            Some(p) => ParticipantLookup::Stale { nonce: p.nonce },
            None => ParticipantLookup::Absent,
        }
    }

    /// Record of `address` in the current round.
    pub fn current(&self, address: &Address) -> Option<&Participant> {
        match self.lookup(address) {
            ParticipantLookup::Current(p) => Some(p),
            _ => None,
        }
    }

    pub fn current_mut(&mut self, address: &Address) -> Option<&mut Participant> {
        let nonce = self.nonce();
        self.participants.get_mut(address).filter(|p| p.nonce == nonce)
    }

    /// Everyone registered in the current round, by index.
    pub fn round_participants(&self) -> Vec<(Address, &Participant)> {
        let nonce = self.nonce();
        let mut list: Vec<_> = self
            .participants
            .iter()
            .filter(|(_, p)| p.nonce == nonce)
            .map(|(a, p)| (*a, p))
            .collect();
        list.sort_by_key(|(_, p)| p.index);
        list
    }

    /// Make `mpk` the active master public key.
    pub fn activate_master_public_key(&mut self, mpk: G2Point) {
        self.master_public_key_hash = hash_master_public_key(&mpk);
        self.master_public_key = Some(mpk);
    }
}

/// Snapshot state.
#[derive(Clone, Debug)]
pub struct SnapshotState {
    pub config: SnapshotGenesisConfig,
    /// Epoch of the latest snapshot, 0 before the first
    pub epoch: u32,
    pub buffer: RingBuffer<Snapshot>,
}

impl SnapshotState {
    pub fn new(config: &SnapshotGenesisConfig) -> Self {
        Self {
            config: config.clone(),
            epoch: 0,
            buffer: RingBuffer::new(config.buffer_capacity),
        }
    }
}

/// Module state.
///
/// In a real deployment these would live in contract storage.
/// This is an in-memory representation for development.
#[derive(Clone, Debug)]
pub struct ModuleState {
    pub ethdkg: EthDkgState,
    pub snapshots: SnapshotState,
    /// Event log in commit order
    pub events: Vec<Event>,
}

impl ModuleState {
    /// Create module state from a validated genesis configuration.
    pub fn from_genesis(config: &EthDkgGenesisConfig) -> Result<Self, GenesisValidationError> {
        config.validate()?;
        Ok(Self {
            ethdkg: EthDkgState::new(config),
            snapshots: SnapshotState::new(&config.snapshots),
            events: Vec::new(),
        })
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
