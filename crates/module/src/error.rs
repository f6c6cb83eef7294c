//! ETHDKG and snapshot module error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ethdkg_crypto::CryptoError;
use ethdkg_types::{Address, Phase};

/// Which part of a phase's block range an operation runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    /// `[start, start + length)`
    Open,
    /// `[start + length, start + 2·length)`
    Dispute,
}

/// A `(phase, window)` pair that would have accepted a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowedWindow {
    pub phase: Phase,
    pub window: Window,
}

impl fmt::Display for AllowedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:?}", self.phase, self.window)
    }
}

/// Errors raised by the key generation entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EthDkgError {
    #[error("Incorrect phase {current} at block {block} (start {phase_start}, length {phase_length}), accepted: {allowed:?}")]
    IncorrectPhase {
        current: Phase,
        block: u64,
        phase_start: u64,
        phase_length: u64,
        allowed: Vec<AllowedWindow>,
    },

    // === Authorization ===
    #[error("Only validators allowed: {0:02x?}")]
    OnlyValidatorsAllowed(Address),

    #[error("Only the validator pool may call this: {0:02x?}")]
    OnlyValidatorPool(Address),

    #[error("Only the factory may call this: {0:02x?}")]
    OnlyFactory(Address),

    // === Round lifecycle ===
    #[error("Consensus is running")]
    ConsensusRunning,

    #[error("An ETHDKG round is already running")]
    EthDkgRoundRunning,

    #[error("Minimum validators not met: need {required}, got {got}")]
    MinimumValidatorsNotMet { required: u32, got: u32 },

    #[error("Round has {0} unresolved bad participants")]
    UnresolvedBadParticipants(u32),

    #[error("Master public key has not been submitted")]
    MasterPublicKeyNotSet,

    #[error("Migration requires nonce 0, current nonce is {0}")]
    MigrationRequiresZeroNonce(u64),

    #[error("Migration input lengths differ: {accounts} accounts, {indices} indices, {gpkjs} gpkjs")]
    MigrationInputDataMismatch {
        accounts: usize,
        indices: usize,
        gpkjs: usize,
    },

    // === Participant contributions ===
    #[error("Participant already registered in this round: {0:02x?}")]
    ParticipantAlreadyRegistered(Address),

    #[error("Public key is zero")]
    PublicKeyZero,

    #[error("Public key is not on curve")]
    PublicKeyNotOnCurve,

    #[error("Participant not registered in this round: {0:02x?}")]
    ParticipantNotRegistered(Address),

    #[error("Participant already distributed shares in this round: {0:02x?}")]
    ParticipantDistributedSharesInRound(Address),

    #[error("Invalid encrypted shares length: expected {expected}, got {got}")]
    InvalidEncryptedSharesLength { expected: usize, got: usize },

    #[error("Invalid commitments length: expected {expected}, got {got}")]
    InvalidCommitmentsLength { expected: usize, got: usize },

    #[error("Commitment {0} is zero")]
    CommitmentZero(usize),

    #[error("Commitment {0} is not on curve")]
    CommitmentNotOnCurve(usize),

    #[error("Participant did not distribute shares: {0:02x?}")]
    ParticipantDidNotDistributeShares(Address),

    #[error("Participant already submitted key shares in this round: {0:02x?}")]
    ParticipantSubmittedKeySharesInRound(Address),

    #[error("Key share is zero")]
    KeyShareZero,

    #[error("Key share is not on curve")]
    KeyShareNotOnCurve,

    #[error("Key share correctness proof failed")]
    InvalidKeyShareProof,

    #[error("Elliptic curve pairing check failed")]
    EllipticCurvePairingFailed,

    #[error("Participant did not submit key shares: {0:02x?}")]
    ParticipantDidNotSubmitKeyShares(Address),

    #[error("Participant already submitted GPKJ in this round: {0:02x?}")]
    ParticipantSubmittedGpkjInRound(Address),

    #[error("GPKJ is zero")]
    GpkjZero,

    #[error("GPKJ is not on curve")]
    GpkjNotOnCurve,

    // === Accusations ===
    #[error("Cannot accuse self")]
    CannotAccuseSelf,

    #[error("Address accused more than once in the same call: {0:02x?}")]
    DuplicateAccusation(Address),

    #[error("Accused is not a validator (already evicted?): {0:02x?}")]
    AccusedNotValidator(Address),

    #[error("Accused participated in {phase}: {accused:02x?}")]
    AccusedParticipatingInRound { accused: Address, phase: Phase },

    #[error("Accused is not participating in this round: {0:02x?}")]
    AccusedNotParticipatingInRound(Address),

    #[error("Disputer did not distribute shares: {0:02x?}")]
    DisputerDidNotDistributeShares(Address),

    #[error("dishonestParticipant did not distribute shares: {0:02x?}")]
    DishonestParticipantDidNotDistributeShares(Address),

    #[error("Shares and commitments do not match the record of {0:02x?}")]
    SharesAndCommitmentsMismatch(Address),

    #[error("Shared key or its correctness proof is invalid")]
    InvalidSharedKeyOrProof,

    #[error("Accused distributed a valid share: {0:02x?}")]
    AccusedDistributedGoodShare(Address),

    #[error("Disputer did not submit GPKJ: {0:02x?}")]
    DisputerDidNotSubmitGpkj(Address),

    #[error("Accused did not submit GPKJ: {0:02x?}")]
    AccusedDidNotSubmitGpkj(Address),

    #[error("Argument lengths differ: {validators} validators, {hashes} hashes, {commitments} commitment vectors")]
    ArgumentsLengthMismatch {
        validators: usize,
        hashes: usize,
        commitments: usize,
    },

    #[error("Expected {expected} round participants, got {got}")]
    InvalidParticipantCount { expected: usize, got: usize },

    #[error("Validator listed twice: {0:02x?}")]
    DuplicateValidator(Address),

    #[error("Validator is not a participant of this round: {0:02x?}")]
    ValidatorNotParticipant(Address),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Errors raised by the snapshot entry points and reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Only validators allowed: {0:02x?}")]
    OnlyValidatorsAllowed(Address),

    #[error("Only the factory may call this: {0:02x?}")]
    OnlyFactory(Address),

    #[error("An ETHDKG round is running")]
    EthDkgRoundRunning,

    #[error("Consensus is not running")]
    ConsensusNotRunning,

    #[error("Minimum block interval not passed: at block {current}, next snapshot allowed at {allowed_at}")]
    MinimumBlocksIntervalNotPassed { current: u64, allowed_at: u64 },

    #[error("Signature was made with a key other than the active master public key")]
    InvalidMasterPublicKey,

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("Block claims could not be decoded")]
    InvalidBlockClaims,

    #[error("Invalid chain id: expected {expected}, got {got}")]
    InvalidChainId { expected: u32, got: u32 },

    #[error("Invalid block height: expected {expected}, got {got}")]
    InvalidBlockHeight { expected: u32, got: u32 },

    #[error("Validator {0:02x?} is not a participant of the completed round")]
    ValidatorNotParticipant(Address),

    #[error("Validator {validator:02x?} is not elected to snapshot at block {block}")]
    ValidatorNotElected { validator: Address, block: u64 },

    #[error("Snapshot for epoch {0} is not in the buffer")]
    SnapshotsNotInBuffer(u32),

    #[error("Migration not allowed at epoch {0}")]
    MigrationNotAllowedAtCurrentEpoch(u32),

    #[error("Migration input lengths differ: {signatures} signatures, {claims} claims")]
    MigrationInputDataMismatch { signatures: usize, claims: usize },
}

/// Error returned by the call dispatcher and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error(transparent)]
    EthDkg(#[from] EthDkgError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
