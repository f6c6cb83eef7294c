//! Query handlers for the ETHDKG and snapshot modules.
//!
//! These functions provide read-only access to module state.

use serde::{Deserialize, Serialize};

use ethdkg_types::{Address, BlockClaims, G2Point, GroupSignature, Phase, Snapshot};

use crate::error::ModuleError;
use crate::snapshots::{epoch_from_height, may_validator_snapshot};
use crate::state::{ModuleState, Participant};

/// Query request types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleQuery {
    // === ETHDKG ===
    GetPhase,
    GetNonce,
    GetPhaseStartBlock,
    GetPhaseLength,
    GetConfirmationLength,
    /// Contributions accepted in the current phase.
    GetNumParticipants,
    GetBadParticipants,
    GetMinValidators,
    IsRunning,
    IsCompleted,
    /// Halting depends on the block the query is evaluated at.
    IsHalted,
    IsMasterPublicKeySet,
    GetMasterPublicKey,
    GetMasterPublicKeyHash,
    GetParticipantInternalState { address: Address },
    GetParticipantsInternalState { addresses: Vec<Address> },

    // === Snapshots ===
    GetSnapshot { epoch: u32 },
    GetLatestSnapshot,
    GetEpoch,
    GetEpochLength,
    GetChainId,
    GetChainIdFromSnapshot { epoch: u32 },
    GetChainIdFromLatestSnapshot,
    GetSidechainHeightFromSnapshot { epoch: u32 },
    GetSidechainHeightFromLatestSnapshot,
    GetCommittedHeightFromSnapshot { epoch: u32 },
    GetCommittedHeightFromLatestSnapshot,
    GetBlockClaimsFromSnapshot { epoch: u32 },
    GetBlockClaimsFromLatestSnapshot,
    GetSignatureFromSnapshot { epoch: u32 },
    GetEpochFromHeight { height: u32 },
    /// Pure election check with caller-supplied inputs.
    MayValidatorSnapshot {
        num_validators: u32,
        validator_index: u32,
        blocks_since_desperation: u64,
        seed: [u8; 32],
        desperation_factor: u64,
    },
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleQueryResponse {
    Phase(Phase),
    Number(u64),
    Flag(bool),
    MasterPublicKey(Option<G2Point>),
    Hash([u8; 32]),
    Participant(Option<Participant>),
    Participants(Vec<Option<Participant>>),
    Snapshot(Snapshot),
    BlockClaims(BlockClaims),
    Signature(GroupSignature),
}

/// Handle a query at `block_height`.
pub fn handle_query(
    state: &ModuleState,
    block_height: u64,
    query: ModuleQuery,
) -> Result<ModuleQueryResponse, ModuleError> {
    let ethdkg = &state.ethdkg;
    let controller = &ethdkg.controller;
    let snapshots = &state.snapshots;

    let response = match query {
        ModuleQuery::GetPhase => ModuleQueryResponse::Phase(controller.phase),
        ModuleQuery::GetNonce => ModuleQueryResponse::Number(controller.nonce),
        ModuleQuery::GetPhaseStartBlock => ModuleQueryResponse::Number(controller.phase_start_block),
        ModuleQuery::GetPhaseLength => ModuleQueryResponse::Number(controller.phase_length),
        ModuleQuery::GetConfirmationLength => ModuleQueryResponse::Number(controller.confirmation_length),
        ModuleQuery::GetNumParticipants => ModuleQueryResponse::Number(controller.num_participants as u64),
        ModuleQuery::GetBadParticipants => ModuleQueryResponse::Number(ethdkg.bad_participants as u64),
        ModuleQuery::GetMinValidators => ModuleQueryResponse::Number(ethdkg.min_validators as u64),
        ModuleQuery::IsRunning => ModuleQueryResponse::Flag(controller.is_running()),
        ModuleQuery::IsCompleted => ModuleQueryResponse::Flag(controller.is_completed()),
        ModuleQuery::IsHalted => ModuleQueryResponse::Flag(controller.is_halted(block_height)),
        ModuleQuery::IsMasterPublicKeySet => ModuleQueryResponse::Flag(ethdkg.master_public_key.is_some()),
        ModuleQuery::GetMasterPublicKey => ModuleQueryResponse::MasterPublicKey(ethdkg.master_public_key),
        ModuleQuery::GetMasterPublicKeyHash => ModuleQueryResponse::Hash(ethdkg.master_public_key_hash),
        ModuleQuery::GetParticipantInternalState { address } => {
            ModuleQueryResponse::Participant(ethdkg.participants.get(&address).cloned())
        }
        ModuleQuery::GetParticipantsInternalState { addresses } => ModuleQueryResponse::Participants(
            addresses
                .iter()
                .map(|address| ethdkg.participants.get(address).cloned())
                .collect(),
        ),

        ModuleQuery::GetSnapshot { epoch } => ModuleQueryResponse::Snapshot(snapshots.get(epoch)?.clone()),
        ModuleQuery::GetLatestSnapshot => ModuleQueryResponse::Snapshot(snapshots.latest()?.clone()),
        ModuleQuery::GetEpoch => ModuleQueryResponse::Number(snapshots.epoch as u64),
        ModuleQuery::GetEpochLength => ModuleQueryResponse::Number(snapshots.config.epoch_length as u64),
        ModuleQuery::GetChainId => ModuleQueryResponse::Number(snapshots.config.chain_id as u64),
        ModuleQuery::GetChainIdFromSnapshot { epoch } => {
            ModuleQueryResponse::Number(snapshots.get(epoch)?.block_claims.chain_id as u64)
        }
        ModuleQuery::GetChainIdFromLatestSnapshot => {
            ModuleQueryResponse::Number(snapshots.latest()?.block_claims.chain_id as u64)
        }
        ModuleQuery::GetSidechainHeightFromSnapshot { epoch } => {
            ModuleQueryResponse::Number(snapshots.get(epoch)?.block_claims.height as u64)
        }
        ModuleQuery::GetSidechainHeightFromLatestSnapshot => {
            ModuleQueryResponse::Number(snapshots.latest()?.block_claims.height as u64)
        }
        ModuleQuery::GetCommittedHeightFromSnapshot { epoch } => {
            ModuleQueryResponse::Number(snapshots.get(epoch)?.committed_at)
        }
        ModuleQuery::GetCommittedHeightFromLatestSnapshot => {
            ModuleQueryResponse::Number(snapshots.latest()?.committed_at)
        }
        ModuleQuery::GetBlockClaimsFromSnapshot { epoch } => {
            ModuleQueryResponse::BlockClaims(snapshots.get(epoch)?.block_claims.clone())
        }
        ModuleQuery::GetBlockClaimsFromLatestSnapshot => {
            ModuleQueryResponse::BlockClaims(snapshots.latest()?.block_claims.clone())
        }
        ModuleQuery::GetSignatureFromSnapshot { epoch } => {
            ModuleQueryResponse::Signature(snapshots.get(epoch)?.signature.clone())
        }
        ModuleQuery::GetEpochFromHeight { height } => {
            ModuleQueryResponse::Number(epoch_from_height(height, snapshots.config.epoch_length) as u64)
        }
        ModuleQuery::MayValidatorSnapshot {
            num_validators,
            validator_index,
            blocks_since_desperation,
            seed,
            desperation_factor,
        } => ModuleQueryResponse::Flag(may_validator_snapshot(
            num_validators,
            validator_index,
            blocks_since_desperation,
            &seed,
            desperation_factor,
        )),
    };
    Ok(response)
}
