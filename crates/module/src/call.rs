//! Call message types for the ETHDKG and snapshot modules.

use borsh::{BorshDeserialize, BorshSerialize};

use ethdkg_types::{Address, DiscreteLogProof, EncryptedShare, G1Point, G2Point, GroupSignature};

use crate::accusations::{
    handle_accuse_did_not_distribute_shares, handle_accuse_did_not_submit_gpkj,
    handle_accuse_did_not_submit_key_shares, handle_accuse_distributed_bad_shares,
    handle_accuse_not_registered, handle_accuse_submitted_bad_gpkj,
};
use crate::error::ModuleError;
use crate::handlers::{
    handle_complete, handle_distribute_shares, handle_initialize_ethdkg, handle_migrate_validators,
    handle_register, handle_submit_gpkj, handle_submit_key_share, handle_submit_master_public_key,
    CallContext,
};
use crate::pool::ValidatorPool;
use crate::snapshots::{handle_migrate_snapshots, handle_snapshot};
use crate::state::ModuleState;

/// Call messages for the module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ModuleCall {
    // === Round lifecycle ===
    /// Start a round (validator pool only).
    InitializeEthDkg,

    Register {
        public_key: G1Point,
    },

    DistributeShares {
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1Point>,
    },

    SubmitKeyShare {
        key_share_g1: G1Point,
        key_share_g1_correctness_proof: DiscreteLogProof,
        key_share_g2: G2Point,
    },

    /// Submit the master public key (anyone).
    SubmitMasterPublicKey {
        master_public_key: G2Point,
    },

    SubmitGpkj {
        gpkj: G2Point,
    },

    Complete,

    // === Accusations ===
    AccuseParticipantNotRegistered {
        dishonest_addresses: Vec<Address>,
    },

    AccuseParticipantDidNotDistributeShares {
        dishonest_addresses: Vec<Address>,
    },

    AccuseParticipantDistributedBadShares {
        dishonest_address: Address,
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1Point>,
        shared_key: G1Point,
        shared_key_correctness_proof: DiscreteLogProof,
    },

    AccuseParticipantDidNotSubmitKeyShares {
        dishonest_addresses: Vec<Address>,
    },

    AccuseParticipantDidNotSubmitGpkj {
        dishonest_addresses: Vec<Address>,
    },

    AccuseParticipantSubmittedBadGpkj {
        validators: Vec<Address>,
        encrypted_shares_hashes: Vec<[u8; 32]>,
        commitments: Vec<Vec<G1Point>>,
        dishonest_address: Address,
    },

    // === Snapshots ===
    Snapshot {
        signature: GroupSignature,
        /// Borsh-encoded block claims, as signed
        block_claims: Vec<u8>,
    },

    // === Migration (factory only) ===
    MigrateValidators {
        accounts: Vec<Address>,
        indices: Vec<u32>,
        gpkjs: Vec<G2Point>,
        epoch: u32,
        side_chain_height: u32,
        eth_height: u64,
        master_public_key: G2Point,
    },

    MigrateSnapshots {
        signatures: Vec<GroupSignature>,
        block_claims: Vec<Vec<u8>>,
    },
}

impl ModuleCall {
    /// Route the call to its handler.
    pub fn dispatch<P: ValidatorPool>(
        self,
        state: &mut ModuleState,
        pool: &mut P,
        ctx: &CallContext,
    ) -> Result<(), ModuleError> {
        match self {
            ModuleCall::InitializeEthDkg => handle_initialize_ethdkg(state, pool, ctx)?,
            ModuleCall::Register { public_key } => handle_register(state, pool, ctx, public_key)?,
            ModuleCall::DistributeShares {
                encrypted_shares,
                commitments,
            } => handle_distribute_shares(state, pool, ctx, encrypted_shares, commitments)?,
            ModuleCall::SubmitKeyShare {
                key_share_g1,
                key_share_g1_correctness_proof,
                key_share_g2,
            } => handle_submit_key_share(
                state,
                pool,
                ctx,
                key_share_g1,
                key_share_g1_correctness_proof,
                key_share_g2,
            )?,
            ModuleCall::SubmitMasterPublicKey { master_public_key } => {
                handle_submit_master_public_key(state, ctx, master_public_key)?
            }
            ModuleCall::SubmitGpkj { gpkj } => handle_submit_gpkj(state, pool, ctx, gpkj)?,
            ModuleCall::Complete => handle_complete(state, pool, ctx)?,
            ModuleCall::AccuseParticipantNotRegistered { dishonest_addresses } => {
                handle_accuse_not_registered(state, pool, ctx, dishonest_addresses)?
            }
            ModuleCall::AccuseParticipantDidNotDistributeShares { dishonest_addresses } => {
                handle_accuse_did_not_distribute_shares(state, pool, ctx, dishonest_addresses)?
            }
            ModuleCall::AccuseParticipantDistributedBadShares {
                dishonest_address,
                encrypted_shares,
                commitments,
                shared_key,
                shared_key_correctness_proof,
            } => handle_accuse_distributed_bad_shares(
                state,
                pool,
                ctx,
                dishonest_address,
                encrypted_shares,
                commitments,
                shared_key,
                shared_key_correctness_proof,
            )?,
            ModuleCall::AccuseParticipantDidNotSubmitKeyShares { dishonest_addresses } => {
                handle_accuse_did_not_submit_key_shares(state, pool, ctx, dishonest_addresses)?
            }
            ModuleCall::AccuseParticipantDidNotSubmitGpkj { dishonest_addresses } => {
                handle_accuse_did_not_submit_gpkj(state, pool, ctx, dishonest_addresses)?
            }
            ModuleCall::AccuseParticipantSubmittedBadGpkj {
                validators,
                encrypted_shares_hashes,
                commitments,
                dishonest_address,
            } => {
                handle_accuse_submitted_bad_gpkj(
                    state,
                    pool,
                    ctx,
                    validators,
                    encrypted_shares_hashes,
                    commitments,
                    dishonest_address,
                )?;
            }
            ModuleCall::Snapshot {
                signature,
                block_claims,
            } => {
                handle_snapshot(state, pool, ctx, signature, block_claims)?;
            }
            ModuleCall::MigrateValidators {
                accounts,
                indices,
                gpkjs,
                epoch,
                side_chain_height,
                eth_height,
                master_public_key,
            } => handle_migrate_validators(
                state,
                ctx,
                accounts,
                indices,
                gpkjs,
                epoch,
                side_chain_height,
                eth_height,
                master_public_key,
            )?,
            ModuleCall::MigrateSnapshots {
                signatures,
                block_claims,
            } => {
                handle_migrate_snapshots(state, ctx, signatures, block_claims)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EthDkgError;
    use crate::genesis::{EthDkgGenesisConfig, DEFAULT_VALIDATOR_POOL};
    use crate::pool::InMemoryValidatorPool;

    #[test]
    fn test_call_roundtrips_through_borsh() {
        let call = ModuleCall::AccuseParticipantDidNotDistributeShares {
            dishonest_addresses: vec![[4u8; 20]],
        };
        let bytes = borsh::to_vec(&call).unwrap();
        assert_eq!(borsh::from_slice::<ModuleCall>(&bytes).unwrap(), call);
    }

    #[test]
    fn test_dispatch_routes_errors() {
        let mut state = ModuleState::from_genesis(&EthDkgGenesisConfig::default()).unwrap();
        let mut pool = InMemoryValidatorPool::new((1..=4).map(|i| [i; 20]).collect());

        let ctx = CallContext {
            sender: DEFAULT_VALIDATOR_POOL,
            block_height: 10,
        };
        ModuleCall::InitializeEthDkg.dispatch(&mut state, &mut pool, &ctx).unwrap();
        assert_eq!(state.ethdkg.nonce(), 1);

        let result = ModuleCall::Complete.dispatch(&mut state, &mut pool, &ctx);
        assert!(matches!(
            result,
            Err(ModuleError::EthDkg(EthDkgError::IncorrectPhase { .. }))
        ));
    }
}
