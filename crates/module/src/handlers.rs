//! Call handlers for the ETHDKG module.
//!
//! These functions implement the round lifecycle. Each handler validates
//! everything before it mutates anything, so a rejected call leaves the state
//! untouched.

use bls12_381::G1Projective;
use group::Curve;
use tracing::{debug, info};

use ethdkg_crypto::{
    compress_g1, decode_g1, decode_g2, h1, verify_dleq, verify_key_share_pair, CryptoError,
};
use ethdkg_types::{
    hash_commitments, hash_distributed_shares, hash_encrypted_shares, threshold, Address,
    DiscreteLogProof, EncryptedShare, G1Point, G2Point, Phase,
};

use crate::error::{EthDkgError, Window};
use crate::events::Event;
use crate::pool::{ValidatorPool, ValidatorRegistry};
use crate::state::{ModuleState, Participant, ParticipantLookup};

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, EthDkgError>;

pub(crate) fn require_validator<P: ValidatorRegistry + ?Sized>(pool: &P, address: &Address) -> HandlerResult<()> {
    if pool.is_validator(address) {
        Ok(())
    } else {
        Err(EthDkgError::OnlyValidatorsAllowed(*address))
    }
}

/// Handle InitializeEthDkg call.
///
/// Starts a new round. Allowed when consensus is paused and no round is
/// running, or the running round has halted.
pub fn handle_initialize_ethdkg<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    if ctx.sender != ethdkg.validator_pool {
        return Err(EthDkgError::OnlyValidatorPool(ctx.sender));
    }
    if pool.is_consensus_running() {
        return Err(EthDkgError::ConsensusRunning);
    }
    if ethdkg.controller.is_running() && !ethdkg.controller.is_halted(ctx.block_height) {
        return Err(EthDkgError::EthDkgRoundRunning);
    }
    let validators_count = pool.validators_count();
    if validators_count < ethdkg.min_validators {
        return Err(EthDkgError::MinimumValidatorsNotMet {
            required: ethdkg.min_validators,
            got: validators_count,
        });
    }

    ethdkg.bad_participants = 0;
    ethdkg.mpk_g1 = G1Point::default();
    ethdkg.pending_master_public_key = None;
    ethdkg.controller.start_round(ctx.block_height);

    let controller = &ethdkg.controller;
    info!(nonce = controller.nonce, validators_count, "ETHDKG round started");
    let event = Event::RegistrationOpened {
        start_block: controller.phase_start_block,
        validators_count,
        nonce: controller.nonce,
        phase_length: controller.phase_length,
        confirmation_length: controller.confirmation_length,
    };
    state.emit(event);
    Ok(())
}

/// Handle Register call.
pub fn handle_register<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    public_key: G1Point,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    ethdkg
        .controller
        .require(ctx.block_height, &[(Phase::RegistrationOpen, Window::Open)])?;
    require_validator(pool, &ctx.sender)?;

    if let ParticipantLookup::Current(_) = ethdkg.lookup(&ctx.sender) {
        return Err(EthDkgError::ParticipantAlreadyRegistered(ctx.sender));
    }
    if public_key.is_zero() {
        return Err(EthDkgError::PublicKeyZero);
    }
    decode_g1(&public_key).map_err(|e| match e {
        CryptoError::ZeroPoint => EthDkgError::PublicKeyZero,
        _ => EthDkgError::PublicKeyNotOnCurve,
    })?;

    let nonce = ethdkg.nonce();
    let index = ethdkg.controller.num_participants + 1;
    ethdkg
        .participants
        .insert(ctx.sender, Participant::registered(index, nonce, public_key));
    let next = ethdkg
        .controller
        .on_contribution(pool.validators_count(), ctx.block_height);

    debug!(index, nonce, "address registered");
    state.emit(Event::AddressRegistered {
        account: ctx.sender,
        index,
        nonce,
        public_key,
    });
    if next.is_some() {
        state.emit(Event::RegistrationComplete {
            block: ctx.block_height,
        });
    }
    Ok(())
}

/// Handle DistributeShares call.
///
/// Only the lengths and the commitments are checked here. Whether a share
/// is any good is settled in the dispute window.
pub fn handle_distribute_shares<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    encrypted_shares: Vec<EncryptedShare>,
    commitments: Vec<G1Point>,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    ethdkg
        .controller
        .require(ctx.block_height, &[(Phase::ShareDistribution, Window::Open)])?;
    require_validator(pool, &ctx.sender)?;

    let participant = ethdkg
        .current(&ctx.sender)
        .ok_or(EthDkgError::ParticipantNotRegistered(ctx.sender))?;
    if participant.has_distributed_shares() {
        return Err(EthDkgError::ParticipantDistributedSharesInRound(ctx.sender));
    }
    let index = participant.index;

    let validators_count = pool.validators_count();
    let expected_shares = validators_count.saturating_sub(1) as usize;
    if encrypted_shares.len() != expected_shares {
        return Err(EthDkgError::InvalidEncryptedSharesLength {
            expected: expected_shares,
            got: encrypted_shares.len(),
        });
    }
    let expected_commitments = threshold(validators_count) as usize + 1;
    if commitments.len() != expected_commitments {
        return Err(EthDkgError::InvalidCommitmentsLength {
            expected: expected_commitments,
            got: commitments.len(),
        });
    }
    for (i, commitment) in commitments.iter().enumerate() {
        decode_g1(commitment).map_err(|e| match e {
            CryptoError::ZeroPoint => EthDkgError::CommitmentZero(i),
            _ => EthDkgError::CommitmentNotOnCurve(i),
        })?;
    }

    let shares_hash = hash_distributed_shares(
        &hash_encrypted_shares(&encrypted_shares),
        &hash_commitments(&commitments),
    );
    let nonce = ethdkg.nonce();
    if let Some(participant) = ethdkg.current_mut(&ctx.sender) {
        participant.distributed_shares_hash = shares_hash;
        participant.commitments_first_coefficient = commitments[0];
        participant.phase = Phase::ShareDistribution;
    }
    let next = ethdkg
        .controller
        .on_contribution(validators_count, ctx.block_height);

    debug!(index, nonce, "shares distributed");
    state.emit(Event::SharesDistributed {
        account: ctx.sender,
        index,
        nonce,
        encrypted_shares,
        commitments,
    });
    if next.is_some() {
        state.emit(Event::ShareDistributionComplete {
            block: ctx.block_height,
        });
    }
    Ok(())
}

/// Handle SubmitKeyShare call.
///
/// Also accepted in the dispute window of `DisputeShareDistribution` when no
/// participant was evicted; the round then enters `KeyShareSubmission` in place.
pub fn handle_submit_key_share<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    key_share_g1: G1Point,
    key_share_g1_correctness_proof: DiscreteLogProof,
    key_share_g2: G2Point,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    let (phase, _) = ethdkg.controller.require(
        ctx.block_height,
        &[
            (Phase::KeyShareSubmission, Window::Open),
            (Phase::DisputeShareDistribution, Window::Dispute),
        ],
    )?;
    let enters_phase = phase == Phase::DisputeShareDistribution;
    if enters_phase && ethdkg.bad_participants > 0 {
        return Err(EthDkgError::UnresolvedBadParticipants(ethdkg.bad_participants));
    }
    require_validator(pool, &ctx.sender)?;

    let participant = ethdkg
        .current(&ctx.sender)
        .ok_or(EthDkgError::ParticipantNotRegistered(ctx.sender))?;
    if participant.has_submitted_key_share() {
        return Err(EthDkgError::ParticipantSubmittedKeySharesInRound(ctx.sender));
    }
    if !participant.has_distributed_shares() {
        return Err(EthDkgError::ParticipantDidNotDistributeShares(ctx.sender));
    }
    let index = participant.index;

    let g1 = decode_g1(&key_share_g1).map_err(|e| match e {
        CryptoError::ZeroPoint => EthDkgError::KeyShareZero,
        _ => EthDkgError::KeyShareNotOnCurve,
    })?;
    let g2 = decode_g2(&key_share_g2).map_err(|e| match e {
        CryptoError::ZeroPoint => EthDkgError::KeyShareZero,
        _ => EthDkgError::KeyShareNotOnCurve,
    })?;
    let commitment0 = decode_g1(&participant.commitments_first_coefficient)?;

    verify_dleq(
        &key_share_g1_correctness_proof,
        &bls12_381::G1Affine::generator(),
        &commitment0,
        &h1(),
        &g1,
    )
    .map_err(|_| EthDkgError::InvalidKeyShareProof)?;
    if !verify_key_share_pair(&g1, &g2) {
        return Err(EthDkgError::EllipticCurvePairingFailed);
    }

    let mpk_g1 = add_g1(&ethdkg.mpk_g1, &key_share_g1)?;

    if enters_phase {
        ethdkg.controller.enter_from_dispute(Phase::KeyShareSubmission);
    }
    let nonce = ethdkg.nonce();
    if let Some(participant) = ethdkg.current_mut(&ctx.sender) {
        participant.key_share_g1 = key_share_g1;
        participant.key_share_g1_correctness_proof = key_share_g1_correctness_proof.clone();
        participant.key_share_g2 = key_share_g2;
        participant.phase = Phase::KeyShareSubmission;
    }
    ethdkg.mpk_g1 = mpk_g1;
    let next = ethdkg
        .controller
        .on_contribution(pool.validators_count(), ctx.block_height);

    debug!(index, nonce, "key share submitted");
    state.emit(Event::KeyShareSubmitted {
        account: ctx.sender,
        index,
        nonce,
        key_share_g1,
        key_share_g1_correctness_proof,
        key_share_g2,
    });
    if next.is_some() {
        state.emit(Event::KeyShareSubmissionComplete {
            block: ctx.block_height,
        });
    }
    Ok(())
}

/// Handle SubmitMasterPublicKey call.
///
/// Open to anyone: the key is a function of the published key shares, and is
/// accepted only if it pairs with their G1 sum.
pub fn handle_submit_master_public_key(
    state: &mut ModuleState,
    ctx: &CallContext,
    master_public_key: G2Point,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    ethdkg
        .controller
        .require(ctx.block_height, &[(Phase::MPKSubmission, Window::Open)])?;

    let mpk = decode_g2(&master_public_key).map_err(|_| EthDkgError::EllipticCurvePairingFailed)?;
    let mpk_g1 = decode_g1(&ethdkg.mpk_g1).map_err(|_| EthDkgError::EllipticCurvePairingFailed)?;
    if !verify_key_share_pair(&mpk_g1, &mpk) {
        return Err(EthDkgError::EllipticCurvePairingFailed);
    }

    ethdkg.pending_master_public_key = Some(master_public_key);
    ethdkg.controller.set_phase(Phase::GPKJSubmission, ctx.block_height);

    let nonce = ethdkg.nonce();
    info!(nonce, "master public key set");
    state.emit(Event::MPKSet {
        block: ctx.block_height,
        nonce,
        mpk: master_public_key,
    });
    Ok(())
}

/// Handle SubmitGpkj call.
pub fn handle_submit_gpkj<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    gpkj: G2Point,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    ethdkg
        .controller
        .require(ctx.block_height, &[(Phase::GPKJSubmission, Window::Open)])?;
    require_validator(pool, &ctx.sender)?;

    let participant = ethdkg
        .current(&ctx.sender)
        .ok_or(EthDkgError::ParticipantNotRegistered(ctx.sender))?;
    if participant.has_submitted_gpkj() {
        return Err(EthDkgError::ParticipantSubmittedGpkjInRound(ctx.sender));
    }
    if !participant.has_submitted_key_share() {
        return Err(EthDkgError::ParticipantDidNotSubmitKeyShares(ctx.sender));
    }
    let index = participant.index;

    decode_g2(&gpkj).map_err(|e| match e {
        CryptoError::ZeroPoint => EthDkgError::GpkjZero,
        _ => EthDkgError::GpkjNotOnCurve,
    })?;

    let nonce = ethdkg.nonce();
    if let Some(participant) = ethdkg.current_mut(&ctx.sender) {
        participant.gpkj = gpkj;
        participant.phase = Phase::GPKJSubmission;
    }
    let next = ethdkg
        .controller
        .on_contribution(pool.validators_count(), ctx.block_height);

    debug!(index, nonce, "gpkj submitted");
    let epoch = state.snapshots.epoch;
    state.emit(Event::ValidatorMemberAdded {
        account: ctx.sender,
        index,
        nonce,
        epoch,
        gpkj,
    });
    if next.is_some() {
        state.emit(Event::GPKJSubmissionComplete {
            block: ctx.block_height,
        });
    }
    Ok(())
}

/// Handle Complete call.
///
/// Promotes the submitted master public key and starts consensus.
pub fn handle_complete<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    ethdkg
        .controller
        .require(ctx.block_height, &[(Phase::DisputeGPKJSubmission, Window::Dispute)])?;
    if ethdkg.bad_participants > 0 {
        return Err(EthDkgError::UnresolvedBadParticipants(ethdkg.bad_participants));
    }
    require_validator(pool, &ctx.sender)?;
    let mpk = ethdkg
        .pending_master_public_key
        .take()
        .ok_or(EthDkgError::MasterPublicKeyNotSet)?;

    ethdkg.activate_master_public_key(mpk);
    ethdkg.controller.set_phase(Phase::Completion, ctx.block_height);
    pool.complete_ethdkg();

    let nonce = ethdkg.nonce();
    let validator_count = pool.validators_count();
    let epoch = state.snapshots.epoch;
    let side_chain_height = state
        .snapshots
        .buffer
        .get(epoch)
        .map(|s| s.block_claims.height)
        .unwrap_or(0);

    info!(nonce, validator_count, epoch, "ETHDKG round completed");
    state.emit(Event::ValidatorSetCompleted {
        validator_count,
        nonce,
        epoch,
        eth_height: ctx.block_height,
        side_chain_height,
        mpk,
    });
    Ok(())
}

/// Handle MigrateValidators call.
///
/// Seeds round 1 as completed, skipping registration. Only the factory may
/// call this, and only before any round has run.
#[allow(clippy::too_many_arguments)]
pub fn handle_migrate_validators(
    state: &mut ModuleState,
    ctx: &CallContext,
    accounts: Vec<Address>,
    indices: Vec<u32>,
    gpkjs: Vec<G2Point>,
    epoch: u32,
    side_chain_height: u32,
    eth_height: u64,
    master_public_key: G2Point,
) -> HandlerResult<()> {
    let ethdkg = &mut state.ethdkg;
    if ctx.sender != ethdkg.factory {
        return Err(EthDkgError::OnlyFactory(ctx.sender));
    }
    if ethdkg.nonce() != 0 {
        return Err(EthDkgError::MigrationRequiresZeroNonce(ethdkg.nonce()));
    }
    if accounts.len() != indices.len() || accounts.len() != gpkjs.len() {
        return Err(EthDkgError::MigrationInputDataMismatch {
            accounts: accounts.len(),
            indices: indices.len(),
            gpkjs: gpkjs.len(),
        });
    }
    decode_g2(&master_public_key)?;

    ethdkg.controller.nonce = 1;
    ethdkg.controller.set_phase(Phase::Completion, ctx.block_height);
    ethdkg.activate_master_public_key(master_public_key);

    let mut events = Vec::with_capacity(accounts.len() + 1);
    for ((account, index), gpkj) in accounts.iter().zip(indices).zip(gpkjs) {
        let mut participant = Participant::registered(index, 1, G1Point::default());
        participant.phase = Phase::GPKJSubmission;
        participant.gpkj = gpkj;
        ethdkg.participants.insert(*account, participant);
        events.push(Event::ValidatorMemberAdded {
            account: *account,
            index,
            nonce: 1,
            epoch,
            gpkj,
        });
    }
    events.push(Event::ValidatorSetCompleted {
        validator_count: accounts.len() as u32,
        nonce: 1,
        epoch,
        eth_height,
        side_chain_height,
        mpk: master_public_key,
    });

    info!(validators = accounts.len(), epoch, "validators migrated");
    state.events.extend(events);
    Ok(())
}

/// Add a key share to the running G1 sum, where the all-zero encoding means empty.
fn add_g1(sum: &G1Point, point: &G1Point) -> HandlerResult<G1Point> {
    let point = G1Projective::from(decode_g1(point)?);
    if sum.is_zero() {
        return Ok(compress_g1(&point.to_affine()));
    }
    let sum = G1Projective::from(decode_g1(sum)?);
    Ok(compress_g1(&(sum + point).to_affine()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accusations::{handle_accuse_did_not_submit_gpkj, handle_accuse_did_not_submit_key_shares};
    use crate::genesis::EthDkgGenesisConfig;
    use crate::pool::{InMemoryValidatorPool, SlashKind};
    use bls12_381::G2Affine;
    use ethdkg_crypto::{compress_g2, random_scalar};
    use ethdkg_participant::{master_public_key, EthDkgParticipant, RosterEntry};
    use rand::rngs::OsRng;

    const POOL: Address = crate::genesis::DEFAULT_VALIDATOR_POOL;

    struct Setup {
        state: ModuleState,
        pool: InMemoryValidatorPool,
        participants: Vec<EthDkgParticipant>,
        block: u64,
    }

    impl Setup {
        fn new(n: u8) -> Self {
            let participants: Vec<_> = (1..=n)
                .map(|i| EthDkgParticipant::new([i; 20], &mut OsRng))
                .collect();
            let pool = InMemoryValidatorPool::new(participants.iter().map(|p| p.address()).collect());
            let state = ModuleState::from_genesis(&EthDkgGenesisConfig::default()).unwrap();
            Self {
                state,
                pool,
                participants,
                block: 100,
            }
        }

        fn ctx(&self, sender: Address) -> CallContext {
            CallContext {
                sender,
                block_height: self.block,
            }
        }

        fn start(&mut self) {
            let ctx = self.ctx(POOL);
            handle_initialize_ethdkg(&mut self.state, &mut self.pool, &ctx).unwrap();
            self.block = self.state.ethdkg.controller.phase_start_block;
        }

        fn register_all(&mut self) {
            for i in 0..self.participants.len() {
                let ctx = self.ctx(self.participants[i].address());
                let pk = self.participants[i].public_key();
                handle_register(&mut self.state, &mut self.pool, &ctx, pk).unwrap();
            }
            self.block = self.state.ethdkg.controller.phase_start_block;
        }

        fn roster(&self) -> Vec<RosterEntry> {
            self.state
                .ethdkg
                .round_participants()
                .into_iter()
                .map(|(address, p)| RosterEntry {
                    index: p.index,
                    address,
                    public_key: p.public_key,
                })
                .collect()
        }

        fn to_phase_start(&mut self) {
            self.block = self.state.ethdkg.controller.phase_start_block;
        }

        fn to_dispute_window(&mut self) {
            let controller = &self.state.ethdkg.controller;
            self.block = controller.phase_start_block + controller.phase_length;
        }

        /// Everyone deals and distributes, and every participant takes in its shares.
        fn distribute_all(&mut self) {
            let roster = self.roster();
            let dealt: Vec<_> = self
                .participants
                .iter_mut()
                .map(|p| p.deal(&roster, &mut OsRng).unwrap())
                .collect();
            for (i, shares) in dealt.iter().enumerate() {
                let ctx = self.ctx(self.participants[i].address());
                handle_distribute_shares(
                    &mut self.state,
                    &mut self.pool,
                    &ctx,
                    shares.encrypted_shares.clone(),
                    shares.commitments.clone(),
                )
                .unwrap();
            }
            for (dealer, shares) in dealt.iter().enumerate() {
                for (i, p) in self.participants.iter_mut().enumerate() {
                    if i != dealer {
                        p.receive_shares(dealer as u32 + 1, &shares.encrypted_shares, &shares.commitments)
                            .unwrap();
                    }
                }
            }
        }

        fn submit_key_share(&mut self, i: usize) -> HandlerResult<()> {
            let key_share = self.participants[i].key_share(&mut OsRng).unwrap();
            let ctx = self.ctx(self.participants[i].address());
            handle_submit_key_share(
                &mut self.state,
                &mut self.pool,
                &ctx,
                key_share.key_share_g1,
                key_share.correctness_proof,
                key_share.key_share_g2,
            )
        }

        /// Run the round up to an open MPK submission window.
        fn to_mpk_submission(&mut self) {
            self.start();
            self.register_all();
            self.distribute_all();
            self.to_dispute_window();
            for i in 0..self.participants.len() {
                self.submit_key_share(i).unwrap();
            }
            assert_eq!(self.state.ethdkg.controller.phase, Phase::MPKSubmission);
            self.to_phase_start();
        }

        fn submit_mpk(&mut self) {
            let key_shares: Vec<G2Point> = self
                .participants
                .iter()
                .map(|p| p.key_share(&mut OsRng).unwrap().key_share_g2)
                .collect();
            let mpk = master_public_key(&key_shares).unwrap();
            let ctx = self.ctx([0xaa; 20]);
            handle_submit_master_public_key(&mut self.state, &ctx, mpk).unwrap();
            self.to_phase_start();
        }
    }

    fn random_g2() -> G2Point {
        compress_g2(&(G2Affine::generator() * random_scalar(&mut OsRng)).to_affine())
    }

    #[test]
    fn test_initialize_requires_validator_pool() {
        let mut s = Setup::new(4);
        let ctx = s.ctx([9; 20]);
        assert_eq!(
            handle_initialize_ethdkg(&mut s.state, &mut s.pool, &ctx),
            Err(EthDkgError::OnlyValidatorPool([9; 20]))
        );
    }

    #[test]
    fn test_initialize_requires_min_validators() {
        let mut s = Setup::new(3);
        let ctx = s.ctx(POOL);
        assert_eq!(
            handle_initialize_ethdkg(&mut s.state, &mut s.pool, &ctx),
            Err(EthDkgError::MinimumValidatorsNotMet { required: 4, got: 3 })
        );
        assert_eq!(s.state.ethdkg.nonce(), 0);
    }

    #[test]
    fn test_initialize_rejected_while_round_runs() {
        let mut s = Setup::new(4);
        s.start();
        let ctx = s.ctx(POOL);
        assert_eq!(
            handle_initialize_ethdkg(&mut s.state, &mut s.pool, &ctx),
            Err(EthDkgError::EthDkgRoundRunning)
        );

        // Once halted the round may be restarted
        let controller = &s.state.ethdkg.controller;
        s.block = controller.phase_start_block + 2 * controller.phase_length;
        let ctx = s.ctx(POOL);
        handle_initialize_ethdkg(&mut s.state, &mut s.pool, &ctx).unwrap();
        assert_eq!(s.state.ethdkg.nonce(), 2);
    }

    #[test]
    fn test_registration_flow() {
        let mut s = Setup::new(4);
        s.start();
        assert!(matches!(s.state.events[0], Event::RegistrationOpened { nonce: 1, validators_count: 4, .. }));

        s.register_all();
        assert_eq!(s.state.ethdkg.controller.phase, Phase::ShareDistribution);
        assert_eq!(s.state.ethdkg.current(&[3; 20]).unwrap().index, 3);
        assert!(s
            .state
            .events
            .iter()
            .any(|e| matches!(e, Event::RegistrationComplete { .. })));
    }

    #[test]
    fn test_register_rejections() {
        let mut s = Setup::new(4);

        // Before any round
        let ctx = s.ctx([1; 20]);
        let pk = s.participants[0].public_key();
        assert!(matches!(
            handle_register(&mut s.state, &mut s.pool, &ctx, pk),
            Err(EthDkgError::IncorrectPhase { .. })
        ));

        s.start();
        let ctx = s.ctx([42; 20]);
        assert_eq!(
            handle_register(&mut s.state, &mut s.pool, &ctx, pk),
            Err(EthDkgError::OnlyValidatorsAllowed([42; 20]))
        );

        let ctx = s.ctx([1; 20]);
        assert_eq!(
            handle_register(&mut s.state, &mut s.pool, &ctx, G1Point::default()),
            Err(EthDkgError::PublicKeyZero)
        );
        let mut garbage = [0u8; 48];
        garbage[0] = 0x80;
        garbage[47] = 3;
        assert_eq!(
            handle_register(&mut s.state, &mut s.pool, &ctx, G1Point(garbage)),
            Err(EthDkgError::PublicKeyNotOnCurve)
        );

        handle_register(&mut s.state, &mut s.pool, &ctx, pk).unwrap();
        assert_eq!(
            handle_register(&mut s.state, &mut s.pool, &ctx, pk),
            Err(EthDkgError::ParticipantAlreadyRegistered([1; 20]))
        );
    }

    #[test]
    fn test_distribute_shares_checks_lengths() {
        let mut s = Setup::new(4);
        s.start();
        s.register_all();
        let roster = s.roster();
        let dealt = s.participants[0].deal(&roster, &mut OsRng).unwrap();
        let ctx = s.ctx([1; 20]);

        let mut short = dealt.encrypted_shares.clone();
        short.pop();
        assert_eq!(
            handle_distribute_shares(&mut s.state, &mut s.pool, &ctx, short, dealt.commitments.clone()),
            Err(EthDkgError::InvalidEncryptedSharesLength { expected: 3, got: 2 })
        );

        let mut commitments = dealt.commitments.clone();
        commitments.push(commitments[0]);
        assert_eq!(
            handle_distribute_shares(&mut s.state, &mut s.pool, &ctx, dealt.encrypted_shares.clone(), commitments),
            Err(EthDkgError::InvalidCommitmentsLength { expected: 3, got: 4 })
        );

        let mut commitments = dealt.commitments.clone();
        commitments[1] = G1Point::default();
        assert_eq!(
            handle_distribute_shares(&mut s.state, &mut s.pool, &ctx, dealt.encrypted_shares.clone(), commitments),
            Err(EthDkgError::CommitmentZero(1))
        );

        // Zero shares are accepted here; bad ones are disputed later
        let zero_shares = vec![[0u8; 32]; 3];
        handle_distribute_shares(&mut s.state, &mut s.pool, &ctx, zero_shares, dealt.commitments.clone()).unwrap();
        assert_eq!(
            handle_distribute_shares(
                &mut s.state,
                &mut s.pool,
                &ctx,
                dealt.encrypted_shares.clone(),
                dealt.commitments.clone()
            ),
            Err(EthDkgError::ParticipantDistributedSharesInRound([1; 20]))
        );
    }

    #[test]
    fn test_key_share_requires_distribution_phase_complete() {
        let mut s = Setup::new(4);
        s.start();
        s.register_all();
        let roster = s.roster();
        let dealt = s.participants[0].deal(&roster, &mut OsRng).unwrap();
        let ctx = s.ctx([1; 20]);
        handle_distribute_shares(&mut s.state, &mut s.pool, &ctx, dealt.encrypted_shares, dealt.commitments).unwrap();

        let key_share = s.participants[0].key_share(&mut OsRng).unwrap();
        let result = handle_submit_key_share(
            &mut s.state,
            &mut s.pool,
            &ctx,
            key_share.key_share_g1,
            key_share.correctness_proof,
            key_share.key_share_g2,
        );
        assert!(matches!(result, Err(EthDkgError::IncorrectPhase { current: Phase::ShareDistribution, .. })));
    }

    #[test]
    fn test_add_g1_accumulates() {
        let a = compress_g1(&bls12_381::G1Affine::generator());
        let sum = add_g1(&G1Point::default(), &a).unwrap();
        assert_eq!(sum, a);

        let doubled = add_g1(&sum, &a).unwrap();
        let expected = compress_g1(&(G1Projective::generator() + G1Projective::generator()).to_affine());
        assert_eq!(doubled, expected);
    }

    #[test]
    fn test_submit_key_share_rejections() {
        let mut s = Setup::new(4);
        s.start();
        s.register_all();
        s.distribute_all();
        s.to_dispute_window();

        let ctx = s.ctx([1; 20]);
        let own = s.participants[0].key_share(&mut OsRng).unwrap();
        let other = s.participants[1].key_share(&mut OsRng).unwrap();
        let mut submit = |g1: G1Point, proof: &DiscreteLogProof, g2: G2Point| {
            handle_submit_key_share(&mut s.state, &mut s.pool, &ctx, g1, proof.clone(), g2)
        };

        assert_eq!(
            submit(G1Point::default(), &own.correctness_proof, own.key_share_g2),
            Err(EthDkgError::KeyShareZero)
        );
        assert_eq!(
            submit(own.key_share_g1, &own.correctness_proof, G2Point::default()),
            Err(EthDkgError::KeyShareZero)
        );
        assert_eq!(
            submit(own.key_share_g1, &other.correctness_proof, own.key_share_g2),
            Err(EthDkgError::InvalidKeyShareProof)
        );
        assert_eq!(
            submit(own.key_share_g1, &own.correctness_proof, other.key_share_g2),
            Err(EthDkgError::EllipticCurvePairingFailed)
        );
        assert_eq!(
            submit(own.key_share_g1, &own.correctness_proof, own.key_share_g2),
            Ok(())
        );
        assert_eq!(
            submit(own.key_share_g1, &own.correctness_proof, own.key_share_g2),
            Err(EthDkgError::ParticipantSubmittedKeySharesInRound([1; 20]))
        );

        // The first key share moved the round into key share submission in place
        let controller = &s.state.ethdkg.controller;
        assert_eq!(controller.phase, Phase::KeyShareSubmission);
        assert_eq!(controller.phase_start_block, s.block);
        assert_eq!(controller.num_participants, 1);
    }

    #[test]
    fn test_accuse_did_not_submit_key_shares() {
        let mut s = Setup::new(4);
        s.start();
        s.register_all();
        s.distribute_all();
        s.to_dispute_window();
        for i in 0..3 {
            s.submit_key_share(i).unwrap();
        }
        assert_eq!(s.state.ethdkg.controller.phase, Phase::KeyShareSubmission);

        let ctx = s.ctx([1; 20]);
        assert!(matches!(
            handle_accuse_did_not_submit_key_shares(&mut s.state, &mut s.pool, &ctx, vec![[4; 20]]),
            Err(EthDkgError::IncorrectPhase { .. })
        ));

        s.to_dispute_window();
        let ctx = s.ctx([1; 20]);
        assert_eq!(
            handle_accuse_did_not_submit_key_shares(&mut s.state, &mut s.pool, &ctx, vec![[2; 20]]),
            Err(EthDkgError::AccusedParticipatingInRound {
                accused: [2; 20],
                phase: Phase::KeyShareSubmission
            })
        );
        handle_accuse_did_not_submit_key_shares(&mut s.state, &mut s.pool, &ctx, vec![[4; 20]]).unwrap();
        assert_eq!(s.state.ethdkg.bad_participants, 1);
        assert_eq!(s.pool.slashes()[0].kind, SlashKind::Minor);
        assert_eq!(s.pool.slashes()[0].infringer, [4; 20]);
        assert_eq!(s.state.ethdkg.controller.phase, Phase::KeyShareSubmission);
    }

    #[test]
    fn test_submit_master_public_key_rejections() {
        let mut s = Setup::new(4);
        s.to_mpk_submission();

        let ctx = s.ctx([0xaa; 20]);
        assert_eq!(
            handle_submit_master_public_key(&mut s.state, &ctx, G2Point::default()),
            Err(EthDkgError::EllipticCurvePairingFailed)
        );
        assert_eq!(
            handle_submit_master_public_key(&mut s.state, &ctx, random_g2()),
            Err(EthDkgError::EllipticCurvePairingFailed)
        );
        assert_eq!(s.state.ethdkg.controller.phase, Phase::MPKSubmission);

        s.submit_mpk();
        assert_eq!(s.state.ethdkg.controller.phase, Phase::GPKJSubmission);
        assert!(s.state.ethdkg.pending_master_public_key.is_some());
        // Only completion activates the key
        assert_eq!(s.state.ethdkg.master_public_key, None);
    }

    #[test]
    fn test_submit_gpkj_rejections_and_accusation() {
        let mut s = Setup::new(4);
        s.to_mpk_submission();
        s.submit_mpk();

        let ctx = s.ctx([1; 20]);
        assert_eq!(
            handle_submit_gpkj(&mut s.state, &mut s.pool, &ctx, G2Point::default()),
            Err(EthDkgError::GpkjZero)
        );
        let gpkj = s.participants[0].gpkj().unwrap();
        handle_submit_gpkj(&mut s.state, &mut s.pool, &ctx, gpkj).unwrap();
        assert_eq!(
            handle_submit_gpkj(&mut s.state, &mut s.pool, &ctx, gpkj),
            Err(EthDkgError::ParticipantSubmittedGpkjInRound([1; 20]))
        );
        for i in 1..3 {
            let ctx = s.ctx(s.participants[i].address());
            let gpkj = s.participants[i].gpkj().unwrap();
            handle_submit_gpkj(&mut s.state, &mut s.pool, &ctx, gpkj).unwrap();
        }
        assert_eq!(s.state.ethdkg.controller.phase, Phase::GPKJSubmission);

        s.to_dispute_window();
        let ctx = s.ctx([2; 20]);
        assert_eq!(
            handle_accuse_did_not_submit_gpkj(&mut s.state, &mut s.pool, &ctx, vec![[1; 20]]),
            Err(EthDkgError::AccusedParticipatingInRound {
                accused: [1; 20],
                phase: Phase::GPKJSubmission
            })
        );
        handle_accuse_did_not_submit_gpkj(&mut s.state, &mut s.pool, &ctx, vec![[4; 20]]).unwrap();
        assert_eq!(s.state.ethdkg.bad_participants, 1);
        assert_eq!(s.pool.slashes()[0].infringer, [4; 20]);
        assert_eq!(s.state.ethdkg.controller.phase, Phase::GPKJSubmission);

        // Without every gpkj the round never reaches its completion window
        let ctx = s.ctx([2; 20]);
        assert!(matches!(
            handle_complete(&mut s.state, &mut s.pool, &ctx),
            Err(EthDkgError::IncorrectPhase { .. })
        ));
    }
}
