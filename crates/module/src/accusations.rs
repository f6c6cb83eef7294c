//! Accusation engine.
//!
//! Each contribution phase has a dispute window in which any participant may
//! prove that another one failed to contribute, or contributed bad material.
//! A proven accusation slashes the offender through the validator pool, which
//! also removes it from the validator set, and counts it as a bad participant.
//! A round with bad participants cannot complete and has to be restarted.

use std::collections::BTreeSet;

use bls12_381::{G1Affine, G1Projective};
use group::Curve;
use tracing::warn;

use ethdkg_crypto::{
    decode_g1, decode_g2, decrypt_share, evaluate_commitments, share_position, verify_dleq,
    verify_gpkj, verify_share,
};
use ethdkg_types::{
    hash_commitments, hash_distributed_shares, hash_encrypted_shares, threshold, Address,
    DiscreteLogProof, EncryptedShare, G1Point, Phase,
};

use crate::error::{EthDkgError, Window};
use crate::events::Event;
use crate::handlers::{require_validator, CallContext, HandlerResult};
use crate::pool::ValidatorPool;
use crate::state::{ModuleState, Participant, ParticipantLookup};

/// Who a bad GPKJ accusation ended up evicting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpkjAccusationOutcome {
    /// The GPKJ did not match the commitments
    AccusedEvicted(Address),
    /// The GPKJ was correct; the accuser pays for the false accusation
    AccuserEvicted(Address),
}

/// What a missing-contribution accusation checks in its phase.
#[derive(Clone, Copy)]
enum Missing {
    Registration,
    Shares,
    KeyShare,
    Gpkj,
}

impl Missing {
    fn phase(self) -> Phase {
        match self {
            Missing::Registration => Phase::RegistrationOpen,
            Missing::Shares => Phase::ShareDistribution,
            Missing::KeyShare => Phase::KeyShareSubmission,
            Missing::Gpkj => Phase::GPKJSubmission,
        }
    }

    fn contributed(self, participant: &Participant) -> bool {
        match self {
            Missing::Registration => true,
            Missing::Shares => participant.has_distributed_shares(),
            Missing::KeyShare => participant.has_submitted_key_share(),
            Missing::Gpkj => participant.has_submitted_gpkj(),
        }
    }
}

/// Evict everyone in `accused`, which has already been validated.
fn evict_minor<P: ValidatorPool>(state: &mut ModuleState, pool: &mut P, accuser: &Address, accused: &[Address]) {
    let nonce = state.ethdkg.nonce();
    for account in accused {
        pool.minor_slash(account, accuser);
        state.ethdkg.bad_participants += 1;
        warn!(account = ?account, nonce, "participant evicted");
        state.emit(Event::ParticipantEvicted {
            account: *account,
            disputer: *accuser,
            nonce,
            major: false,
        });
    }
}

fn accuse_missing<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    missing: Missing,
    dishonest_addresses: Vec<Address>,
) -> HandlerResult<()> {
    let ethdkg = &state.ethdkg;
    ethdkg
        .controller
        .require(ctx.block_height, &[(missing.phase(), Window::Dispute)])?;
    require_validator(pool, &ctx.sender)?;

    let mut seen = BTreeSet::new();
    for account in &dishonest_addresses {
        if !seen.insert(*account) {
            return Err(EthDkgError::DuplicateAccusation(*account));
        }
        if !pool.is_validator(account) {
            return Err(EthDkgError::AccusedNotValidator(*account));
        }
        match (missing, ethdkg.lookup(account)) {
            (Missing::Registration, ParticipantLookup::Current(_)) => {
                return Err(EthDkgError::AccusedParticipatingInRound {
                    accused: *account,
                    phase: Phase::RegistrationOpen,
                });
            }
            (Missing::Registration, _) => {}
            (_, ParticipantLookup::Current(participant)) => {
                if missing.contributed(participant) {
                    return Err(EthDkgError::AccusedParticipatingInRound {
                        accused: *account,
                        phase: missing.phase(),
                    });
                }
            }
            (_, _) => return Err(EthDkgError::AccusedNotParticipatingInRound(*account)),
        }
    }

    evict_minor(state, pool, &ctx.sender, &dishonest_addresses);
    Ok(())
}

/// Handle AccuseParticipantNotRegistered call.
pub fn handle_accuse_not_registered<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    dishonest_addresses: Vec<Address>,
) -> HandlerResult<()> {
    accuse_missing(state, pool, ctx, Missing::Registration, dishonest_addresses)
}

/// Handle AccuseParticipantDidNotDistributeShares call.
pub fn handle_accuse_did_not_distribute_shares<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    dishonest_addresses: Vec<Address>,
) -> HandlerResult<()> {
    accuse_missing(state, pool, ctx, Missing::Shares, dishonest_addresses)
}

/// Handle AccuseParticipantDidNotSubmitKeyShares call.
pub fn handle_accuse_did_not_submit_key_shares<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    dishonest_addresses: Vec<Address>,
) -> HandlerResult<()> {
    accuse_missing(state, pool, ctx, Missing::KeyShare, dishonest_addresses)
}

/// Handle AccuseParticipantDidNotSubmitGpkj call.
pub fn handle_accuse_did_not_submit_gpkj<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    dishonest_addresses: Vec<Address>,
) -> HandlerResult<()> {
    accuse_missing(state, pool, ctx, Missing::Gpkj, dishonest_addresses)
}

/// Handle AccuseParticipantDistributedBadShares call.
///
/// The accuser re-supplies the dealer's published shares and commitments and
/// reveals their shared key with a proof that it is `sk_accuser·pk_dealer`.
/// Anyone can then unmask the accuser's share and check it.
#[allow(clippy::too_many_arguments)]
pub fn handle_accuse_distributed_bad_shares<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    dishonest_address: Address,
    encrypted_shares: Vec<EncryptedShare>,
    commitments: Vec<G1Point>,
    shared_key: G1Point,
    shared_key_correctness_proof: DiscreteLogProof,
) -> HandlerResult<()> {
    let ethdkg = &state.ethdkg;
    ethdkg.controller.require(
        ctx.block_height,
        &[
            (Phase::DisputeShareDistribution, Window::Open),
            (Phase::ShareDistribution, Window::Dispute),
        ],
    )?;
    require_validator(pool, &ctx.sender)?;

    if !pool.is_validator(&dishonest_address) {
        return Err(EthDkgError::AccusedNotValidator(dishonest_address));
    }
    if dishonest_address == ctx.sender {
        return Err(EthDkgError::CannotAccuseSelf);
    }
    let dishonest = ethdkg
        .current(&dishonest_address)
        .filter(|p| p.has_distributed_shares())
        .ok_or(EthDkgError::DishonestParticipantDidNotDistributeShares(dishonest_address))?;
    let accuser = ethdkg
        .current(&ctx.sender)
        .filter(|p| p.has_distributed_shares())
        .ok_or(EthDkgError::DisputerDidNotDistributeShares(ctx.sender))?;

    let supplied_hash = hash_distributed_shares(
        &hash_encrypted_shares(&encrypted_shares),
        &hash_commitments(&commitments),
    );
    if supplied_hash != dishonest.distributed_shares_hash {
        return Err(EthDkgError::SharesAndCommitmentsMismatch(dishonest_address));
    }

    let accuser_pk = decode_g1(&accuser.public_key)?;
    let dishonest_pk = decode_g1(&dishonest.public_key)?;
    let key = decode_g1(&shared_key).map_err(|_| EthDkgError::InvalidSharedKeyOrProof)?;
    verify_dleq(
        &shared_key_correctness_proof,
        &G1Affine::generator(),
        &accuser_pk,
        &dishonest_pk,
        &key,
    )
    .map_err(|_| EthDkgError::InvalidSharedKeyOrProof)?;

    let encrypted = share_position(dishonest.index, accuser.index)
        .and_then(|position| encrypted_shares.get(position))
        .ok_or(EthDkgError::SharesAndCommitmentsMismatch(dishonest_address))?;

    // A share that does not even decode to a scalar is bad.
    if let Ok(share) = decrypt_share(encrypted, &key, accuser.index) {
        let commitments = commitments
            .iter()
            .map(decode_g1)
            .collect::<Result<Vec<_>, _>>()?;
        if verify_share(&share, accuser.index, &commitments) {
            return Err(EthDkgError::AccusedDistributedGoodShare(dishonest_address));
        }
    }

    evict_minor(state, pool, &ctx.sender, &[dishonest_address]);
    Ok(())
}

/// Handle AccuseParticipantSubmittedBadGpkj call.
///
/// The accuser supplies every participant's encrypted shares hash and
/// commitments, which must match the records. From them the expected
/// `gpkj` of the accused is recomputed and paired against its submission.
/// Whoever is wrong is major-slashed: the accused on a mismatch, the accuser
/// when the submission was correct.
pub fn handle_accuse_submitted_bad_gpkj<P: ValidatorPool>(
    state: &mut ModuleState,
    pool: &mut P,
    ctx: &CallContext,
    validators: Vec<Address>,
    encrypted_shares_hashes: Vec<[u8; 32]>,
    commitments: Vec<Vec<G1Point>>,
    dishonest_address: Address,
) -> HandlerResult<GpkjAccusationOutcome> {
    let ethdkg = &state.ethdkg;
    ethdkg.controller.require(
        ctx.block_height,
        &[
            (Phase::DisputeGPKJSubmission, Window::Open),
            (Phase::GPKJSubmission, Window::Dispute),
        ],
    )?;
    require_validator(pool, &ctx.sender)?;

    if !pool.is_validator(&dishonest_address) {
        return Err(EthDkgError::AccusedNotValidator(dishonest_address));
    }
    if dishonest_address == ctx.sender {
        return Err(EthDkgError::CannotAccuseSelf);
    }
    ethdkg
        .current(&ctx.sender)
        .filter(|p| p.has_submitted_gpkj())
        .ok_or(EthDkgError::DisputerDidNotSubmitGpkj(ctx.sender))?;
    let dishonest = ethdkg
        .current(&dishonest_address)
        .filter(|p| p.has_submitted_gpkj())
        .ok_or(EthDkgError::AccusedDidNotSubmitGpkj(dishonest_address))?;

    if validators.len() != encrypted_shares_hashes.len() || validators.len() != commitments.len() {
        return Err(EthDkgError::ArgumentsLengthMismatch {
            validators: validators.len(),
            hashes: encrypted_shares_hashes.len(),
            commitments: commitments.len(),
        });
    }
    let round_size = ethdkg.round_participants().len();
    if validators.len() != round_size {
        return Err(EthDkgError::InvalidParticipantCount {
            expected: round_size,
            got: validators.len(),
        });
    }

    let expected_commitments = threshold(round_size as u32) as usize + 1;
    let mut seen = BTreeSet::new();
    let mut expected = G1Projective::identity();
    for ((validator, shares_hash), dealer_commitments) in
        validators.iter().zip(&encrypted_shares_hashes).zip(&commitments)
    {
        if !seen.insert(*validator) {
            return Err(EthDkgError::DuplicateValidator(*validator));
        }
        let dealer = ethdkg
            .current(validator)
            .ok_or(EthDkgError::ValidatorNotParticipant(*validator))?;
        if dealer_commitments.len() != expected_commitments {
            return Err(EthDkgError::InvalidCommitmentsLength {
                expected: expected_commitments,
                got: dealer_commitments.len(),
            });
        }
        let hash = hash_distributed_shares(shares_hash, &hash_commitments(dealer_commitments));
        if hash != dealer.distributed_shares_hash {
            return Err(EthDkgError::SharesAndCommitmentsMismatch(*validator));
        }

        let points = dealer_commitments
            .iter()
            .map(decode_g1)
            .collect::<Result<Vec<_>, _>>()?;
        expected += evaluate_commitments(&points, dishonest.index);
    }

    let gpkj = decode_g2(&dishonest.gpkj)?;
    let gpkj_is_correct = verify_gpkj(&expected.to_affine(), &gpkj);

    let (infringer, disputer, outcome) = if gpkj_is_correct {
        (ctx.sender, dishonest_address, GpkjAccusationOutcome::AccuserEvicted(ctx.sender))
    } else {
        (dishonest_address, ctx.sender, GpkjAccusationOutcome::AccusedEvicted(dishonest_address))
    };

    pool.major_slash(&infringer, &disputer);
    state.ethdkg.bad_participants += 1;
    let nonce = state.ethdkg.nonce();
    warn!(account = ?infringer, nonce, gpkj_is_correct, "participant evicted over gpkj accusation");
    state.emit(Event::ParticipantEvicted {
        account: infringer,
        disputer,
        nonce,
        major: true,
    });
    Ok(outcome)
}
