//! Snapshot submission and reads.
//!
//! Once a round completes, validators commit one snapshot of the sidechain
//! per epoch: the block claims at height `epoch·epochLength`, signed by the
//! validator group under the active master public key. The latest
//! `bufferCapacity` snapshots stay readable.

use tracing::{debug, info};

use ethdkg_crypto::verify_signature;
use ethdkg_types::{hash_master_public_key, sha256, BlockClaims, GroupSignature, Snapshot};

use crate::error::SnapshotError;
use crate::events::Event;
use crate::handlers::CallContext;
use crate::pool::ValidatorRegistry;
use crate::state::{ModuleState, SnapshotState};

/// Result type for snapshot handlers and reads.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

impl SnapshotState {
    /// Snapshot committed for `epoch`, if still in the buffer.
    pub fn get(&self, epoch: u32) -> SnapshotResult<&Snapshot> {
        if epoch == 0 || epoch > self.epoch {
            return Err(SnapshotError::SnapshotsNotInBuffer(epoch));
        }
        self.buffer
            .get(epoch)
            .ok_or(SnapshotError::SnapshotsNotInBuffer(epoch))
    }

    pub fn latest(&self) -> SnapshotResult<&Snapshot> {
        self.get(self.epoch)
    }

    /// Epoch a sidechain height belongs to.
    pub fn epoch_from_height(&self, height: u32) -> u32 {
        epoch_from_height(height, self.config.epoch_length)
    }

    /// Height the next snapshot must carry.
    pub fn next_height(&self) -> u64 {
        (self.epoch as u64 + 1) * self.config.epoch_length as u64
    }
}

/// Epoch a sidechain height belongs to: heights `1..=epochLength` are epoch 1.
pub fn epoch_from_height(height: u32, epoch_length: u32) -> u32 {
    if height <= epoch_length {
        return 1;
    }
    if height % epoch_length == 0 {
        height / epoch_length
    } else {
        height / epoch_length + 1
    }
}

/// Election seed for the snapshot at `height`, from the previous group signature.
pub fn election_seed(previous: &GroupSignature, height: u32) -> [u8; 32] {
    let mut data = Vec::with_capacity(48 + 4);
    data.extend_from_slice(&previous.signature.0);
    data.extend_from_slice(&height.to_be_bytes());
    sha256(&data)
}

/// Whether the validator at 0-based `validator_index` may submit a snapshot.
///
/// One validator is elected from `seed`. Once more than the desperation delay
/// has passed since the last snapshot, the elected range widens, each step
/// taking longer than the previous, up to a third of the validator set.
pub fn may_validator_snapshot(
    num_validators: u32,
    validator_index: u32,
    blocks_since_desperation: u64,
    seed: &[u8; 32],
    desperation_factor: u64,
) -> bool {
    if num_validators == 0 {
        return false;
    }
    let n = num_validators as u64;

    let mut allowed: u64 = 1;
    let mut desperation: u64 = 0;
    while desperation < blocks_since_desperation && allowed <= n / 3 {
        desperation += desperation_factor / allowed;
        allowed += 1;
    }

    let start = seed.iter().fold(0u64, |acc, byte| (acc * 256 + *byte as u64) % n);
    let end = (start + allowed) % n;
    let index = validator_index as u64;

    if end > start {
        index >= start && index < end
    } else {
        index >= start || index < end
    }
}

/// Handle Snapshot call.
pub fn handle_snapshot<P: ValidatorRegistry>(
    state: &mut ModuleState,
    pool: &P,
    ctx: &CallContext,
    signature: GroupSignature,
    block_claims: Vec<u8>,
) -> SnapshotResult<u32> {
    if !pool.is_validator(&ctx.sender) {
        return Err(SnapshotError::OnlyValidatorsAllowed(ctx.sender));
    }
    if state.ethdkg.controller.is_running() {
        return Err(SnapshotError::EthDkgRoundRunning);
    }
    if !pool.is_consensus_running() {
        return Err(SnapshotError::ConsensusNotRunning);
    }

    let snapshots = &state.snapshots;
    let previous = snapshots.latest().ok();
    if let Some(previous) = previous {
        let allowed_at = previous.committed_at + snapshots.config.minimum_interval_between_snapshots;
        if ctx.block_height < allowed_at {
            return Err(SnapshotError::MinimumBlocksIntervalNotPassed {
                current: ctx.block_height,
                allowed_at,
            });
        }
    }

    if state.ethdkg.master_public_key.is_none()
        || hash_master_public_key(&signature.public_key) != state.ethdkg.master_public_key_hash
    {
        return Err(SnapshotError::InvalidMasterPublicKey);
    }
    verify_signature(&signature.signature, &signature.public_key, &block_claims)
        .map_err(|_| SnapshotError::SignatureVerificationFailed)?;

    let claims = BlockClaims::from_bytes(&block_claims).ok_or(SnapshotError::InvalidBlockClaims)?;
    if claims.chain_id != snapshots.config.chain_id {
        return Err(SnapshotError::InvalidChainId {
            expected: snapshots.config.chain_id,
            got: claims.chain_id,
        });
    }
    let epoch = snapshots.epoch + 1;
    let expected_height = epoch as u64 * snapshots.config.epoch_length as u64;
    if claims.height as u64 != expected_height {
        return Err(SnapshotError::InvalidBlockHeight {
            expected: expected_height.min(u32::MAX as u64) as u32,
            got: claims.height,
        });
    }

    if let Some(previous) = previous {
        let participant = state
            .ethdkg
            .current(&ctx.sender)
            .ok_or(SnapshotError::ValidatorNotParticipant(ctx.sender))?;
        let blocks_since_desperation = ctx
            .block_height
            .saturating_sub(previous.committed_at)
            .saturating_sub(snapshots.config.desperation_delay);
        let seed = election_seed(&previous.signature, claims.height);
        if !may_validator_snapshot(
            pool.validators_count(),
            participant.index.saturating_sub(1),
            blocks_since_desperation,
            &seed,
            snapshots.config.desperation_factor,
        ) {
            return Err(SnapshotError::ValidatorNotElected {
                validator: ctx.sender,
                block: ctx.block_height,
            });
        }
    }

    let chain_id = claims.chain_id;
    let height = claims.height;
    let snapshot = Snapshot {
        committed_at: ctx.block_height,
        block_claims: claims,
        signature: signature.clone(),
    };
    state.snapshots.buffer.insert(epoch, snapshot);
    state.snapshots.epoch = epoch;

    info!(epoch, height, "snapshot taken");
    state.emit(Event::SnapshotTaken {
        chain_id,
        epoch,
        height,
        validator: ctx.sender,
        signature,
    });
    Ok(epoch)
}

/// Handle MigrateSnapshots call.
///
/// Bootstraps the buffer from historical snapshots. Every entry is checked
/// before any is written.
pub fn handle_migrate_snapshots(
    state: &mut ModuleState,
    ctx: &CallContext,
    signatures: Vec<GroupSignature>,
    block_claims: Vec<Vec<u8>>,
) -> SnapshotResult<u32> {
    if ctx.sender != state.ethdkg.factory {
        return Err(SnapshotError::OnlyFactory(ctx.sender));
    }
    let snapshots = &state.snapshots;
    if snapshots.epoch != 0 {
        return Err(SnapshotError::MigrationNotAllowedAtCurrentEpoch(snapshots.epoch));
    }
    if signatures.is_empty() || signatures.len() != block_claims.len() {
        return Err(SnapshotError::MigrationInputDataMismatch {
            signatures: signatures.len(),
            claims: block_claims.len(),
        });
    }

    let epoch_length = snapshots.config.epoch_length;
    let mut migrated: Vec<(u32, Snapshot)> = Vec::with_capacity(signatures.len());
    for (signature, raw) in signatures.into_iter().zip(block_claims) {
        let claims = BlockClaims::from_bytes(&raw).ok_or(SnapshotError::InvalidBlockClaims)?;
        if claims.chain_id != snapshots.config.chain_id {
            return Err(SnapshotError::InvalidChainId {
                expected: snapshots.config.chain_id,
                got: claims.chain_id,
            });
        }
        let expected_height = match migrated.last() {
            Some((_, previous)) => previous.block_claims.height.checked_add(epoch_length),
            None => Some(claims.height),
        };
        if claims.height == 0 || claims.height % epoch_length != 0 || expected_height != Some(claims.height) {
            return Err(SnapshotError::InvalidBlockHeight {
                expected: expected_height.unwrap_or(u32::MAX),
                got: claims.height,
            });
        }
        verify_signature(&signature.signature, &signature.public_key, &raw)
            .map_err(|_| SnapshotError::SignatureVerificationFailed)?;

        debug!(height = claims.height, "snapshot migrated");
        migrated.push((
            claims.height / epoch_length,
            Snapshot {
                committed_at: ctx.block_height,
                block_claims: claims,
                signature,
            },
        ));
    }

    let mut last_epoch = 0;
    for (epoch, snapshot) in migrated {
        state.emit(Event::SnapshotTaken {
            chain_id: snapshot.block_claims.chain_id,
            epoch,
            height: snapshot.block_claims.height,
            validator: ctx.sender,
            signature: snapshot.signature.clone(),
        });
        state.snapshots.buffer.insert(epoch, snapshot);
        last_epoch = epoch;
    }
    state.snapshots.epoch = last_epoch;

    info!(epoch = last_epoch, "snapshots migrated");
    Ok(last_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{EthDkgGenesisConfig, SnapshotGenesisConfig, DEFAULT_FACTORY};
    use crate::handlers::handle_migrate_validators;
    use crate::pool::{InMemoryValidatorPool, ValidatorPool};
    use bls12_381::{G2Affine, Scalar};
    use ethdkg_crypto::{compress_g1, compress_g2, random_scalar, sign};
    use ethdkg_types::{Address, G1Point};
    use group::Curve;
    use rand::rngs::OsRng;

    /// A migrated four-validator set with consensus running, keyed by `secret`.
    struct Chain {
        state: ModuleState,
        pool: InMemoryValidatorPool,
        secret: Scalar,
        block: u64,
    }

    impl Chain {
        fn new(snapshots: SnapshotGenesisConfig) -> Self {
            let genesis = EthDkgGenesisConfig {
                snapshots,
                ..Default::default()
            };
            let mut state = ModuleState::from_genesis(&genesis).unwrap();
            let secret = random_scalar(&mut OsRng);
            let mpk = compress_g2(&(G2Affine::generator() * secret).to_affine());
            let accounts: Vec<Address> = (1..=4).map(|i| [i; 20]).collect();
            let ctx = CallContext {
                sender: DEFAULT_FACTORY,
                block_height: 100,
            };
            handle_migrate_validators(&mut state, &ctx, accounts.clone(), vec![1, 2, 3, 4], vec![mpk; 4], 0, 0, 100, mpk)
                .unwrap();
            let mut pool = InMemoryValidatorPool::new(accounts);
            pool.complete_ethdkg();
            Self {
                state,
                pool,
                secret,
                block: 100,
            }
        }

        fn signed(&self, bytes: &[u8]) -> GroupSignature {
            GroupSignature {
                public_key: self.state.ethdkg.master_public_key.unwrap(),
                signature: compress_g1(&sign(&self.secret, bytes)),
            }
        }

        fn submit_bytes(&mut self, sender: Address, bytes: Vec<u8>) -> SnapshotResult<u32> {
            let signature = self.signed(&bytes);
            let ctx = CallContext {
                sender,
                block_height: self.block,
            };
            handle_snapshot(&mut self.state, &self.pool, &ctx, signature, bytes)
        }

        fn submit(&mut self, sender: Address, claims: &BlockClaims) -> SnapshotResult<u32> {
            self.submit_bytes(sender, claims.to_bytes())
        }

        /// 0-based indices of the validators elected for `height` at `blocks_since_desperation`.
        fn elected(&self, height: u32, blocks_since_desperation: u64) -> Vec<u32> {
            let seed = election_seed(&self.state.snapshots.latest().unwrap().signature, height);
            (0..4)
                .filter(|i| may_validator_snapshot(4, *i, blocks_since_desperation, &seed, 40))
                .collect()
        }
    }

    fn claims_at(height: u32) -> BlockClaims {
        BlockClaims {
            chain_id: 1,
            height,
            ..Default::default()
        }
    }

    fn validator(index: u32) -> Address {
        [index as u8 + 1; 20]
    }

    #[test]
    fn test_epoch_from_height() {
        assert_eq!(epoch_from_height(0, 1024), 1);
        assert_eq!(epoch_from_height(1, 1024), 1);
        assert_eq!(epoch_from_height(1024, 1024), 1);
        assert_eq!(epoch_from_height(1025, 1024), 2);
        assert_eq!(epoch_from_height(2048, 1024), 2);
        assert_eq!(epoch_from_height(2049, 1024), 3);
    }

    #[test]
    fn test_reads_outside_buffer_fail() {
        let mut state = SnapshotState::new(&SnapshotGenesisConfig {
            buffer_capacity: 2,
            ..Default::default()
        });
        assert_eq!(state.latest(), Err(SnapshotError::SnapshotsNotInBuffer(0)));

        for epoch in 1..=3 {
            let snapshot = Snapshot {
                committed_at: epoch as u64,
                block_claims: BlockClaims {
                    height: epoch * 1024,
                    ..Default::default()
                },
                signature: GroupSignature::default(),
            };
            state.buffer.insert(epoch, snapshot);
            state.epoch = epoch;
        }

        assert_eq!(state.get(1), Err(SnapshotError::SnapshotsNotInBuffer(1)));
        assert_eq!(state.get(2).unwrap().block_claims.height, 2048);
        assert_eq!(state.latest().unwrap().block_claims.height, 3072);
        assert_eq!(state.get(4), Err(SnapshotError::SnapshotsNotInBuffer(4)));
        assert_eq!(state.next_height(), 4096);
    }

    #[test]
    fn test_single_validator_elected_without_desperation() {
        let seed = [7u8; 32];
        let elected: Vec<u32> = (0..10)
            .filter(|i| may_validator_snapshot(10, *i, 0, &seed, 40))
            .collect();
        assert_eq!(elected.len(), 1);
    }

    #[test]
    fn test_election_widens_with_desperation() {
        let seed = [0u8; 32];
        // seed mod n = 0, so the range starts at validator 0
        assert!(may_validator_snapshot(10, 0, 0, &seed, 40));
        assert!(!may_validator_snapshot(10, 1, 0, &seed, 40));

        // one step: 40 blocks of desperation allow two validators
        assert!(may_validator_snapshot(10, 1, 1, &seed, 40));
        assert!(!may_validator_snapshot(10, 2, 1, &seed, 40));

        // the widening stops at n/3 + 1
        for i in 0..4 {
            assert!(may_validator_snapshot(10, i, 1_000_000, &seed, 40));
        }
        assert!(!may_validator_snapshot(10, 4, 1_000_000, &seed, 40));
    }

    #[test]
    fn test_election_range_wraps() {
        let mut seed = [0u8; 32];
        seed[31] = 3;
        // start 3 of 4; n/3 = 1, so two validators at most: 3 and 0
        assert!(may_validator_snapshot(4, 3, 1_000, &seed, 40));
        assert!(may_validator_snapshot(4, 0, 1_000, &seed, 40));
        assert!(!may_validator_snapshot(4, 1, 1_000, &seed, 40));
    }

    #[test]
    fn test_election_seed_depends_on_height() {
        let signature = GroupSignature {
            signature: G1Point([5u8; 48]),
            ..Default::default()
        };
        assert_ne!(election_seed(&signature, 1024), election_seed(&signature, 2048));
    }

    #[test]
    fn test_snapshot_requires_validator_and_consensus() {
        let mut c = Chain::new(SnapshotGenesisConfig::default());
        assert_eq!(
            c.submit([9; 20], &claims_at(1024)),
            Err(SnapshotError::OnlyValidatorsAllowed([9; 20]))
        );

        c.pool.pause_consensus();
        assert_eq!(c.submit([1; 20], &claims_at(1024)), Err(SnapshotError::ConsensusNotRunning));

        c.pool.complete_ethdkg();
        assert_eq!(c.submit([1; 20], &claims_at(1024)), Ok(1));
    }

    #[test]
    fn test_snapshot_rejected_while_round_runs() {
        let mut c = Chain::new(SnapshotGenesisConfig::default());
        c.state.ethdkg.controller.start_round(c.block);
        assert_eq!(c.submit([1; 20], &claims_at(1024)), Err(SnapshotError::EthDkgRoundRunning));
        assert_eq!(c.state.snapshots.epoch, 0);
    }

    #[test]
    fn test_snapshot_checks_key_and_claims() {
        let mut c = Chain::new(SnapshotGenesisConfig::default());

        // Valid signature, but under a key that is not the active one
        let foreign = random_scalar(&mut OsRng);
        let bytes = claims_at(1024).to_bytes();
        let signature = GroupSignature {
            public_key: compress_g2(&(G2Affine::generator() * foreign).to_affine()),
            signature: compress_g1(&sign(&foreign, &bytes)),
        };
        let ctx = CallContext {
            sender: [1; 20],
            block_height: c.block,
        };
        assert_eq!(
            handle_snapshot(&mut c.state, &c.pool, &ctx, signature, bytes),
            Err(SnapshotError::InvalidMasterPublicKey)
        );

        assert_eq!(c.submit_bytes([1; 20], vec![1, 2, 3]), Err(SnapshotError::InvalidBlockClaims));

        let mut other_chain = claims_at(1024);
        other_chain.chain_id = 2;
        assert_eq!(
            c.submit([1; 20], &other_chain),
            Err(SnapshotError::InvalidChainId { expected: 1, got: 2 })
        );

        assert_eq!(c.state.snapshots.epoch, 0);
        assert_eq!(c.submit([1; 20], &claims_at(1024)), Ok(1));
    }

    #[test]
    fn test_minimum_interval_between_snapshots() {
        let mut c = Chain::new(SnapshotGenesisConfig {
            minimum_interval_between_snapshots: 10,
            ..Default::default()
        });
        c.submit([1; 20], &claims_at(1024)).unwrap();

        c.block = 105;
        let elected = validator(c.elected(2048, 0)[0]);
        assert_eq!(
            c.submit(elected, &claims_at(2048)),
            Err(SnapshotError::MinimumBlocksIntervalNotPassed {
                current: 105,
                allowed_at: 110
            })
        );

        c.block = 110;
        assert_eq!(c.submit(elected, &claims_at(2048)), Ok(2));
    }

    #[test]
    fn test_desperation_opens_election_to_next_validator() {
        let mut c = Chain::new(SnapshotGenesisConfig::default());
        c.submit([1; 20], &claims_at(1024)).unwrap();

        let elected = c.elected(2048, 0);
        assert_eq!(elected.len(), 1);
        let next = (elected[0] + 1) % 4;
        let last = (elected[0] + 2) % 4;

        // Within the desperation delay only the elected validator may submit
        c.block = 120;
        assert!(matches!(
            c.submit(validator(next), &claims_at(2048)),
            Err(SnapshotError::ValidatorNotElected { .. })
        ));

        // One block past the delay widens the range to two of four
        c.block = 121;
        assert!(matches!(
            c.submit(validator(last), &claims_at(2048)),
            Err(SnapshotError::ValidatorNotElected { .. })
        ));
        assert_eq!(c.submit(validator(next), &claims_at(2048)), Ok(2));
    }
}
