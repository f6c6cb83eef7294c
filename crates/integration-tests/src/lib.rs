//! End-to-end integration tests for ETHDKG rounds.
//!
//! These tests drive real participants through the module:
//! 1. Registration, share distribution and key share submission
//! 2. Master public key and GPKJ submission, then completion
//! 3. Accusations and the restart of a failed round
//! 4. Snapshots signed by the resulting group key
//! 5. Migration of an existing validator set and its snapshots

#![cfg(test)]

use bls12_381::G2Affine;
use group::Curve;
use rand::rngs::OsRng;

use ethdkg_crypto::{compress_g1, compress_g2, random_scalar, sign};
use ethdkg_module::genesis::{DEFAULT_FACTORY, DEFAULT_VALIDATOR_POOL};
use ethdkg_module::{
    election_seed, handle_query, may_validator_snapshot, CallContext, EthDkgError, EthDkgGenesisConfig, Event,
    InMemoryValidatorPool, ModuleCall, ModuleError, ModuleQuery, ModuleQueryResponse, ModuleState,
    SlashKind, SlashRecord, SnapshotError, SnapshotGenesisConfig, ValidatorPool, ValidatorRegistry,
};
use ethdkg_participant::{aggregate_signatures, master_public_key, DistributedShares, EthDkgParticipant, RosterEntry};
use ethdkg_types::{
    hash_encrypted_shares, threshold, Address, BlockClaims, EncryptedShare, G1Point, G2Point, GroupSignature, Phase,
};

/// Shares and commitments a dealer published, as read back from the event log.
struct Published {
    account: Address,
    index: u32,
    encrypted_shares: Vec<EncryptedShare>,
    commitments: Vec<G1Point>,
}

/// The module, its validator pool and one participant per validator.
struct Network {
    state: ModuleState,
    pool: InMemoryValidatorPool,
    validators: Vec<EthDkgParticipant>,
    block: u64,
}

impl Network {
    fn new(n: u8) -> Self {
        Self::with_genesis(n, EthDkgGenesisConfig::default())
    }

    fn with_genesis(n: u8, genesis: EthDkgGenesisConfig) -> Self {
        let validators: Vec<_> = (1..=n)
            .map(|i| EthDkgParticipant::new([i; 20], &mut OsRng))
            .collect();
        let pool = InMemoryValidatorPool::new(validators.iter().map(|v| v.address()).collect());
        let state = ModuleState::from_genesis(&genesis).expect("valid genesis");
        Self {
            state,
            pool,
            validators,
            block: 100,
        }
    }

    fn address(&self, i: usize) -> Address {
        self.validators[i].address()
    }

    fn call(&mut self, sender: Address, call: ModuleCall) -> Result<(), ModuleError> {
        let ctx = CallContext {
            sender,
            block_height: self.block,
        };
        call.dispatch(&mut self.state, &mut self.pool, &ctx)
    }

    fn query(&self, query: ModuleQuery) -> ModuleQueryResponse {
        handle_query(&self.state, self.block, query).expect("query")
    }

    fn phase(&self) -> Phase {
        self.state.ethdkg.controller.phase
    }

    fn nonce(&self) -> u64 {
        self.state.ethdkg.nonce()
    }

    // ============ Moving through phase windows ============

    fn to_phase_start(&mut self) {
        self.block = self.state.ethdkg.controller.phase_start_block;
    }

    fn to_dispute_window(&mut self) {
        let controller = &self.state.ethdkg.controller;
        self.block = controller.phase_start_block + controller.phase_length;
    }

    fn to_halt(&mut self) {
        let controller = &self.state.ethdkg.controller;
        self.block = controller.phase_start_block + 2 * controller.phase_length;
    }

    // ============ Round steps ============

    fn initialize(&mut self) {
        self.call(DEFAULT_VALIDATOR_POOL, ModuleCall::InitializeEthDkg)
            .expect("initialize");
        self.to_phase_start();
    }

    fn register_all(&mut self) {
        for i in 0..self.validators.len() {
            let public_key = self.validators[i].public_key();
            self.call(self.address(i), ModuleCall::Register { public_key })
                .expect("register");
        }
        self.to_phase_start();
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

    fn deal_all(&mut self) -> Vec<DistributedShares> {
        let roster = self.roster();
        self.validators
            .iter_mut()
            .map(|v| v.deal(&roster, &mut OsRng).expect("deal"))
            .collect()
    }

    fn distribute(&mut self, i: usize, shares: &DistributedShares) -> Result<(), ModuleError> {
        self.call(
            self.address(i),
            ModuleCall::DistributeShares {
                encrypted_shares: shares.encrypted_shares.clone(),
                commitments: shares.commitments.clone(),
            },
        )
    }

    fn published_shares(&self) -> Vec<Published> {
        let nonce = self.nonce();
        let mut published: Vec<_> = self
            .state
            .events
            .iter()
            .filter_map(|event| match event {
                Event::SharesDistributed {
                    account,
                    index,
                    nonce: n,
                    encrypted_shares,
                    commitments,
                } if *n == nonce => Some(Published {
                    account: *account,
                    index: *index,
                    encrypted_shares: encrypted_shares.clone(),
                    commitments: commitments.clone(),
                }),
                _ => None,
            })
            .collect();
        published.sort_by_key(|p| p.index);
        published
    }

    /// Each validator decrypts and checks the shares addressed to it.
    /// Returns `(validator, dealer index)` for every share that failed.
    fn receive_all(&mut self) -> Vec<(usize, u32)> {
        let published = self.published_shares();
        let mut failures = Vec::new();
        for (i, validator) in self.validators.iter_mut().enumerate() {
            for dealer in &published {
                if Some(dealer.index) == validator.index() {
                    continue;
                }
                if validator
                    .receive_shares(dealer.index, &dealer.encrypted_shares, &dealer.commitments)
                    .is_err()
                {
                    failures.push((i, dealer.index));
                }
            }
        }
        failures
    }

    /// Submit every key share from the dispute window of share distribution.
    fn submit_key_shares(&mut self) {
        self.to_dispute_window();
        for i in 0..self.validators.len() {
            let key_share = self.validators[i].key_share(&mut OsRng).expect("key share");
            self.call(
                self.address(i),
                ModuleCall::SubmitKeyShare {
                    key_share_g1: key_share.key_share_g1,
                    key_share_g1_correctness_proof: key_share.correctness_proof,
                    key_share_g2: key_share.key_share_g2,
                },
            )
            .expect("submit key share");
        }
        self.to_phase_start();
    }

    /// Anyone may submit the master public key; it is derived from the log.
    fn submit_master_public_key(&mut self) -> G2Point {
        let nonce = self.nonce();
        let key_shares: Vec<G2Point> = self
            .state
            .events
            .iter()
            .filter_map(|event| match event {
                Event::KeyShareSubmitted {
                    nonce: n, key_share_g2, ..
                } if *n == nonce => Some(*key_share_g2),
                _ => None,
            })
            .collect();
        let mpk = master_public_key(&key_shares).expect("master public key");
        self.call(
            [0xaa; 20],
            ModuleCall::SubmitMasterPublicKey {
                master_public_key: mpk,
            },
        )
        .expect("submit master public key");
        self.to_phase_start();
        mpk
    }

    /// Submit every gpkj; `forged` submits a valid point that is not its gpkj.
    fn submit_gpkjs(&mut self, forged: Option<usize>) {
        for i in 0..self.validators.len() {
            let gpkj = if forged == Some(i) {
                random_g2()
            } else {
                self.validators[i].gpkj().expect("gpkj")
            };
            self.call(self.address(i), ModuleCall::SubmitGpkj { gpkj })
                .expect("submit gpkj");
        }
        self.to_phase_start();
    }

    fn complete(&mut self) -> Result<(), ModuleError> {
        self.to_dispute_window();
        self.call(self.address(0), ModuleCall::Complete)
    }

    /// Run a round up to and including GPKJ submission.
    fn run_to_gpkj_dispute(&mut self, forged: Option<usize>) {
        self.initialize();
        self.register_all();
        let dealt = self.deal_all();
        for (i, shares) in dealt.iter().enumerate() {
            self.distribute(i, shares).expect("distribute shares");
        }
        assert!(self.receive_all().is_empty());
        self.submit_key_shares();
        self.submit_master_public_key();
        self.submit_gpkjs(forged);
        assert_eq!(self.phase(), Phase::DisputeGPKJSubmission);
    }

    fn run_round(&mut self) {
        self.run_to_gpkj_dispute(None);
        self.complete().expect("complete");
    }

    /// Evidence for a bad GPKJ accusation, from the event log.
    fn gpkj_evidence(&self) -> (Vec<Address>, Vec<[u8; 32]>, Vec<Vec<G1Point>>) {
        let published = self.published_shares();
        (
            published.iter().map(|p| p.account).collect(),
            published
                .iter()
                .map(|p| hash_encrypted_shares(&p.encrypted_shares))
                .collect(),
            published.iter().map(|p| p.commitments.clone()).collect(),
        )
    }

    // ============ Snapshots ============

    fn group_sign(&self, message: &[u8]) -> GroupSignature {
        let partials: Vec<(u32, G1Point)> = self
            .validators
            .iter()
            .map(|v| {
                (
                    v.index().expect("dealt"),
                    v.sign(message).expect("partial signature"),
                )
            })
            .collect();
        let signature =
            aggregate_signatures(&partials, threshold(partials.len() as u32) as usize).expect("aggregate");
        GroupSignature {
            public_key: self.state.ethdkg.master_public_key.expect("master public key"),
            signature,
        }
    }

    /// Validator allowed to submit the snapshot at `height` at the current block.
    fn elected(&self, height: u32) -> Address {
        let Ok(previous) = self.state.snapshots.latest() else {
            return self.address(0);
        };
        let config = &self.state.snapshots.config;
        let seed = election_seed(&previous.signature, height);
        let since = self
            .block
            .saturating_sub(previous.committed_at)
            .saturating_sub(config.desperation_delay);
        let n = self.pool.validators_count();
        self.validators
            .iter()
            .map(|v| v.address())
            .find(|address| {
                self.state.ethdkg.current(address).is_some_and(|p| {
                    may_validator_snapshot(n, p.index - 1, since, &seed, config.desperation_factor)
                })
            })
            .expect("one validator is elected")
    }

    fn snapshot(&mut self) -> Result<(), ModuleError> {
        self.block += 1;
        let height = self.state.snapshots.next_height() as u32;
        let block_claims = claims_at(height).to_bytes();
        let signature = self.group_sign(&block_claims);
        let sender = self.elected(height);
        self.call(
            sender,
            ModuleCall::Snapshot {
                signature,
                block_claims,
            },
        )
    }
}

fn claims_at(height: u32) -> BlockClaims {
    BlockClaims {
        chain_id: 1,
        height,
        tx_count: 3,
        state_root: [(height / 1024) as u8; 32],
        ..Default::default()
    }
}

fn random_g2() -> G2Point {
    compress_g2(&(G2Affine::generator() * random_scalar(&mut OsRng)).to_affine())
}

/// A full round with four honest validators, then snapshots under its key.
#[test]
fn test_full_round_and_snapshots() {
    let mut net = Network::new(4);

    // ========================================
    // Round
    // ========================================

    net.run_round();
    assert_eq!(net.nonce(), 1);
    assert_eq!(net.phase(), Phase::Completion);
    assert!(net.pool.is_consensus_running());
    assert_eq!(net.query(ModuleQuery::IsCompleted), ModuleQueryResponse::Flag(true));
    assert_eq!(
        net.query(ModuleQuery::IsMasterPublicKeySet),
        ModuleQueryResponse::Flag(true)
    );
    assert!(net.state.events.iter().any(|e| matches!(
        e,
        Event::ValidatorSetCompleted {
            validator_count: 4,
            nonce: 1,
            ..
        }
    )));

    // Completing again is out of phase
    let again = net.call(net.address(0), ModuleCall::Complete);
    assert!(matches!(
        again,
        Err(ModuleError::EthDkg(EthDkgError::IncorrectPhase {
            current: Phase::Completion,
            ..
        }))
    ));

    // ========================================
    // First snapshot, at epochLength
    // ========================================

    let claims = claims_at(1024).to_bytes();
    let signature = net.group_sign(&claims);

    let mut tampered = claims_at(1024);
    tampered.tx_count = 7;
    assert_eq!(
        net.call(
            net.address(0),
            ModuleCall::Snapshot {
                signature: signature.clone(),
                block_claims: tampered.to_bytes(),
            }
        ),
        Err(ModuleError::Snapshot(SnapshotError::SignatureVerificationFailed))
    );

    let early = claims_at(2048).to_bytes();
    let early_signature = net.group_sign(&early);
    assert_eq!(
        net.call(
            net.address(0),
            ModuleCall::Snapshot {
                signature: early_signature,
                block_claims: early,
            }
        ),
        Err(ModuleError::Snapshot(SnapshotError::InvalidBlockHeight {
            expected: 1024,
            got: 2048
        }))
    );

    net.call(
        net.address(0),
        ModuleCall::Snapshot {
            signature,
            block_claims: claims,
        },
    )
    .expect("first snapshot");
    assert_eq!(net.query(ModuleQuery::GetEpoch), ModuleQueryResponse::Number(1));

    // ========================================
    // Second snapshot, by the elected validator
    // ========================================

    net.block += 1;
    let claims = claims_at(2048).to_bytes();
    let signature = net.group_sign(&claims);
    let elected = net.elected(2048);
    let other = net
        .validators
        .iter()
        .map(|v| v.address())
        .find(|a| *a != elected)
        .expect("more than one validator");

    let result = net.call(
        other,
        ModuleCall::Snapshot {
            signature: signature.clone(),
            block_claims: claims.clone(),
        },
    );
    assert!(matches!(
        result,
        Err(ModuleError::Snapshot(SnapshotError::ValidatorNotElected { .. }))
    ));

    net.call(
        elected,
        ModuleCall::Snapshot {
            signature,
            block_claims: claims,
        },
    )
    .expect("second snapshot");
    assert_eq!(
        net.query(ModuleQuery::GetSidechainHeightFromLatestSnapshot),
        ModuleQueryResponse::Number(2048)
    );
    assert_eq!(
        net.query(ModuleQuery::GetCommittedHeightFromLatestSnapshot),
        ModuleQueryResponse::Number(net.block)
    );
}

/// Only the latest `bufferCapacity` snapshots stay readable.
#[test]
fn test_snapshot_buffer_drops_oldest() {
    let genesis = EthDkgGenesisConfig {
        snapshots: SnapshotGenesisConfig {
            buffer_capacity: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut net = Network::with_genesis(4, genesis);
    net.run_round();

    for _ in 0..3 {
        net.snapshot().expect("snapshot");
    }
    assert_eq!(net.query(ModuleQuery::GetEpoch), ModuleQueryResponse::Number(3));

    assert_eq!(
        handle_query(&net.state, net.block, ModuleQuery::GetSnapshot { epoch: 1 }),
        Err(ModuleError::Snapshot(SnapshotError::SnapshotsNotInBuffer(1)))
    );
    assert_eq!(
        net.query(ModuleQuery::GetSidechainHeightFromSnapshot { epoch: 2 }),
        ModuleQueryResponse::Number(2048)
    );
    assert_eq!(
        net.query(ModuleQuery::GetSidechainHeightFromSnapshot { epoch: 3 }),
        ModuleQueryResponse::Number(3072)
    );
    assert_eq!(
        handle_query(&net.state, net.block, ModuleQuery::GetSnapshot { epoch: 4 }),
        Err(ModuleError::Snapshot(SnapshotError::SnapshotsNotInBuffer(4)))
    );
}

/// A validator that never distributes is evicted; the halted round is
/// restarted with a replacement and completes as round 2.
#[test]
fn test_missing_shares_evicted_and_round_restarted() {
    let mut net = Network::new(4);
    net.initialize();
    net.register_all();

    let dealt = net.deal_all();
    for (i, shares) in dealt.iter().enumerate().take(3) {
        net.distribute(i, shares).expect("distribute shares");
    }
    assert_eq!(net.phase(), Phase::ShareDistribution);

    net.to_dispute_window();
    let absent = net.address(3);
    net.call(
        net.address(0),
        ModuleCall::AccuseParticipantDidNotDistributeShares {
            dishonest_addresses: vec![absent],
        },
    )
    .expect("accuse");
    assert!(!net.pool.is_validator(&absent));
    assert_eq!(net.pool.slashes()[0].kind, SlashKind::Minor);
    assert_eq!(net.query(ModuleQuery::GetBadParticipants), ModuleQueryResponse::Number(1));

    // Too late to distribute, and no key share can move the round on
    assert!(matches!(
        net.distribute(3, &dealt[3]),
        Err(ModuleError::EthDkg(EthDkgError::IncorrectPhase { .. }))
    ));
    let key_share = net.validators[0].key_share(&mut OsRng).expect("key share");
    let result = net.call(
        net.address(0),
        ModuleCall::SubmitKeyShare {
            key_share_g1: key_share.key_share_g1,
            key_share_g1_correctness_proof: key_share.correctness_proof,
            key_share_g2: key_share.key_share_g2,
        },
    );
    assert!(matches!(
        result,
        Err(ModuleError::EthDkg(EthDkgError::IncorrectPhase { .. }))
    ));

    // ========================================
    // Restart once halted
    // ========================================

    net.to_halt();
    assert_eq!(net.query(ModuleQuery::IsHalted), ModuleQueryResponse::Flag(true));

    net.validators.remove(3);
    let replacement = EthDkgParticipant::new([5; 20], &mut OsRng);
    assert!(net.pool.add_validator(replacement.address()));
    net.validators.push(replacement);

    net.run_round();
    assert_eq!(net.nonce(), 2);
    assert_eq!(net.phase(), Phase::Completion);
    assert_eq!(net.state.ethdkg.bad_participants, 0);
    assert_eq!(net.state.ethdkg.current(&[1; 20]).map(|p| p.nonce), Some(2));
}

/// A dealer sending a bad share is evicted on the recipient's evidence.
#[test]
fn test_bad_share_accusation() {
    let mut net = Network::new(4);
    net.initialize();
    net.register_all();

    let mut dealt = net.deal_all();
    // Dealer 1's share for participant 2 sits at position 0
    dealt[0].encrypted_shares[0][0] ^= 1;
    for (i, shares) in dealt.iter().enumerate() {
        net.distribute(i, shares).expect("distribute shares");
    }
    assert_eq!(net.phase(), Phase::DisputeShareDistribution);
    assert_eq!(net.receive_all(), vec![(1, 1)]);

    net.to_phase_start();
    let dealer = net.address(0);
    let accuser = net.address(1);
    let dealer_pk = net.validators[0].public_key();

    // Participant 3 received a good share and cannot accuse
    let (shared_key, proof) = net.validators[2]
        .accusation_evidence(&dealer_pk, &mut OsRng)
        .expect("evidence");
    let result = net.call(
        net.address(2),
        ModuleCall::AccuseParticipantDistributedBadShares {
            dishonest_address: dealer,
            encrypted_shares: dealt[0].encrypted_shares.clone(),
            commitments: dealt[0].commitments.clone(),
            shared_key,
            shared_key_correctness_proof: proof,
        },
    );
    assert_eq!(
        result,
        Err(ModuleError::EthDkg(EthDkgError::AccusedDistributedGoodShare(dealer)))
    );

    let (shared_key, proof) = net.validators[1]
        .accusation_evidence(&dealer_pk, &mut OsRng)
        .expect("evidence");
    net.call(
        accuser,
        ModuleCall::AccuseParticipantDistributedBadShares {
            dishonest_address: dealer,
            encrypted_shares: dealt[0].encrypted_shares.clone(),
            commitments: dealt[0].commitments.clone(),
            shared_key,
            shared_key_correctness_proof: proof,
        },
    )
    .expect("accuse");
    assert_eq!(
        net.pool.slashes(),
        &[SlashRecord {
            kind: SlashKind::Minor,
            infringer: dealer,
            disputer: accuser,
        }]
    );

    // Key shares cannot move a round with bad participants on
    net.to_dispute_window();
    let key_share = net.validators[1].key_share(&mut OsRng).expect("key share");
    let result = net.call(
        accuser,
        ModuleCall::SubmitKeyShare {
            key_share_g1: key_share.key_share_g1,
            key_share_g1_correctness_proof: key_share.correctness_proof,
            key_share_g2: key_share.key_share_g2,
        },
    );
    assert_eq!(
        result,
        Err(ModuleError::EthDkg(EthDkgError::UnresolvedBadParticipants(1)))
    );
}

/// A forged GPKJ is caught against the published commitments.
#[test]
fn test_bad_gpkj_accusation_evicts_accused() {
    let mut net = Network::new(4);
    net.run_to_gpkj_dispute(Some(3));

    let (validators, encrypted_shares_hashes, commitments) = net.gpkj_evidence();
    let forger = net.address(3);
    net.call(
        net.address(0),
        ModuleCall::AccuseParticipantSubmittedBadGpkj {
            validators,
            encrypted_shares_hashes,
            commitments,
            dishonest_address: forger,
        },
    )
    .expect("accuse");
    assert_eq!(
        net.pool.slashes(),
        &[SlashRecord {
            kind: SlashKind::Major,
            infringer: forger,
            disputer: net.address(0),
        }]
    );

    assert_eq!(
        net.complete(),
        Err(ModuleError::EthDkg(EthDkgError::UnresolvedBadParticipants(1)))
    );
}

/// Accusing an honest GPKJ costs the accuser.
#[test]
fn test_false_gpkj_accusation_evicts_accuser() {
    let mut net = Network::new(4);
    net.run_to_gpkj_dispute(None);

    let (validators, encrypted_shares_hashes, commitments) = net.gpkj_evidence();
    let accuser = net.address(0);
    let honest = net.address(1);

    // Evidence must cover every participant
    let result = net.call(
        accuser,
        ModuleCall::AccuseParticipantSubmittedBadGpkj {
            validators: validators[..3].to_vec(),
            encrypted_shares_hashes: encrypted_shares_hashes[..3].to_vec(),
            commitments: commitments[..3].to_vec(),
            dishonest_address: honest,
        },
    );
    assert_eq!(
        result,
        Err(ModuleError::EthDkg(EthDkgError::InvalidParticipantCount {
            expected: 4,
            got: 3
        }))
    );

    net.call(
        accuser,
        ModuleCall::AccuseParticipantSubmittedBadGpkj {
            validators,
            encrypted_shares_hashes,
            commitments,
            dishonest_address: honest,
        },
    )
    .expect("accuse");
    assert_eq!(
        net.pool.slashes(),
        &[SlashRecord {
            kind: SlashKind::Major,
            infringer: accuser,
            disputer: honest,
        }]
    );
    assert!(net.state.events.iter().any(|e| matches!(
        e,
        Event::ParticipantEvicted { account, major: true, .. } if *account == accuser
    )));
}

/// An existing validator set and its snapshots are migrated, and
/// snapshots then continue from the last migrated epoch.
#[test]
fn test_migration() {
    let mut net = Network::new(4);

    let master_secret = random_scalar(&mut OsRng);
    let mpk = compress_g2(&(G2Affine::generator() * master_secret).to_affine());
    let accounts: Vec<Address> = (0..4).map(|i| net.address(i)).collect();
    let migrate = ModuleCall::MigrateValidators {
        accounts: accounts.clone(),
        indices: vec![1, 2, 3, 4],
        gpkjs: (0..4).map(|_| random_g2()).collect(),
        epoch: 0,
        side_chain_height: 0,
        eth_height: 90,
        master_public_key: mpk,
    };

    assert_eq!(
        net.call(accounts[0], migrate.clone()),
        Err(ModuleError::EthDkg(EthDkgError::OnlyFactory(accounts[0])))
    );
    net.call(DEFAULT_FACTORY, migrate.clone()).expect("migrate validators");
    assert_eq!(net.nonce(), 1);
    assert_eq!(net.phase(), Phase::Completion);
    assert_eq!(
        net.query(ModuleQuery::GetMasterPublicKey),
        ModuleQueryResponse::MasterPublicKey(Some(mpk))
    );
    assert_eq!(
        net.call(DEFAULT_FACTORY, migrate),
        Err(ModuleError::EthDkg(EthDkgError::MigrationRequiresZeroNonce(1)))
    );

    // ========================================
    // Historical snapshots under the migrated key
    // ========================================

    let signed = |height: u32| {
        let bytes = claims_at(height).to_bytes();
        let signature = GroupSignature {
            public_key: mpk,
            signature: compress_g1(&sign(&master_secret, &bytes)),
        };
        (signature, bytes)
    };
    let (first_signature, first_claims) = signed(1024);
    let (second_signature, second_claims) = signed(2048);

    let result = net.call(
        DEFAULT_FACTORY,
        ModuleCall::MigrateSnapshots {
            signatures: vec![first_signature.clone(), first_signature.clone()],
            block_claims: vec![first_claims.clone(), first_claims.clone()],
        },
    );
    assert!(matches!(
        result,
        Err(ModuleError::Snapshot(SnapshotError::InvalidBlockHeight { .. }))
    ));
    assert_eq!(net.state.snapshots.epoch, 0);

    net.call(
        DEFAULT_FACTORY,
        ModuleCall::MigrateSnapshots {
            signatures: vec![first_signature, second_signature],
            block_claims: vec![first_claims, second_claims],
        },
    )
    .expect("migrate snapshots");
    assert_eq!(net.query(ModuleQuery::GetEpoch), ModuleQueryResponse::Number(2));
    assert_eq!(
        net.query(ModuleQuery::GetSidechainHeightFromSnapshot { epoch: 1 }),
        ModuleQueryResponse::Number(1024)
    );

    // ========================================
    // Consensus takes over from the migrated state
    // ========================================

    net.pool.complete_ethdkg();
    net.block += 1;
    let (signature, block_claims) = signed(3072);
    let elected = net.elected(3072);
    net.call(
        elected,
        ModuleCall::Snapshot {
            signature,
            block_claims,
        },
    )
    .expect("snapshot after migration");
    assert_eq!(net.query(ModuleQuery::GetEpoch), ModuleQueryResponse::Number(3));

    let (signature, block_claims) = signed(4096);
    assert_eq!(
        net.call(
            DEFAULT_FACTORY,
            ModuleCall::MigrateSnapshots {
                signatures: vec![signature],
                block_claims: vec![block_claims],
            }
        ),
        Err(ModuleError::Snapshot(SnapshotError::MigrationNotAllowedAtCurrentEpoch(3)))
    );
}
