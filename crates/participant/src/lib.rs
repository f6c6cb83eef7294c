//! Off-chain side of an ETHDKG round.
//!
//! A validator taking part in a round:
//!
//! 1. Registers a fresh G1 public key
//! 2. Deals a random polynomial of degree `threshold(n)`, encrypting one share
//!    for every other registered participant and publishing Feldman commitments
//! 3. Decrypts and verifies the shares dealt to it, building accusation
//!    evidence for any dealer whose share does not verify
//! 4. Publishes its key share (the constant term times `H1` and `G2`)
//! 5. Sums its received shares into its group secret and publishes the GPKJ
//!
//! Once a round completes, partial signatures from any `threshold(n) + 1`
//! participants aggregate into a group signature under the master public key.

pub mod feldman;
pub mod participant;
pub mod types;

pub use ethdkg_crypto::aggregate_signatures;
pub use participant::{master_public_key, DkgError, EthDkgParticipant};
pub use types::{DistributedShares, KeyShare, RosterEntry};
