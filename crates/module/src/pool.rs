//! Interface to the validator pool.
//!
//! The pool owns the validator set and its stake. The key generation module
//! only asks who the validators are, tells the pool when a round completes,
//! and asks it to slash participants proven to have misbehaved.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ethdkg_types::Address;

/// Read access to the current validator set.
pub trait ValidatorRegistry {
    fn is_validator(&self, address: &Address) -> bool;

    fn validators_count(&self) -> u32;

    fn is_consensus_running(&self) -> bool;
}

/// Penalties fired by resolved accusations.
pub trait SlashHook {
    /// Partial stake forfeiture; the infringer leaves the validator set.
    fn minor_slash(&mut self, infringer: &Address, disputer: &Address);

    /// Full stake forfeiture; the infringer leaves the validator set.
    fn major_slash(&mut self, infringer: &Address, disputer: &Address);
}

/// Everything the module needs from the validator pool.
pub trait ValidatorPool: ValidatorRegistry + SlashHook {
    /// Called when a round completes; consensus starts running.
    fn complete_ethdkg(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashKind {
    Minor,
    Major,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRecord {
    pub kind: SlashKind,
    pub infringer: Address,
    pub disputer: Address,
}

/// Validator pool kept in memory, for the mock chain and tests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryValidatorPool {
    validators: Vec<Address>,
    consensus_running: bool,
    slashes: Vec<SlashRecord>,
}

impl InMemoryValidatorPool {
    pub fn new(validators: Vec<Address>) -> Self {
        let mut pool = Self::default();
        for validator in validators {
            pool.add_validator(validator);
        }
        pool
    }

    /// Add a validator. Returns false if it was already present.
    pub fn add_validator(&mut self, address: Address) -> bool {
        if self.validators.contains(&address) {
            return false;
        }
        self.validators.push(address);
        true
    }

    pub fn validators(&self) -> &[Address] {
        &self.validators
    }

    pub fn slashes(&self) -> &[SlashRecord] {
        &self.slashes
    }

    /// Stop consensus, e.g. for maintenance before a new round.
    pub fn pause_consensus(&mut self) {
        self.consensus_running = false;
    }

    fn slash(&mut self, kind: SlashKind, infringer: &Address, disputer: &Address) {
        warn!(?kind, infringer = ?infringer, disputer = ?disputer, "validator slashed");
        self.validators.retain(|v| v != infringer);
        self.slashes.push(SlashRecord {
            kind,
            infringer: *infringer,
            disputer: *disputer,
        });
    }
}

impl ValidatorRegistry for InMemoryValidatorPool {
    fn is_validator(&self, address: &Address) -> bool {
        self.validators.contains(address)
    }

    fn validators_count(&self) -> u32 {
        self.validators.len() as u32
    }

    fn is_consensus_running(&self) -> bool {
        self.consensus_running
    }
}

impl SlashHook for InMemoryValidatorPool {
    fn minor_slash(&mut self, infringer: &Address, disputer: &Address) {
        self.slash(SlashKind::Minor, infringer, disputer);
    }

    fn major_slash(&mut self, infringer: &Address, disputer: &Address) {
        self.slash(SlashKind::Major, infringer, disputer);
    }
}

impl ValidatorPool for InMemoryValidatorPool {
    fn complete_ethdkg(&mut self) {
        info!(validators = self.validators.len(), "consensus running");
        self.consensus_running = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_removes_validator() {
        let mut pool = InMemoryValidatorPool::new(vec![[1; 20], [2; 20], [3; 20]]);
        assert_eq!(pool.validators_count(), 3);

        pool.minor_slash(&[2; 20], &[1; 20]);
        assert!(!pool.is_validator(&[2; 20]));
        assert_eq!(pool.validators_count(), 2);

        pool.major_slash(&[1; 20], &[3; 20]);
        assert_eq!(pool.validators(), &[[3; 20]]);
        assert_eq!(
            pool.slashes(),
            &[
                SlashRecord { kind: SlashKind::Minor, infringer: [2; 20], disputer: [1; 20] },
                SlashRecord { kind: SlashKind::Major, infringer: [1; 20], disputer: [3; 20] },
            ]
        );
    }

    #[test]
    fn test_add_validator_is_idempotent() {
        let mut pool = InMemoryValidatorPool::new(vec![[1; 20], [1; 20]]);
        assert_eq!(pool.validators_count(), 1);
        assert!(!pool.add_validator([1; 20]));
        assert!(pool.add_validator([2; 20]));
    }

    #[test]
    fn test_consensus_flag() {
        let mut pool = InMemoryValidatorPool::default();
        assert!(!pool.is_consensus_running());
        pool.complete_ethdkg();
        assert!(pool.is_consensus_running());
        pool.pause_consensus();
        assert!(!pool.is_consensus_running());
    }
}
