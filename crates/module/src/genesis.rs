//! Genesis configuration for the ETHDKG and snapshot modules.
//!
//! This module defines the round timing, the privileged addresses and the
//! snapshot parameters the chain starts with.

use ethdkg_types::Address;
use serde::{Deserialize, Serialize};

/// Address the validator pool calls `initializeETHDKG` from, unless configured.
pub const DEFAULT_VALIDATOR_POOL: Address = [0x01; 20];

/// Longest phase a genesis may configure, in blocks.
pub const MAX_PHASE_LENGTH: u64 = 1 << 32;

/// Address allowed to run migrations, unless configured.
pub const DEFAULT_FACTORY: Address = [0x02; 20];

/// Genesis configuration for the ETHDKG module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthDkgGenesisConfig {
    /// Blocks in each phase window
    pub phase_length: u64,

    /// Blocks between a phase change and the start of its window
    pub confirmation_length: u64,

    /// Validators required to start a round
    pub min_validators: u32,

    /// Caller allowed to start rounds
    pub validator_pool: Address,

    /// Caller allowed to migrate validators and snapshots
    pub factory: Address,

    pub snapshots: SnapshotGenesisConfig,
}

/// Snapshot parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotGenesisConfig {
    /// Sidechain id every snapshot must carry
    pub chain_id: u32,
    /// Sidechain blocks per epoch
    pub epoch_length: u32,
    /// Snapshots kept readable
    pub buffer_capacity: u32,
    /// Host blocks required between two snapshots
    pub minimum_interval_between_snapshots: u64,
    /// Host blocks after the last snapshot before the election widens
    pub desperation_delay: u64,
    /// Controls how fast the election widens once desperate
    pub desperation_factor: u64,
}

impl Default for SnapshotGenesisConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            epoch_length: 1024,
            buffer_capacity: 6,
            minimum_interval_between_snapshots: 0,
            desperation_delay: 20,
            desperation_factor: 40,
        }
    }
}

impl Default for EthDkgGenesisConfig {
    fn default() -> Self {
        Self {
            phase_length: 40,
            confirmation_length: 6,
            min_validators: 4,
            validator_pool: DEFAULT_VALIDATOR_POOL,
            factory: DEFAULT_FACTORY,
            snapshots: SnapshotGenesisConfig::default(),
        }
    }
}

impl EthDkgGenesisConfig {
    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.phase_length == 0 {
            return Err(GenesisValidationError::InvalidPhaseTiming(
                "Phase length cannot be zero".into(),
            ));
        }
        if self.phase_length > MAX_PHASE_LENGTH {
            return Err(GenesisValidationError::InvalidPhaseTiming(format!(
                "Phase length {} exceeds {}",
                self.phase_length, MAX_PHASE_LENGTH
            )));
        }
        if self.confirmation_length >= self.phase_length {
            return Err(GenesisValidationError::InvalidPhaseTiming(format!(
                "Confirmation length {} must be smaller than phase length {}",
                self.confirmation_length, self.phase_length
            )));
        }
        if self.min_validators == 0 {
            return Err(GenesisValidationError::InvalidMinValidators);
        }

        let snapshots = &self.snapshots;
        if snapshots.epoch_length == 0 {
            return Err(GenesisValidationError::InvalidSnapshotParams(
                "Epoch length cannot be zero".into(),
            ));
        }
        if snapshots.buffer_capacity == 0 {
            return Err(GenesisValidationError::InvalidSnapshotParams(
                "Buffer capacity cannot be zero".into(),
            ));
        }
        if snapshots.desperation_factor == 0 {
            return Err(GenesisValidationError::InvalidSnapshotParams(
                "Desperation factor cannot be zero".into(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid phase timing: {0}")]
    InvalidPhaseTiming(String),

    #[error("Minimum validators cannot be zero")]
    InvalidMinValidators,

    #[error("Invalid snapshot parameters: {0}")]
    InvalidSnapshotParams(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EthDkgGenesisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshots.epoch_length, 1024);
    }

    #[test]
    fn test_confirmation_must_fit_in_phase() {
        let mut config = EthDkgGenesisConfig::default();
        config.confirmation_length = config.phase_length;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidPhaseTiming(_))
        ));

        config.phase_length = 0;
        config.confirmation_length = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidPhaseTiming(_))
        ));
    }

    #[test]
    fn test_phase_length_is_bounded() {
        let mut config = EthDkgGenesisConfig::default();
        config.phase_length = MAX_PHASE_LENGTH;
        assert!(config.validate().is_ok());

        config.phase_length = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidPhaseTiming(_))
        ));
    }

    #[test]
    fn test_invalid_snapshot_params() {
        let mut config = EthDkgGenesisConfig::default();
        config.snapshots.buffer_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidSnapshotParams(_))
        ));

        let mut config = EthDkgGenesisConfig::default();
        config.min_validators = 0;
        assert_eq!(config.validate(), Err(GenesisValidationError::InvalidMinValidators));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EthDkgGenesisConfig =
            serde_json::from_str(r#"{"phase_length": 10, "snapshots": {"epoch_length": 8}}"#).unwrap();
        assert_eq!(config.phase_length, 10);
        assert_eq!(config.confirmation_length, 6);
        assert_eq!(config.snapshots.epoch_length, 8);
        assert_eq!(config.snapshots.buffer_capacity, 6);
        assert!(config.validate().is_ok());
    }
}
