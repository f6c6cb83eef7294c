//! On-chain ETHDKG module with a snapshot ring buffer.
//!
//! Validators run a distributed key generation round through a sequence of
//! block-height windows:
//!
//! - Registration of each validator's public key
//! - Share distribution, with disputes against bad or missing shares
//! - Key share and master public key submission
//! - Group public key (GPKJ) submission, with disputes against bad keys
//! - Completion, which activates the master public key
//!
//! Once a round completes, the group commits signed sidechain snapshots,
//! one per epoch, into a bounded ring buffer.
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers` / `accusations` / `snapshots`: Business logic for calls
//! - `phase`: Phase windows and transitions
//! - `pool`: The external validator pool the module reports to
//! - `queries`: Read-only state access
//! - `state`: On-chain state structures
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use ethdkg_module::{handlers, CallContext, EthDkgGenesisConfig, ModuleState};
//!
//! let mut state = ModuleState::from_genesis(&EthDkgGenesisConfig::default())?;
//! let ctx = CallContext { sender: pool_address, block_height: 100 };
//!
//! // Open a round
//! handlers::handle_initialize_ethdkg(&mut state, &mut pool, &ctx)?;
//! ```

pub mod accusations;
pub mod call;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod phase;
pub mod pool;
pub mod queries;
pub mod ring_buffer;
pub mod snapshots;
pub mod state;

pub use accusations::GpkjAccusationOutcome;
pub use call::ModuleCall;
pub use error::{AllowedWindow, EthDkgError, ModuleError, SnapshotError, Window};
pub use events::Event;
pub use genesis::{EthDkgGenesisConfig, GenesisValidationError, SnapshotGenesisConfig};
pub use handlers::{CallContext, HandlerResult};
pub use phase::PhaseController;
pub use pool::{InMemoryValidatorPool, SlashHook, SlashKind, SlashRecord, ValidatorPool, ValidatorRegistry};
pub use queries::{handle_query, ModuleQuery, ModuleQueryResponse};
pub use snapshots::{election_seed, may_validator_snapshot, SnapshotResult};
pub use state::{EthDkgState, ModuleState, Participant, SnapshotState};
