//! Mock chain server for local ETHDKG rounds.
//!
//! This provides a JSON-RPC server that hosts the ETHDKG module over an
//! in-memory validator pool. Blocks only advance when asked to, so a round's
//! phase windows can be stepped through by hand.

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use ethdkg_module::{
    handle_query, CallContext, EthDkgGenesisConfig, Event, InMemoryValidatorPool, ModuleCall, ModuleError,
    ModuleQuery, ModuleQueryResponse, ModuleState, ValidatorRegistry,
};
use ethdkg_types::Address;

mod types;
use types::*;

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "Development chain hosting the ETHDKG module")]
struct Cli {
    /// Address to serve JSON-RPC on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis configuration (JSON); defaults apply when omitted
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Initial validators, hex-encoded and comma separated
    #[arg(long, value_delimiter = ',')]
    validators: Vec<String>,
}

/// Shared chain state.
struct ChainState {
    module: ModuleState,
    pool: InMemoryValidatorPool,
    /// Current block height (simulated)
    block_height: u64,
}

impl ChainState {
    fn new(module: ModuleState, validators: Vec<Address>) -> Self {
        Self {
            module,
            pool: InMemoryValidatorPool::new(validators),
            block_height: 0,
        }
    }

    fn advance_blocks(&mut self, n: u64) {
        self.block_height += n;
    }

    /// Run a call at the current height. A rejected call changes nothing.
    fn submit(&mut self, sender: Address, call: ModuleCall) -> Result<CallReceipt, ModuleError> {
        let ctx = CallContext {
            sender,
            block_height: self.block_height,
        };
        let mut module = self.module.clone();
        let mut pool = self.pool.clone();
        let first_event = module.events.len();
        call.dispatch(&mut module, &mut pool, &ctx)?;

        let events_emitted = module.events.len() - first_event;
        self.module = module;
        self.pool = pool;
        Ok(CallReceipt {
            block_height: self.block_height,
            first_event,
            events_emitted,
        })
    }

    fn block_info(&self) -> BlockInfo {
        let controller = &self.module.ethdkg.controller;
        BlockInfo {
            height: self.block_height,
            nonce: controller.nonce,
            phase: controller.phase,
            phase_start_block: controller.phase_start_block,
            consensus_running: self.pool.is_consensus_running(),
            validators: self.pool.validators().iter().map(encode_address).collect(),
        }
    }
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by `n` blocks.
    #[method(name = "admin_advanceBlocks")]
    async fn admin_advance_blocks(&self, n: u64) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Add a validator to the pool.
    #[method(name = "admin_addValidator")]
    async fn admin_add_validator(&self, address: String) -> Result<bool, ErrorObjectOwned>;

    /// Stop consensus so a new round may be started.
    #[method(name = "admin_pauseConsensus")]
    async fn admin_pause_consensus(&self) -> Result<bool, ErrorObjectOwned>;

    /// Start a round on behalf of the validator pool.
    #[method(name = "admin_initializeEthdkg")]
    async fn admin_initialize_ethdkg(&self) -> Result<CallReceipt, ErrorObjectOwned>;

    // ============ Chain Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Submit a hex-encoded borsh `ModuleCall` from `sender`.
    #[method(name = "chain_submitCall")]
    async fn chain_submit_call(&self, sender: String, call: String) -> Result<CallReceipt, ErrorObjectOwned>;

    /// Run a read-only query at the current height.
    #[method(name = "chain_query")]
    async fn chain_query(&self, query: ModuleQuery) -> Result<ModuleQueryResponse, ErrorObjectOwned>;

    /// Events from index `from` on.
    #[method(name = "chain_events")]
    async fn chain_events(&self, from: usize) -> Result<Vec<Event>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn submit(&self, sender: Address, call: ModuleCall) -> Result<CallReceipt, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.submit(sender, call).map_err(|e| {
            warn!(sender = %encode_address(&sender), error = %e, "call rejected");
            call_rejected(&e)
        })
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_advance_blocks(&self, n: u64) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_blocks(n);
        Ok(state.block_info())
    }

    async fn admin_add_validator(&self, address: String) -> Result<bool, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        let added = self.state.write().pool.add_validator(address);
        info!(validator = %encode_address(&address), added, "validator added");
        Ok(added)
    }

    async fn admin_pause_consensus(&self) -> Result<bool, ErrorObjectOwned> {
        self.state.write().pool.pause_consensus();
        info!("consensus paused");
        Ok(true)
    }

    async fn admin_initialize_ethdkg(&self) -> Result<CallReceipt, ErrorObjectOwned> {
        let sender = self.state.read().module.ethdkg.validator_pool;
        self.submit(sender, ModuleCall::InitializeEthDkg)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        Ok(self.state.read().block_info())
    }

    async fn chain_submit_call(&self, sender: String, call: String) -> Result<CallReceipt, ErrorObjectOwned> {
        let sender = parse_address(&sender)?;
        let call = decode_call(&call)?;
        self.submit(sender, call)
    }

    async fn chain_query(&self, query: ModuleQuery) -> Result<ModuleQueryResponse, ErrorObjectOwned> {
        let state = self.state.read();
        handle_query(&state.module, state.block_height, query).map_err(|e| call_rejected(&e))
    }

    async fn chain_events(&self, from: usize) -> Result<Vec<Event>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.events.iter().skip(from).cloned().collect())
    }
}

fn load_genesis(path: Option<&PathBuf>) -> Result<EthDkgGenesisConfig> {
    let Some(path) = path else {
        return Ok(EthDkgGenesisConfig::default());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading genesis {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing genesis {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let genesis = load_genesis(cli.genesis.as_ref())?;
    let module = ModuleState::from_genesis(&genesis)?;
    let validators = cli
        .validators
        .iter()
        .map(|v| parse_address(v).map_err(|e| anyhow::anyhow!("validator {v}: {}", e.message())))
        .collect::<Result<Vec<_>>>()?;

    info!(
        validators = validators.len(),
        phase_length = genesis.phase_length,
        "Starting mock chain server on {}",
        cli.listen
    );

    let server = Server::builder().build(cli.listen).await?;
    let handle = server.start(MockChainServer::new(ChainState::new(module, validators)).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethdkg_module::EthDkgError;

    fn chain(validators: u8) -> ChainState {
        let module = ModuleState::from_genesis(&EthDkgGenesisConfig::default()).unwrap();
        ChainState::new(module, (1..=validators).map(|i| [i; 20]).collect())
    }

    #[test]
    fn test_rejected_call_leaves_state_untouched() {
        let mut chain = chain(4);
        chain.advance_blocks(10);
        let pool = chain.module.ethdkg.validator_pool;

        let receipt = chain.submit(pool, ModuleCall::InitializeEthDkg).unwrap();
        assert_eq!(receipt.first_event, 0);
        assert_eq!(receipt.events_emitted, 1);
        assert_eq!(chain.block_info().nonce, 1);

        let result = chain.submit(pool, ModuleCall::InitializeEthDkg);
        assert!(matches!(result, Err(ModuleError::EthDkg(EthDkgError::EthDkgRoundRunning))));
        assert_eq!(chain.module.events.len(), 1);
        assert_eq!(chain.block_info().nonce, 1);
    }

    #[test]
    fn test_block_info_lists_validators() {
        let mut chain = chain(2);
        chain.advance_blocks(3);
        let info = chain.block_info();
        assert_eq!(info.height, 3);
        assert_eq!(info.validators.len(), 2);
        assert!(!info.consensus_running);
    }
}
