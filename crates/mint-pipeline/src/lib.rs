//! Mint Pipeline
//!
//! Turns a mint request into an NFT: acquire artwork (uploaded file or
//! text-to-image inference), pin it to content-addressed storage, and mint a
//! token whose URI is the storage locator.
//!
//! **Components:**
//! - `acquirer`: uploaded file passthrough or inference call
//! - `content_store`: IPFS upload and locator templating
//! - `chain`: chain client seam and Ethereum JSON-RPC client
//! - `mock_chain`: in-memory chain for development/testing
//! - `submitter`: `mint(string)` call with the mint fee attached
//! - `orchestrator`: single-run state machine over the three stages
//! - `config`: configuration management

pub mod acquirer;
pub mod chain;
pub mod config;
pub mod content_store;
pub mod mock_chain;
pub mod orchestrator;
pub mod submitter;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use acquirer::{ImageAcquirer, InferenceAcquirer};
pub use chain::{Address, ChainClient, JsonRpcChain};
pub use config::{Config, ContractRegistry, ModelDescriptor, ModelRegistry};
pub use content_store::{ContentStore, FilebaseStore};
pub use mock_chain::MockChain;
pub use orchestrator::{MintOrchestrator, MintRun};
pub use submitter::{ContractMintSubmitter, MintSubmitter};

/// Wire the production components described by `config`
pub fn build_orchestrator(config: &Config) -> anyhow::Result<MintOrchestrator> {
    let models = Arc::new(config.models.clone());

    let acquirer = InferenceAcquirer::new(
        models.clone(),
        Duration::from_secs(config.inference_timeout_secs),
    )?;
    let store = FilebaseStore::new(&config.storage)?;

    let (chain, contracts): (Arc<dyn ChainClient>, ContractRegistry) = if config.chain.mock_mode {
        info!("Using mock chain (chain id {})", mock_chain::MOCK_CHAIN_ID);
        let contracts = config
            .chain
            .contracts
            .clone()
            .with_contract(mock_chain::MOCK_CHAIN_ID, mock_chain::MOCK_CONTRACT);
        (Arc::new(MockChain::new()), contracts)
    } else {
        let rpc_url = config
            .chain
            .rpc_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CHAIN_RPC_URL is required when MOCK_CHAIN=false"))?;
        info!("Using JSON-RPC chain at {}", rpc_url);
        let chain = JsonRpcChain::new(
            rpc_url,
            Duration::from_millis(config.chain.poll_interval_ms),
            Duration::from_secs(config.chain.confirmation_timeout_secs),
        )?;
        (Arc::new(chain), config.chain.contracts.clone())
    };

    let submitter = ContractMintSubmitter::new(chain, contracts, config.chain.mint_fee_wei);

    Ok(MintOrchestrator::new(
        Arc::new(acquirer),
        Arc::new(store),
        Arc::new(submitter),
        models,
    ))
}
