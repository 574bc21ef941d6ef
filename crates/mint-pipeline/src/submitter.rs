//! Submits a storage locator to the NFT contract

use artmint_common::{MintError, MintReceipt, StorageLocator};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::{encode_string_call, ChainClient, TransactionRequest};
use crate::config::ContractRegistry;

/// Contract method that mints a token for the caller
pub const MINT_SIGNATURE: &str = "mint(string)";

/// Records a locator on-chain as a token URI
#[async_trait]
pub trait MintSubmitter: Send + Sync {
    /// Mint a token pointing at `locator`, returning once it is confirmed
    async fn submit(&self, locator: &StorageLocator) -> Result<MintReceipt, MintError>;
}

/// Mints through a [`ChainClient`] against the contract configured for the
/// active network
pub struct ContractMintSubmitter {
    chain: Arc<dyn ChainClient>,
    contracts: ContractRegistry,
    mint_fee_wei: u128,
}

impl ContractMintSubmitter {
    pub fn new(chain: Arc<dyn ChainClient>, contracts: ContractRegistry, mint_fee_wei: u128) -> Self {
        Self {
            chain,
            contracts,
            mint_fee_wei,
        }
    }
}

fn failed(context: &str, err: anyhow::Error) -> MintError {
    warn!("{}: {:#}", context, err);
    MintError::submission(format!("{}: {:#}", context, err))
}

#[async_trait]
impl MintSubmitter for ContractMintSubmitter {
    async fn submit(&self, locator: &StorageLocator) -> Result<MintReceipt, MintError> {
        let chain_id = self
            .chain
            .chain_id()
            .await
            .map_err(|e| failed("Failed to read active network", e))?;

        let contract = self.contracts.address_for(chain_id).ok_or_else(|| {
            MintError::submission(format!("No NFT contract configured for chain {}", chain_id))
        })?;

        let signer = self
            .chain
            .signer()
            .await
            .map_err(|e| failed("Signer unavailable", e))?;

        let tx = TransactionRequest {
            from: signer,
            to: contract,
            value: self.mint_fee_wei,
            data: encode_string_call(MINT_SIGNATURE, locator.as_str()),
        };

        info!(
            "Minting {} on chain {} via {} from {}",
            locator, chain_id, contract, signer
        );

        let tx_hash = self
            .chain
            .send_transaction(&tx)
            .await
            .map_err(|e| failed("Transaction was not submitted", e))?;

        let receipt = self
            .chain
            .wait_for_receipt(&tx_hash)
            .await
            .map_err(|e| failed("Transaction was not confirmed", e))?;

        if !receipt.success {
            return Err(MintError::submission(format!(
                "Transaction {} reverted in block {}",
                receipt.transaction_hash, receipt.block_number
            )));
        }

        info!(
            "Mint confirmed: {} in block {}",
            receipt.transaction_hash, receipt.block_number
        );

        Ok(MintReceipt {
            transaction_hash: receipt.transaction_hash.0,
            block_number: receipt.block_number,
            token_uri: locator.clone(),
        })
    }
}
