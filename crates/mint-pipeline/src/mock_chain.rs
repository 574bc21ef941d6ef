//! In-memory chain for development and testing
//!
//! Simulates a wallet-connected network without a node: one funded account,
//! instant inclusion on `wait_for_receipt`, and a record of every token URI
//! minted through it.

use anyhow::Result;
use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::chain::{
    decode_string_call, Address, ChainClient, TransactionReceipt, TransactionRequest, TxHash,
};
use crate::submitter::MINT_SIGNATURE;

/// Chain id of a local development network
pub const MOCK_CHAIN_ID: u64 = 31337;

/// Address the mock network uses for its NFT contract
pub const MOCK_CONTRACT: Address = Address([
    0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64, 0x2f,
    0x64, 0x18, 0x0a, 0xa3,
]);

/// Funded signer account of the mock network
pub const MOCK_ACCOUNT: Address = Address([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);

/// A token minted on the mock chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub token_id: u64,
    pub token_uri: String,
    pub owner: Address,
    pub contract: Address,
    pub value: u128,
    pub block_number: u64,
}

#[derive(Debug)]
struct MockChainState {
    block_height: u64,
    nonce: u64,
    balance: u128,
    rejection: Option<String>,
    pending: HashMap<TxHash, TransactionRequest>,
    minted: Vec<MintedToken>,
}

/// Mock chain client
pub struct MockChain {
    chain_id: u64,
    account: Option<Address>,
    state: Mutex<MockChainState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// Create a mock chain with one account holding 10,000 native units
    pub fn new() -> Self {
        Self {
            chain_id: MOCK_CHAIN_ID,
            account: Some(MOCK_ACCOUNT),
            state: Mutex::new(MockChainState {
                block_height: 1,
                nonce: 0,
                balance: 10_000 * crate::config::DEFAULT_MINT_FEE_WEI,
                rejection: None,
                pending: HashMap::new(),
                minted: Vec::new(),
            }),
        }
    }

    /// A network with no connected account
    pub fn without_signer() -> Self {
        Self {
            account: None,
            ..Self::new()
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub async fn set_balance(&self, wei: u128) {
        self.state.lock().await.balance = wei;
    }

    /// Make every following submission fail as if the user declined it
    pub async fn reject_transactions(&self, reason: impl Into<String>) {
        self.state.lock().await.rejection = Some(reason.into());
    }

    pub async fn accept_transactions(&self) {
        self.state.lock().await.rejection = None;
    }

    /// Tokens minted so far, in order
    pub async fn minted(&self) -> Vec<MintedToken> {
        self.state.lock().await.minted.clone()
    }

    pub async fn block_height(&self) -> u64 {
        self.state.lock().await.block_height
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn signer(&self) -> Result<Address> {
        self.account
            .ok_or_else(|| anyhow::anyhow!("No signer available: wallet is not connected"))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash> {
        let mut state = self.state.lock().await;

        if let Some(reason) = &state.rejection {
            anyhow::bail!("{}", reason);
        }

        if tx.value > state.balance {
            anyhow::bail!(
                "insufficient funds for transfer: balance {} wei, value {} wei",
                state.balance,
                tx.value
            );
        }

        state.nonce += 1;
        let mut hasher = Keccak256::new();
        hasher.update(state.nonce.to_be_bytes());
        hasher.update(&tx.data);
        let hash = TxHash(format!("0x{}", hex::encode(hasher.finalize())));

        state.balance -= tx.value;
        state.pending.insert(hash.clone(), tx.clone());

        debug!("Mock chain: accepted transaction {}", hash);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt> {
        let mut state = self.state.lock().await;

        let tx = state
            .pending
            .remove(tx_hash)
            .ok_or_else(|| anyhow::anyhow!("Unknown transaction: {}", tx_hash))?;

        state.block_height += 1;
        let block_number = state.block_height;

        // Anything that isn't a well-formed mint call reverts
        let success = match decode_string_call(MINT_SIGNATURE, &tx.data) {
            Some(token_uri) => {
                let token_id = state.minted.len() as u64 + 1;
                state.minted.push(MintedToken {
                    token_id,
                    token_uri,
                    owner: tx.from,
                    contract: tx.to,
                    value: tx.value,
                    block_number,
                });
                true
            }
            None => false,
        };

        debug!(
            "Mock chain: {} included in block {} (success: {})",
            tx_hash, block_number, success
        );

        Ok(TransactionReceipt {
            transaction_hash: tx_hash.clone(),
            block_number,
            success,
        })
    }
}
