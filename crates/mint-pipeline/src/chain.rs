//! Chain client seam and Ethereum JSON-RPC implementation
//!
//! The mint submitter only needs four things from the wallet/network side:
//! the active chain id, a signing account, a way to send a value-bearing
//! transaction, and a way to wait for its receipt.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// JSON-RPC error code for a transaction the user declined in the wallet
pub const USER_REJECTED_CODE: i64 = 4001;

/// 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Hash of a submitted transaction (0x-prefixed hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contract call carrying native value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    /// Attached value in wei
    pub value: u128,
    /// ABI-encoded calldata
    pub data: Vec<u8>,
}

/// Receipt of an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    /// False when the transaction reverted
    pub success: bool,
}

/// Wallet and network collaborator used by the mint submitter
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Identifier of the active network
    async fn chain_id(&self) -> Result<u64>;

    /// Account that signs transactions
    async fn signer(&self) -> Result<Address>;

    /// Submit a transaction, returning once it has been accepted for inclusion
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash>;

    /// Suspend until the transaction is included in a block
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt>;
}

/// First four bytes of the Keccak-256 hash of a function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

fn push_word(data: &mut Vec<u8>, value: usize) {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    data.extend_from_slice(&word);
}

/// Calldata for a function taking a single `string` argument
pub fn encode_string_call(signature: &str, arg: &str) -> Vec<u8> {
    let bytes = arg.as_bytes();
    let padded_len = bytes.len().div_ceil(32) * 32;

    let mut data = Vec::with_capacity(4 + 64 + padded_len);
    data.extend_from_slice(&function_selector(signature));
    // Head: offset of the dynamic argument, relative to the start of the args
    push_word(&mut data, 32);
    // Tail: length, then the bytes right-padded to a word boundary
    push_word(&mut data, bytes.len());
    data.extend_from_slice(bytes);
    data.resize(4 + 64 + padded_len, 0);
    data
}

/// Inverse of [`encode_string_call`], for the selector of `signature`
pub fn decode_string_call(signature: &str, data: &[u8]) -> Option<String> {
    if data.len() < 4 + 64 || data[..4] != function_selector(signature) {
        return None;
    }
    let args = &data[4..];
    let offset = read_word(&args[..32])?;
    let start = offset.checked_add(32)?;
    let len = read_word(args.get(offset..start)?)?;
    let bytes = args.get(start..start.checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

fn read_word(word: &[u8]) -> Option<usize> {
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..32]);
    usize::try_from(u64::from_be_bytes(tail)).ok()
}

fn parse_quantity(raw: &str) -> Result<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid hex quantity: {}", raw))
}

/// Error object returned by a JSON-RPC node or wallet bridge
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

/// Chain client speaking Ethereum JSON-RPC over HTTP.
///
/// Signing is delegated to the node (`eth_sendTransaction`), which is how a
/// local development node or a wallet bridge exposes its accounts. Every
/// request, and the whole confirmation wait, is bounded by the confirmation
/// timeout.
pub struct JsonRpcChain {
    rpc_url: String,
    client: reqwest::Client,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    /// Create a new JSON-RPC client
    pub fn new(
        rpc_url: String,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(confirmation_timeout)
            .build()
            .context("Failed to build chain RPC client")?;

        Ok(Self {
            rpc_url,
            client,
            poll_interval,
            confirmation_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("JSON-RPC request {} -> {}", id, method);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach chain RPC for {}", method))?;

        if !response.status().is_success() {
            anyhow::bail!("Chain RPC returned {} for {}", response.status(), method);
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = body.error {
            return Err(error.into());
        }

        Ok(body.result)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        self.call(method, params)
            .await?
            .with_context(|| format!("{} returned no result", method))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChain {
    async fn chain_id(&self) -> Result<u64> {
        let raw: String = self
            .call_required("eth_chainId", serde_json::json!([]))
            .await?;
        parse_quantity(&raw)
    }

    async fn signer(&self) -> Result<Address> {
        let accounts: Vec<String> = self
            .call_required("eth_accounts", serde_json::json!([]))
            .await?;

        let first = accounts
            .first()
            .context("No signer available: the wallet exposes no accounts")?;

        first
            .parse()
            .with_context(|| format!("Invalid signer address: {}", first))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash> {
        let params = serde_json::json!([{
            "from": tx.from.to_string(),
            "to": tx.to.to_string(),
            "value": format!("{:#x}", tx.value),
            "data": format!("0x{}", hex::encode(&tx.data)),
        }]);

        let hash: String = self.call_required("eth_sendTransaction", params).await?;
        info!("Transaction submitted: {}", hash);
        Ok(TxHash(hash))
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt> {
        match tokio::time::timeout(self.confirmation_timeout, self.poll_receipt(tx_hash)).await {
            Ok(receipt) => receipt,
            Err(_) => anyhow::bail!(
                "Timed out after {}s waiting for confirmation of {}",
                self.confirmation_timeout.as_secs(),
                tx_hash
            ),
        }
    }
}

impl JsonRpcChain {
    async fn poll_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .call(
                    "eth_getTransactionReceipt",
                    serde_json::json!([tx_hash.0.as_str()]),
                )
                .await?;

            if let Some(receipt) = receipt {
                // Pending receipts carry no block number yet
                if let Some(block) = receipt.block_number.as_deref() {
                    return Ok(TransactionReceipt {
                        transaction_hash: TxHash(receipt.transaction_hash),
                        block_number: parse_quantity(block)?,
                        success: receipt.status.as_deref() != Some("0x0"),
                    });
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
