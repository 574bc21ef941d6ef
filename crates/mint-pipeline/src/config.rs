//! Configuration management for the mint pipeline
//!
//! Loads configuration from environment variables (and an optional `.env`
//! file) once at process start. The model registry and network table are
//! immutable after loading.

use anyhow::{Context, Result};
use artmint_common::DEFAULT_GATEWAY_BASE;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::chain::Address;

/// One whole native unit (1 ether) in wei
pub const DEFAULT_MINT_FEE_WEI: u128 = 1_000_000_000_000_000_000;

pub const DEFAULT_FILEBASE_API_ENDPOINT: &str = "https://api.filebase.io/v1/ipfs";

const STABLE_DIFFUSION_2_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-2";
const STABLE_DIFFUSION_XL_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";

/// Inference endpoint and credential for one selectable model
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ModelDescriptor {
    pub url: String,
    pub key: String,
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Display name -> model descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    /// The two Stable Diffusion models, sharing one Hugging Face credential
    pub fn builtin(api_key: &str) -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "Stable Diffusion 2".to_string(),
            ModelDescriptor {
                url: STABLE_DIFFUSION_2_URL.to_string(),
                key: api_key.to_string(),
            },
        );
        models.insert(
            "Stable Diffusion XL Base 1.0".to_string(),
            ModelDescriptor {
                url: STABLE_DIFFUSION_XL_URL.to_string(),
                key: api_key.to_string(),
            },
        );
        Self { models }
    }

    /// Load a registry file shaped `{"<display name>": {"url": .., "key": ..}}`
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model registry: {}", path.display()))?;
        let models: BTreeMap<String, ModelDescriptor> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid model registry: {}", path.display()))?;
        Ok(Self { models })
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ModelDescriptor)>,
        S: Into<String>,
    {
        Self {
            models: entries
                .into_iter()
                .map(|(name, descriptor)| (name.into(), descriptor))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("Model registry must contain at least one model");
        }

        for (name, descriptor) in &self.models {
            reqwest::Url::parse(&descriptor.url)
                .with_context(|| format!("Invalid endpoint URL for model '{}'", name))?;
            if descriptor.key.is_empty() {
                warn!("Model '{}' has no API key configured", name);
            }
        }

        Ok(())
    }
}

/// Chain id -> NFT contract address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractRegistry {
    contracts: BTreeMap<u64, Address>,
}

#[derive(Deserialize)]
struct NetworkEntry {
    nft: ContractEntry,
}

#[derive(Deserialize)]
struct ContractEntry {
    address: String,
}

impl ContractRegistry {
    /// Load a network file shaped `{"<chain id>": {"nft": {"address": "0x.."}}}`
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network config: {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid network config: {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: HashMap<String, NetworkEntry> = serde_json::from_str(raw)?;

        let mut contracts = BTreeMap::new();
        for (chain_id, entry) in entries {
            let chain_id: u64 = chain_id
                .parse()
                .with_context(|| format!("Invalid chain id: {}", chain_id))?;
            let address: Address = entry
                .nft
                .address
                .parse()
                .with_context(|| format!("Invalid NFT address for chain {}", chain_id))?;
            contracts.insert(chain_id, address);
        }

        Ok(Self { contracts })
    }

    pub fn with_contract(mut self, chain_id: u64, address: Address) -> Self {
        self.contracts.insert(chain_id, address);
        self
    }

    pub fn address_for(&self, chain_id: u64) -> Option<Address> {
        self.contracts.get(&chain_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Content store settings
#[derive(Clone)]
pub struct StorageConfig {
    /// Upload API base; `/upload` is appended
    pub api_endpoint: String,

    /// Value of the `x-api-key` header
    pub api_key: String,

    /// Gateway templated into every locator
    pub gateway_base: String,

    pub timeout_secs: u64,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"<redacted>")
            .field("gateway_base", &self.gateway_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Chain client and mint settings
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Use the in-memory chain instead of a JSON-RPC node
    pub mock_mode: bool,

    /// JSON-RPC endpoint (required when not in mock mode)
    pub rpc_url: Option<String>,

    pub contracts: ContractRegistry,

    /// Value attached to each `mint` call
    pub mint_fee_wei: u128,

    pub confirmation_timeout_secs: u64,

    pub poll_interval_ms: u64,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub models: ModelRegistry,

    pub inference_timeout_secs: u64,

    pub storage: StorageConfig,

    pub chain: ChainConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let models = match var("MODEL_REGISTRY_PATH") {
            Some(path) => ModelRegistry::from_file(Path::new(&path))?,
            None => ModelRegistry::builtin(&or("HUGGING_FACE_API_KEY", "")),
        };

        let contracts = match var("NETWORK_CONFIG_PATH") {
            Some(path) => ContractRegistry::from_file(Path::new(&path))?,
            None => ContractRegistry::default(),
        };

        let config = Config {
            models,

            inference_timeout_secs: or("INFERENCE_TIMEOUT_SECS", "120")
                .parse()
                .context("Invalid INFERENCE_TIMEOUT_SECS")?,

            storage: StorageConfig {
                api_endpoint: or("FILEBASE_API_ENDPOINT", DEFAULT_FILEBASE_API_ENDPOINT),
                api_key: or("FILEBASE_API_KEY", ""),
                gateway_base: or("IPFS_GATEWAY_BASE", DEFAULT_GATEWAY_BASE),
                timeout_secs: or("UPLOAD_TIMEOUT_SECS", "60")
                    .parse()
                    .context("Invalid UPLOAD_TIMEOUT_SECS")?,
            },

            chain: ChainConfig {
                mock_mode: or("MOCK_CHAIN", "true")
                    .parse()
                    .context("Invalid MOCK_CHAIN (expected true/false)")?,
                rpc_url: var("CHAIN_RPC_URL"),
                contracts,
                mint_fee_wei: or("MINT_FEE_WEI", &DEFAULT_MINT_FEE_WEI.to_string())
                    .parse()
                    .context("Invalid MINT_FEE_WEI")?,
                confirmation_timeout_secs: or("CONFIRMATION_TIMEOUT_SECS", "120")
                    .parse()
                    .context("Invalid CONFIRMATION_TIMEOUT_SECS")?,
                poll_interval_ms: or("RECEIPT_POLL_INTERVAL_MS", "1000")
                    .parse()
                    .context("Invalid RECEIPT_POLL_INTERVAL_MS")?,
            },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.models.validate()?;

        reqwest::Url::parse(&self.storage.api_endpoint)
            .context("Invalid FILEBASE_API_ENDPOINT")?;
        reqwest::Url::parse(&self.storage.gateway_base).context("Invalid IPFS_GATEWAY_BASE")?;

        if self.storage.api_key.is_empty() {
            warn!("FILEBASE_API_KEY is not set; uploads will be rejected");
        }

        if self.inference_timeout_secs == 0 || self.storage.timeout_secs == 0 {
            anyhow::bail!("Request timeouts must be greater than 0");
        }

        if self.chain.confirmation_timeout_secs == 0 || self.chain.poll_interval_ms == 0 {
            anyhow::bail!("CONFIRMATION_TIMEOUT_SECS and RECEIPT_POLL_INTERVAL_MS must be greater than 0");
        }

        // A real node needs an endpoint and somewhere to mint
        if !self.chain.mock_mode {
            match &self.chain.rpc_url {
                None => anyhow::bail!("CHAIN_RPC_URL is required when MOCK_CHAIN=false"),
                Some(url) => {
                    reqwest::Url::parse(url).context("Invalid CHAIN_RPC_URL")?;
                }
            }
            if self.chain.contracts.is_empty() {
                anyhow::bail!("NETWORK_CONFIG_PATH is required when MOCK_CHAIN=false");
            }
        }

        Ok(())
    }
}
