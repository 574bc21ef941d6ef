//! Configuration management for Mint Service
//!
//! Bind address on top of the pipeline configuration.

use anyhow::{Context, Result};
use mint_pipeline::Config;

/// Application configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    pub pipeline: Config,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ServiceConfig {
            api_host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            api_port: var("API_PORT")
                .unwrap_or_else(|| "8086".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            pipeline: Config::from_vars(&var)?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
