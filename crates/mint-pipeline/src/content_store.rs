//! Content-addressed storage client

use artmint_common::{GeneratedImage, MintError, StorageLocator};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::StorageConfig;

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// Filename sent with every upload
pub const UPLOAD_FILENAME: &str = "image.jpeg";

/// Persists image bytes and returns where they can be resolved
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn upload(&self, image: &GeneratedImage) -> Result<StorageLocator, MintError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    cid: Option<String>,
}

/// Filebase IPFS upload API
pub struct FilebaseStore {
    upload_url: String,
    api_key: String,
    gateway_base: String,
    client: reqwest::Client,
}

impl FilebaseStore {
    pub fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            upload_url: format!("{}/upload", config.api_endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            gateway_base: config.gateway_base.clone(),
            client,
        })
    }
}

#[async_trait]
impl ContentStore for FilebaseStore {
    async fn upload(&self, image: &GeneratedImage) -> Result<StorageLocator, MintError> {
        info!("Uploading {} bytes of {}", image.len(), image.mime_type);

        let part = Part::bytes(image.bytes.clone())
            .file_name(UPLOAD_FILENAME)
            .mime_str(&image.mime_type)
            .map_err(|e| {
                MintError::upload(None, format!("Invalid MIME type '{}': {}", image.mime_type, e))
            })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.upload_url)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MintError::upload(None, format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Storage service returned {}: {}", status, body);
            return Err(MintError::upload(
                Some(status.as_u16()),
                format!("Storage service returned {}", status),
            ));
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            MintError::upload(
                Some(status.as_u16()),
                format!("Failed to parse upload response: {}", e),
            )
        })?;

        let cid = body
            .cid
            .filter(|cid| !cid.trim().is_empty())
            .ok_or_else(|| {
                MintError::upload(Some(status.as_u16()), "Upload response has no cid")
            })?;

        let locator = StorageLocator::from_cid(&self.gateway_base, &cid);
        info!("Image stored at {}", locator);

        Ok(locator)
    }
}
