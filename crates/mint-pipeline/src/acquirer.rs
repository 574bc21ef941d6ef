//! Image acquisition: user upload or text-to-image inference

use artmint_common::{GeneratedImage, MintError, MintRequest};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ModelRegistry;

/// Produces the image bytes for a run
#[async_trait]
pub trait ImageAcquirer: Send + Sync {
    /// Return the uploaded file if there is one, otherwise generate an image
    /// from the request's description.
    async fn acquire(&self, request: &MintRequest) -> Result<GeneratedImage, MintError>;
}

/// Use the uploaded file as-is. Never touches the network.
pub fn take_uploaded(request: &MintRequest) -> Option<Result<GeneratedImage, MintError>> {
    let file = request.uploaded_file.as_ref()?;
    if file.bytes.is_empty() {
        return Some(Err(MintError::invalid_input("Uploaded file is empty")));
    }
    Some(Ok(GeneratedImage::from(file.clone())))
}

/// Acquirer backed by a Hugging Face style inference API
pub struct InferenceAcquirer {
    models: Arc<ModelRegistry>,
    client: reqwest::Client,
}

impl InferenceAcquirer {
    pub fn new(models: Arc<ModelRegistry>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { models, client })
    }

    async fn generate(&self, request: &MintRequest) -> Result<GeneratedImage, MintError> {
        let model = self.models.get(&request.selected_model).ok_or_else(|| {
            MintError::generation(
                None,
                format!("Unknown model: {}", request.selected_model),
            )
        })?;

        info!(
            "Generating image with '{}' ({} chars of prompt)",
            request.selected_model,
            request.description.len()
        );

        let payload = serde_json::json!({
            "inputs": request.description,
            "options": { "wait_for_model": true },
        });

        let response = self
            .client
            .post(&model.url)
            .header(AUTHORIZATION, format!("Bearer {}", model.key))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| MintError::generation(None, format!("Inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Inference service returned {}: {}", status, body);
            return Err(MintError::generation(
                Some(status.as_u16()),
                format!("Inference service returned {}", status),
            ));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| {
                MintError::generation(
                    Some(status.as_u16()),
                    "Inference response has no content type",
                )
            })?;

        let bytes = response.bytes().await.map_err(|e| {
            MintError::generation(
                Some(status.as_u16()),
                format!("Failed to read inference response: {}", e),
            )
        })?;

        if bytes.is_empty() {
            return Err(MintError::generation(
                Some(status.as_u16()),
                "Inference response is empty",
            ));
        }

        debug!("Received {} bytes of {}", bytes.len(), mime_type);

        Ok(GeneratedImage::new(bytes.to_vec(), mime_type))
    }
}

#[async_trait]
impl ImageAcquirer for InferenceAcquirer {
    async fn acquire(&self, request: &MintRequest) -> Result<GeneratedImage, MintError> {
        if let Some(uploaded) = take_uploaded(request) {
            debug!("Using uploaded file, skipping generation");
            return uploaded;
        }

        self.generate(request).await
    }
}
