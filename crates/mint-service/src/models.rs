//! Request and response bodies for Mint Service

use artmint_common::{MintError, MintRequest, RunSnapshot, UploadedFile};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uploaded image, base64-encoded
#[derive(Debug, Clone, Deserialize)]
pub struct FileBody {
    /// Raw base64 or a `data:<mime>;base64,` URL
    pub data: String,

    pub mime_type: String,
}

impl FileBody {
    fn decode(&self) -> Result<UploadedFile, MintError> {
        let encoded = match self.data.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MintError::validation(format!("Uploaded file is not valid base64: {}", e)))?;

        Ok(UploadedFile::new(bytes, self.mime_type.clone()))
    }
}

/// Body of `POST /api/mint`
#[derive(Debug, Clone, Deserialize)]
pub struct MintRequestBody {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Display name of the inference model
    #[serde(default = "default_model")]
    pub model: String,

    /// Overrides generation when present
    #[serde(default)]
    pub file: Option<FileBody>,
}

fn default_model() -> String {
    "Stable Diffusion 2".to_string()
}

impl MintRequestBody {
    pub fn into_request(self) -> Result<MintRequest, MintError> {
        let request = MintRequest::generate(self.name, self.description, self.model);
        match self.file {
            Some(file) => Ok(request.with_file(file.decode()?)),
            None => Ok(request),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub success: bool,
    pub run_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Body of `GET /api/status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: RunSnapshot,

    /// Whether a preview image can be fetched
    pub has_preview: bool,

    /// Token URI of a successful run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl From<RunSnapshot> for StatusResponse {
    fn from(snapshot: RunSnapshot) -> Self {
        Self {
            has_preview: snapshot.preview.is_some(),
            locator: snapshot.locator().map(|l| l.to_string()),
            snapshot,
        }
    }
}
