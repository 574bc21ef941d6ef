//! User-entered mint request

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MintError;

/// A user-supplied image file
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Raw file contents
    pub bytes: Vec<u8>,

    /// MIME type declared by the uploader (e.g. "image/png")
    pub mime_type: String,
}

impl UploadedFile {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Form input for a single mint run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Token name
    pub name: String,

    /// Prompt for generation; optional when a file is supplied
    #[serde(default)]
    pub description: String,

    /// Display name of the inference model (key into the model registry)
    pub selected_model: String,

    /// User-supplied artwork. Takes precedence over generation when present.
    #[serde(default)]
    pub uploaded_file: Option<UploadedFile>,
}

impl MintRequest {
    /// Request that generates its artwork from `description`
    pub fn generate(
        name: impl Into<String>,
        description: impl Into<String>,
        selected_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            selected_model: selected_model.into(),
            uploaded_file: None,
        }
    }

    /// Attach a user-supplied file, which replaces generation
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.uploaded_file = Some(file);
        self
    }

    /// Whether this request needs the inference service.
    ///
    /// An uploaded file always wins over the description.
    pub fn needs_generation(&self) -> bool {
        self.uploaded_file.is_none()
    }

    /// Check the form fields required before any stage may start
    pub fn validate(&self) -> Result<(), MintError> {
        if self.name.trim().is_empty() {
            return Err(MintError::validation("Please provide a name"));
        }

        match &self.uploaded_file {
            Some(file) if file.bytes.is_empty() => {
                Err(MintError::validation("Uploaded file is empty"))
            }
            Some(_) => Ok(()),
            None if self.description.trim().is_empty() => Err(MintError::validation(
                "Please provide a description or upload an image",
            )),
            None => Ok(()),
        }
    }
}
