use serde::Serialize;
use thiserror::Error;

/// Normalized failure of a mint run.
///
/// Every pipeline component converts its own transport or protocol errors
/// into one of these kinds before returning, so nothing lower-level ever
/// reaches the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MintError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Image generation failed{}: {message}", format_status(.status))]
    GenerationFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Image upload failed{}: {message}", format_status(.status))]
    UploadFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Mint submission failed: {message}")]
    MintSubmissionFailed { message: String },

    #[error("A mint run is already in progress")]
    RunInProgress,

    /// The run was dropped before reaching a terminal state
    #[error("Mint run was abandoned before it finished")]
    Abandoned,
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl MintError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn generation(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            status,
            message: message.into(),
        }
    }

    pub fn upload(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UploadFailed {
            status,
            message: message.into(),
        }
    }

    pub fn submission(message: impl Into<String>) -> Self {
        Self::MintSubmissionFailed {
            message: message.into(),
        }
    }

    /// Stable snake_case label, used on the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            MintError::Validation { .. } => "validation",
            MintError::InvalidInput { .. } => "invalid_input",
            MintError::GenerationFailed { .. } => "generation_failed",
            MintError::UploadFailed { .. } => "upload_failed",
            MintError::MintSubmissionFailed { .. } => "mint_submission_failed",
            MintError::RunInProgress => "run_in_progress",
            MintError::Abandoned => "abandoned",
        }
    }

    /// Upstream HTTP status, when the failing service returned one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            MintError::GenerationFailed { status, .. } | MintError::UploadFailed { status, .. } => {
                *status
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MintError>;
