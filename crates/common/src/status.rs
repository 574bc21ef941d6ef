//! Run state, outcome and the snapshot observed by the UI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::MintError;
use crate::image::GeneratedImage;
use crate::locator::StorageLocator;

/// State of the in-flight run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No run has started yet
    Idle,
    /// Waiting on the inference service
    GeneratingImage,
    /// Waiting on the storage service
    UploadingImage,
    /// Waiting for the mint transaction to confirm
    AwaitingMintConfirmation,
    /// Run ended with an error
    Failed,
    /// Token minted
    Succeeded,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Succeeded)
    }

    /// Whether a new run may be started from this state
    pub fn accepts_start(self) -> bool {
        self == RunStatus::Idle || self.is_terminal()
    }

    /// Pipeline stage this status represents, if any
    pub fn stage(self) -> Option<Stage> {
        match self {
            RunStatus::GeneratingImage => Some(Stage::GeneratingImage),
            RunStatus::UploadingImage => Some(Stage::UploadingImage),
            RunStatus::AwaitingMintConfirmation => Some(Stage::AwaitingMintConfirmation),
            _ => None,
        }
    }
}

/// One of the three external-service stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GeneratingImage,
    UploadingImage,
    AwaitingMintConfirmation,
}

impl Stage {
    /// User-facing progress message shown while the stage runs
    pub fn message(self) -> &'static str {
        match self {
            Stage::GeneratingImage => "Generating Image...",
            Stage::UploadingImage => "Uploading Image...",
            Stage::AwaitingMintConfirmation => "Waiting for Mint...",
        }
    }

    pub fn status(self) -> RunStatus {
        match self {
            Stage::GeneratingImage => RunStatus::GeneratingImage,
            Stage::UploadingImage => RunStatus::UploadingImage,
            Stage::AwaitingMintConfirmation => RunStatus::AwaitingMintConfirmation,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::GeneratingImage => write!(f, "generating_image"),
            Stage::UploadingImage => write!(f, "uploading_image"),
            Stage::AwaitingMintConfirmation => write!(f, "awaiting_mint_confirmation"),
        }
    }
}

/// Confirmed mint transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Transaction hash (0x-prefixed hex)
    pub transaction_hash: String,

    /// Block the transaction was included in
    pub block_number: u64,

    /// Token URI passed to the contract
    pub token_uri: StorageLocator,
}

/// Terminal record of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MintOutcome {
    Minted {
        locator: StorageLocator,
        receipt: MintReceipt,
    },
    Failed {
        stage: Stage,
        error: MintError,
    },
}

impl MintOutcome {
    pub fn locator(&self) -> Option<&StorageLocator> {
        match self {
            MintOutcome::Minted { locator, .. } => Some(locator),
            MintOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MintOutcome::Minted { .. })
    }
}

/// Read-only view of the orchestrator's run state
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    /// Identifier of the current or last run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,

    pub status: RunStatus,

    /// Progress message for the current stage
    pub message: String,

    /// Current or last acquired image, kept for preview
    #[serde(skip)]
    pub preview: Option<GeneratedImage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MintOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

impl RunSnapshot {
    pub fn idle() -> Self {
        Self {
            run_id: None,
            status: RunStatus::Idle,
            message: String::new(),
            preview: None,
            outcome: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Fresh snapshot for a run entering its first stage.
    ///
    /// The previous run's preview and outcome are discarded.
    pub fn started(run_id: Uuid, first_stage: Stage) -> Self {
        Self {
            run_id: Some(run_id),
            status: first_stage.status(),
            message: first_stage.message().to_string(),
            preview: None,
            outcome: None,
            started_at: Some(Utc::now()),
            finished_at: None,
        }
    }

    pub fn mark_stage(&mut self, stage: Stage) {
        self.status = stage.status();
        self.message = stage.message().to_string();
    }

    /// The stage message is left in place next to the failure
    pub fn mark_failed(&mut self, stage: Stage, error: MintError) {
        self.status = RunStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.outcome = Some(MintOutcome::Failed { stage, error });
    }

    pub fn mark_succeeded(&mut self, locator: StorageLocator, receipt: MintReceipt) {
        self.status = RunStatus::Succeeded;
        self.message = "Minted".to_string();
        self.finished_at = Some(Utc::now());
        self.outcome = Some(MintOutcome::Minted { locator, receipt });
    }

    /// Locator of a successful run, for display
    pub fn locator(&self) -> Option<&StorageLocator> {
        self.outcome.as_ref().and_then(MintOutcome::locator)
    }
}
