//! Mint run state machine
//!
//! ```text
//! Idle --start--> GeneratingImage            (no uploaded file)
//! Idle --start--> UploadingImage             (uploaded file)
//! GeneratingImage          --ok--> UploadingImage           | --err--> Failed
//! UploadingImage           --ok--> AwaitingMintConfirmation | --err--> Failed
//! AwaitingMintConfirmation --ok--> Succeeded                | --err--> Failed
//! ```
//!
//! The orchestrator is the only writer of the run snapshot. Readers observe
//! it through [`MintOrchestrator::subscribe`] or [`MintOrchestrator::snapshot`].

use artmint_common::{
    MintError, MintOutcome, MintReceipt, MintRequest, RunSnapshot, RunStatus, Stage,
    StorageLocator,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::acquirer::ImageAcquirer;
use crate::config::ModelRegistry;
use crate::content_store::ContentStore;
use crate::submitter::MintSubmitter;

/// Ownership of the in-flight run.
///
/// Only [`MintOrchestrator::try_start`] creates one, and only while no other
/// run is in flight; [`MintOrchestrator::drive`] consumes it. A run that is
/// dropped before reaching a terminal state, including a `drive` future that
/// is cancelled or panics, is marked [`RunStatus::Failed`] with
/// [`MintError::Abandoned`] so the slot is released.
#[must_use = "a claimed run stays in flight until it is driven"]
#[derive(Debug)]
pub struct MintRun {
    request: MintRequest,
    first_stage: Stage,
    guard: RunGuard,
}

impl MintRun {
    pub fn id(&self) -> Uuid {
        self.guard.id
    }
}

#[derive(Debug)]
struct RunGuard {
    id: Uuid,
    first_stage: Stage,
    state: Arc<watch::Sender<RunSnapshot>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let id = self.id;
        let first_stage = self.first_stage;
        let released = self.state.send_if_modified(|snapshot| {
            if snapshot.run_id != Some(id) || snapshot.status.is_terminal() {
                return false;
            }
            let stage = snapshot.status.stage().unwrap_or(first_stage);
            snapshot.mark_failed(stage, MintError::Abandoned);
            true
        });

        if released {
            warn!("Run {} was abandoned before finishing", id);
        }
    }
}

/// Sequences acquisition, upload and mint for one run at a time
pub struct MintOrchestrator {
    acquirer: Arc<dyn ImageAcquirer>,
    store: Arc<dyn ContentStore>,
    submitter: Arc<dyn MintSubmitter>,
    models: Arc<ModelRegistry>,
    state: Arc<watch::Sender<RunSnapshot>>,
}

impl MintOrchestrator {
    pub fn new(
        acquirer: Arc<dyn ImageAcquirer>,
        store: Arc<dyn ContentStore>,
        submitter: Arc<dyn MintSubmitter>,
        models: Arc<ModelRegistry>,
    ) -> Self {
        let (state, _) = watch::channel(RunSnapshot::idle());
        Self {
            acquirer,
            store,
            submitter,
            models,
            state: Arc::new(state),
        }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Copy of the current run state
    pub fn snapshot(&self) -> RunSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.state.borrow().status
    }

    /// Receiver notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state.subscribe()
    }

    /// Validate `request` and claim the single run slot.
    ///
    /// Rejections leave the run state untouched and perform no I/O.
    pub fn try_start(&self, request: MintRequest) -> Result<MintRun, MintError> {
        request.validate()?;

        if request.needs_generation() && !self.models.contains(&request.selected_model) {
            return Err(MintError::validation(format!(
                "Unknown model: {}",
                request.selected_model
            )));
        }

        let first_stage = if request.needs_generation() {
            Stage::GeneratingImage
        } else {
            Stage::UploadingImage
        };

        let id = Uuid::new_v4();
        let claimed = self.state.send_if_modified(|snapshot| {
            if !snapshot.status.accepts_start() {
                return false;
            }
            *snapshot = RunSnapshot::started(id, first_stage);
            true
        });

        if !claimed {
            warn!("Rejected mint '{}': a run is already in progress", request.name);
            return Err(MintError::RunInProgress);
        }

        info!("Run {} started for '{}' at {}", id, request.name, first_stage);

        Ok(MintRun {
            request,
            first_stage,
            guard: RunGuard {
                id,
                first_stage,
                state: self.state.clone(),
            },
        })
    }

    /// Run a claimed mint to its terminal state
    pub async fn drive(&self, run: MintRun) -> MintOutcome {
        let MintRun {
            request,
            first_stage,
            guard,
        } = run;
        let id = guard.id;

        let image = match self.acquirer.acquire(&request).await {
            Ok(image) => image,
            Err(e) => return self.fail(id, first_stage, e),
        };
        self.state.send_modify(|snapshot| snapshot.preview = Some(image.clone()));

        self.enter(id, Stage::UploadingImage);
        let locator = match self.store.upload(&image).await {
            Ok(locator) => locator,
            Err(e) => return self.fail(id, Stage::UploadingImage, e),
        };
        drop(image);

        self.enter(id, Stage::AwaitingMintConfirmation);
        match self.submitter.submit(&locator).await {
            Ok(receipt) => self.succeed(id, locator, receipt),
            Err(e) => {
                // The uploaded content stays behind, referenced by no token
                warn!("Run {}: locator {} was uploaded but not minted", id, locator);
                self.fail(id, Stage::AwaitingMintConfirmation, e)
            }
        }
    }

    /// Claim and drive in one call
    pub async fn start(&self, request: MintRequest) -> Result<MintOutcome, MintError> {
        let run = self.try_start(request)?;
        Ok(self.drive(run).await)
    }

    fn enter(&self, id: Uuid, stage: Stage) {
        info!("Run {}: {}", id, stage);
        self.state.send_modify(|snapshot| snapshot.mark_stage(stage));
    }

    fn fail(&self, id: Uuid, stage: Stage, error: MintError) -> MintOutcome {
        error!("Run {} failed at {}: {}", id, stage, error);
        self.state
            .send_modify(|snapshot| snapshot.mark_failed(stage, error.clone()));
        MintOutcome::Failed { stage, error }
    }

    fn succeed(&self, id: Uuid, locator: StorageLocator, receipt: MintReceipt) -> MintOutcome {
        info!("Run {} minted {}", id, locator);
        self.state.send_modify(|snapshot| {
            snapshot.mark_succeeded(locator.clone(), receipt.clone())
        });
        MintOutcome::Minted { locator, receipt }
    }
}
