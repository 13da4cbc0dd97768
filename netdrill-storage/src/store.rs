//! Single-slot experiment lifecycle store

use crate::error::StoreError;
use crate::repository::{ExperimentRepository, InMemoryExperimentRepository};
use crate::state::{ExperimentState, ExperimentStatus};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Default)]
struct Slot {
    experiment: Option<ExperimentState>,
    cancel: Option<CancellationToken>,
}

/// Tracks the one experiment this process runs
///
/// All transitions go through a single lock and mirror the record to the
/// repository while holding it, so repository writes land in mutation order.
pub struct ExperimentStore {
    slot: Mutex<Slot>,
    repository: Arc<dyn ExperimentRepository>,
}

impl ExperimentStore {
    pub fn new(repository: Arc<dyn ExperimentRepository>) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            repository,
        }
    }

    /// Store mirroring into process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryExperimentRepository::new()))
    }

    pub fn repository(&self) -> &Arc<dyn ExperimentRepository> {
        &self.repository
    }

    async fn mirror(&self, state: &ExperimentState) {
        if let Err(e) = self.repository.save(state).await {
            warn!("Failed to mirror experiment {}: {}", state.name, e);
        }
    }

    /// Apply `f` to the current experiment, if any
    async fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut ExperimentState),
    {
        let mut slot = self.slot.lock().await;
        if let Some(experiment) = slot.experiment.as_mut() {
            f(experiment);
            if experiment.ended_at.is_none() {
                experiment.updated_at = Utc::now();
            }
            let snapshot = experiment.clone();
            self.mirror(&snapshot).await;
        }
    }

    /// Install a new experiment and start it
    pub async fn add(
        &self,
        mut state: ExperimentState,
        cancel: CancellationToken,
    ) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().await;
        if let Some(current) = &slot.experiment {
            if current.status.is_active() {
                return Err(StoreError::AlreadyRunning(current.name.clone()));
            }
        }

        let now = Utc::now();
        state.status = ExperimentStatus::Running;
        state.updated_at = now;
        state.ended_at = None;
        info!("Experiment {} started", state.name);
        self.mirror(&state).await;
        slot.experiment = Some(state);
        slot.cancel = Some(cancel);
        Ok(())
    }

    /// Request cancellation of the current experiment
    pub async fn cancel(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().await;
        let Slot { experiment, cancel } = &mut *slot;
        let experiment = experiment.as_mut().ok_or(StoreError::NoExperiment)?;

        experiment.status = ExperimentStatus::Cancelling;
        experiment.updated_at = Utc::now();
        if let Some(token) = cancel {
            token.cancel();
        }
        info!("Cancellation requested for experiment {}", experiment.name);
        let snapshot = experiment.clone();
        self.mirror(&snapshot).await;
        Ok(())
    }

    async fn finish(&self, status: ExperimentStatus, error: Option<String>) {
        self.mutate(|experiment| {
            experiment.status = status;
            if let Some(error) = error {
                experiment.errors.push(error);
            }
            let now = Utc::now();
            experiment.updated_at = now;
            experiment.ended_at = Some(now);
        })
        .await;
    }

    pub async fn finish_with_success(&self) {
        self.finish(ExperimentStatus::Success, None).await;
    }

    pub async fn finish_with_error(&self, message: impl Into<String>) {
        self.finish(ExperimentStatus::Error, Some(message.into())).await;
    }

    pub async fn finish_cancelled(&self) {
        self.finish(ExperimentStatus::Cancelled, None).await;
    }

    pub async fn update_current_step(&self, name: impl Into<String>, step: usize) {
        let name = name.into();
        self.mutate(|experiment| {
            experiment.current_step_name = name;
            experiment.current_step_no = step;
        })
        .await;
    }

    pub async fn append_log(&self, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|experiment| experiment.logs.push(message)).await;
    }

    pub async fn append_warning(&self, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|experiment| experiment.warnings.push(message)).await;
    }

    pub async fn append_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|experiment| experiment.errors.push(message)).await;
    }

    /// Consistent snapshot of the current experiment
    pub async fn atomic_get(&self) -> Option<ExperimentState> {
        self.slot.lock().await.experiment.clone()
    }

    /// Whether no experiment with this name was ever stored
    pub async fn name_is_unique(&self, name: &str) -> bool {
        match self.repository.name_is_unique(name).await {
            Ok(unique) => unique,
            Err(e) => {
                warn!("Failed to check experiment name {}: {}", name, e);
                false
            }
        }
    }
}
