//! Runs one script as a tracked experiment

use crate::action::ActionContext;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::node::NodeControl;
use crate::registry::ActionRegistry;
use crate::sink::{OutputSink, StdoutSink};
use netdrill_config::DaemonConfig;
use netdrill_storage::{ExperimentState, ExperimentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RunError {
    /// Process exit code for the failure
    pub fn code(&self) -> i32 {
        match self {
            RunError::Store(_) => 11,
            RunError::Engine(e) => e.code(),
        }
    }
}

/// Executes scripts under the lifecycle of an [`ExperimentStore`]
pub struct ExperimentRunner {
    store: Arc<ExperimentStore>,
    registry: Arc<ActionRegistry>,
    config: DaemonConfig,
    node: Arc<dyn NodeControl>,
    sink: Arc<dyn OutputSink>,
}

impl ExperimentRunner {
    pub fn new(store: Arc<ExperimentStore>, config: DaemonConfig, node: Arc<dyn NodeControl>) -> Self {
        Self {
            store,
            registry: Arc::new(ActionRegistry::with_builtin()),
            config,
            node,
            sink: Arc::new(StdoutSink),
        }
    }

    pub fn with_registry(mut self, registry: Arc<ActionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &Arc<ExperimentStore> {
        &self.store
    }

    /// Start `state` and execute `script` to completion
    ///
    /// Exactly one terminal transition is recorded once the store accepted
    /// the experiment.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, state: ExperimentState, script: R) -> Result<usize, RunError> {
        let name = state.name.clone();
        let token = CancellationToken::new();
        self.store.add(state, token.clone()).await?;

        let ctx = ActionContext::new(self.config.clone(), self.node.clone(), token.clone());
        let engine = Engine::new(self.registry.clone(), ctx)
            .with_sink(self.sink.clone())
            .with_listener(self.store.clone());

        match engine.run(script).await {
            Ok(steps) => {
                info!("Experiment {} finished after {} steps", name, steps);
                self.store.finish_with_success().await;
                Ok(steps)
            }
            Err(e) if e.is_cancelled() || token.is_cancelled() => {
                info!("Experiment {} cancelled", name);
                self.store.finish_cancelled().await;
                Err(EngineError::Cancelled.into())
            }
            Err(e) => {
                error!("Experiment {} failed: {}", name, e);
                self.store.finish_with_error(e.to_string()).await;
                Err(e.into())
            }
        }
    }
}
