//! Script execution engine
//!
//! Walks the script strictly in order. A step's outputs are committed to the
//! cache before the next entry is decoded, so later references always see
//! them. Consecutive commands of a batchable action are held back and run
//! together once a different command, a failed validation or the end of the
//! stream is reached.

use crate::action::{Action, ActionContext, ActionIO};
use crate::cache::{OutputCache, StepOutput};
use crate::error::{ActionError, EngineError};
use crate::registry::ActionRegistry;
use crate::resolve::resolve;
use crate::sink::{OutputSink, StdoutSink};
use async_trait::async_trait;
use netdrill_core::ScriptEntry;
use netdrill_storage::ExperimentStore;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Observer of engine progress
#[async_trait]
pub trait EngineListener: Send + Sync {
    async fn comment(&self, _text: &str) {}

    async fn step_started(&self, _action: &str, _step: usize) {}

    async fn batch_started(&self, _action: &str, _start: usize, _end: usize) {}

    async fn warning(&self, _message: &str) {}
}

/// Listener that ignores everything
pub struct NoopListener;

impl EngineListener for NoopListener {}

#[async_trait]
impl EngineListener for ExperimentStore {
    async fn comment(&self, text: &str) {
        self.append_log(text).await;
    }

    async fn step_started(&self, action: &str, step: usize) {
        self.update_current_step(action, step).await;
        self.append_log(format!("Performing step {} ({})", action, step))
            .await;
    }

    async fn batch_started(&self, action: &str, start: usize, end: usize) {
        self.update_current_step(action, start).await;
        self.append_log(format!("Performing steps {} ({}-{})", action, start, end))
            .await;
    }

    async fn warning(&self, message: &str) {
        self.append_warning(message).await;
    }
}

struct PendingBatch {
    action: Arc<dyn Action>,
    start: usize,
    batch: Vec<ActionIO>,
}

pub struct Engine {
    registry: Arc<ActionRegistry>,
    ctx: ActionContext,
    cache: Arc<OutputCache>,
    sink: Arc<dyn OutputSink>,
    listener: Arc<dyn EngineListener>,
}

impl Engine {
    pub fn new(registry: Arc<ActionRegistry>, ctx: ActionContext) -> Self {
        Self {
            registry,
            ctx,
            cache: Arc::new(OutputCache::new()),
            sink: Arc::new(StdoutSink),
            listener: Arc::new(NoopListener),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn EngineListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn cache(&self) -> &Arc<OutputCache> {
        &self.cache
    }

    /// Execute the script read from `reader`, returning the number of steps
    pub async fn run<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<usize, EngineError> {
        if self.ctx.config.daemon_executable().1 {
            let message = format!(
                "daemon_exec is not configured, using {} from PATH",
                self.ctx.daemon_exec
            );
            warn!("{}", message);
            self.listener.warning(&message).await;
        }

        let mut lines = reader.lines();
        let mut step = 0;
        let mut pending: Option<PendingBatch> = None;

        loop {
            if self.ctx.token.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let Some(line) = lines
                .next_line()
                .await
                .map_err(|source| EngineError::Io { step, source })?
            else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match ScriptEntry::from_line(&line)
                .map_err(|source| EngineError::Decode { step, source })?
            {
                ScriptEntry::Comment(text) => {
                    info!("{}", text);
                    self.listener.comment(&text).await;
                    continue;
                }
                ScriptEntry::Command(command) => command,
            };

            if pending
                .as_ref()
                .is_some_and(|p| p.action.name() != command.action)
            {
                self.flush(pending.take()).await?;
            }

            let params = resolve(&self.cache, step, &command.params)
                .map_err(|source| EngineError::Resolve { step, source })?;
            let action = self
                .registry
                .get(&command.action)
                .ok_or_else(|| EngineError::UnknownAction(command.action.clone()))?;
            let output = StepOutput::new(step, self.cache.clone(), self.sink.clone());

            if action.is_batch() {
                if let Err(source) = action.validate(&params) {
                    self.flush(pending.take()).await?;
                    return Err(EngineError::Validation {
                        action: command.action,
                        step,
                        source,
                    });
                }
                debug!("Queued step {} ({}) for a batch run", step, command.action);
                pending
                    .get_or_insert_with(|| PendingBatch {
                        action: action.clone(),
                        start: step,
                        batch: Vec::new(),
                    })
                    .batch
                    .push(ActionIO { params, output });
            } else {
                info!("Performing step {} ({})", command.action, step);
                self.listener.step_started(&command.action, step).await;
                action
                    .run(&self.ctx, params, &output)
                    .await
                    .map_err(|e| self.failure(step, step, e))?;
            }
            step += 1;
        }

        self.flush(pending.take()).await?;
        Ok(step)
    }

    async fn flush(&self, pending: Option<PendingBatch>) -> Result<(), EngineError> {
        let Some(PendingBatch { action, start, batch }) = pending else {
            return Ok(());
        };
        if batch.is_empty() {
            return Ok(());
        }
        let end = start + batch.len() - 1;
        info!("Performing steps {} ({}-{})", action.name(), start, end);
        self.listener.batch_started(action.name(), start, end).await;
        action
            .run_many(&self.ctx, batch)
            .await
            .map_err(|e| self.failure(start, end, e))
    }

    fn failure(&self, start: usize, end: usize, error: ActionError) -> EngineError {
        if self.ctx.token.is_cancelled() || matches!(error, ActionError::Cancelled) {
            return EngineError::Cancelled;
        }
        match error {
            ActionError::Output(e) => EngineError::Output(e),
            source => EngineError::StepFailed { start, end, source },
        }
    }
}
