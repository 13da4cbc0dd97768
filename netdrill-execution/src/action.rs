//! Action trait and the context every action runs with

use crate::cache::StepOutput;
use crate::error::ActionError;
use crate::node::NodeControl;
use async_trait::async_trait;
use netdrill_config::DaemonConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared execution context handed to every run
#[derive(Clone)]
pub struct ActionContext {
    pub config: DaemonConfig,
    /// Resolved daemon executable
    pub daemon_exec: String,
    pub node: Arc<dyn NodeControl>,
    pub token: CancellationToken,
}

impl ActionContext {
    pub fn new(config: DaemonConfig, node: Arc<dyn NodeControl>, token: CancellationToken) -> Self {
        let daemon_exec = config.daemon_executable().0.to_string();
        Self {
            config,
            daemon_exec,
            node,
            token,
        }
    }
}

/// A resolved payload paired with the output handle of its step
pub struct ActionIO {
    pub params: Value,
    pub output: StepOutput,
}

/// An action the engine can dispatch a command to
#[async_trait]
pub trait Action: Send + Sync {
    /// Tag the action is registered under
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError>;

    /// Whether consecutive commands of this action are collected and handed
    /// to [`Action::run_many`] together
    fn is_batch(&self) -> bool {
        false
    }

    /// Pre-flight check run before a command joins a batch
    fn validate(&self, _params: &Value) -> Result<(), ActionError> {
        Ok(())
    }

    async fn run_many(&self, ctx: &ActionContext, batch: Vec<ActionIO>) -> Result<(), ActionError> {
        for io in batch {
            self.run(ctx, io.params, &io.output).await?;
        }
        Ok(())
    }
}

/// Decode a resolved payload into the action's parameter type
pub fn decode<T: DeserializeOwned>(params: Value) -> Result<T, ActionError> {
    Ok(serde_json::from_value(params)?)
}

/// Drive `fut` until it finishes or `token` fires
pub async fn until_cancelled<F, T>(token: &CancellationToken, fut: F) -> Result<T, ActionError>
where
    F: Future<Output = Result<T, ActionError>>,
{
    tokio::select! {
        _ = token.cancelled() => Err(ActionError::Cancelled),
        result = fut => result,
    }
}
