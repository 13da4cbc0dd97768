//! `stop-daemon` and `restart`: take nodes down, optionally wiping their state

use crate::action::{decode, until_cancelled, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::StopParams;
use netdrill_resilience::launch_all;
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct StopDaemonAction;

#[async_trait]
impl Action for StopDaemonAction {
    fn name(&self) -> &'static str {
        "stop-daemon"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        let params: StopParams = decode(params)?;
        info!("Stopping {} nodes (clean: {})", params.nodes.len(), params.clean);
        let clean = params.clean;
        launch_all(
            &ctx.token,
            params.nodes.iter().map(|node| {
                move |token: CancellationToken| async move {
                    until_cancelled(&token, ctx.node.stop_daemon(node, clean)).await
                }
            }),
        )
        .await?;
        Ok(())
    }
}

/// Control script sub-command for a restart
pub fn restart_command(clean: bool) -> &'static str {
    if clean {
        "restart-clean"
    } else {
        "restart"
    }
}

async fn run_control(exec: &str, node: &str, clean: bool, token: &CancellationToken) -> Result<(), ActionError> {
    let mut child = Command::new(exec)
        .arg(restart_command(clean))
        .arg(node)
        .kill_on_drop(true)
        .spawn()?;
    debug!("Started {} {} {}", exec, restart_command(clean), node);

    let status = tokio::select! {
        _ = token.cancelled() => {
            child.kill().await?;
            return Err(ActionError::Cancelled);
        }
        status = child.wait() => status?,
    };
    if !status.success() {
        return Err(ActionError::Process(format!(
            "{} {} {} exited with {}",
            exec,
            restart_command(clean),
            node,
            status
        )));
    }
    Ok(())
}

pub struct RestartAction;

#[async_trait]
impl Action for RestartAction {
    fn name(&self) -> &'static str {
        "restart"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        let params: StopParams = decode(params)?;
        let exec = ctx
            .config
            .control_exec
            .as_deref()
            .ok_or_else(|| ActionError::InvalidInput("control_exec is not configured".to_string()))?;
        info!("Restarting {} nodes (clean: {})", params.nodes.len(), params.clean);

        let clean = params.clean;
        launch_all(
            &ctx.token,
            params.nodes.iter().map(|node| {
                move |token: CancellationToken| async move { run_control(exec, node, clean, &token).await }
            }),
        )
        .await?;
        Ok(())
    }
}
