//! `wait`: cancellable pause

use crate::action::{decode, until_cancelled, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::WaitParams;
use serde_json::Value;
use tracing::info;

pub struct WaitAction;

#[async_trait]
impl Action for WaitAction {
    fn name(&self) -> &'static str {
        "wait"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        let params: WaitParams = decode(params)?;
        let duration = params.duration();
        info!("Waiting for {:?}", duration);
        until_cancelled(&ctx.token, async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}
