//! `discovery`: list the nodes currently online

use crate::action::{decode, until_cancelled, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::DiscoveryParams;
use serde_json::Value;
use tracing::info;

pub struct DiscoveryAction;

#[async_trait]
impl Action for DiscoveryAction {
    fn name(&self) -> &'static str {
        "discovery"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: DiscoveryParams = decode(params)?;
        let nodes = until_cancelled(&ctx.token, ctx.node.discover(&params)).await?;
        info!("Discovered {} participants", nodes.len());
        output.emit_all("participant", nodes.iter(), false)?;
        Ok(())
    }
}
