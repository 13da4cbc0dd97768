//! `set-zkapp-soft-limit`: set or reset the per-block zkapp limit on nodes

use crate::action::{decode, until_cancelled, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::SoftLimitParams;
use netdrill_resilience::launch_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct SoftLimitAction;

#[async_trait]
impl Action for SoftLimitAction {
    fn name(&self) -> &'static str {
        "set-zkapp-soft-limit"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        let params: SoftLimitParams = decode(params)?;
        match params.limit {
            Some(limit) => info!("Setting zkapp soft limit to {} on {} nodes", limit, params.nodes.len()),
            None => info!("Resetting zkapp soft limit on {} nodes", params.nodes.len()),
        }

        let limit = params.limit;
        launch_all(
            &ctx.token,
            params.nodes.iter().map(|node| {
                move |token: CancellationToken| async move {
                    until_cancelled(&token, ctx.node.set_zkapp_soft_limit(node, limit)).await
                }
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{context, output, FakeNode};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_limit_set_on_every_node() {
        let node = Arc::new(FakeNode::default());
        let ctx = context(node.clone());
        let (out, _, _) = output(1);
        SoftLimitAction
            .run(&ctx, json!({"nodes": ["n1", "n2"], "limit": 4}), &out)
            .await
            .unwrap();
        assert_eq!(node.calls(), vec!["limit n1 Some(4)", "limit n2 Some(4)"]);
    }

    #[tokio::test]
    async fn test_missing_limit_resets() {
        let node = Arc::new(FakeNode::default());
        let ctx = context(node.clone());
        let (out, _, _) = output(1);
        SoftLimitAction
            .run(&ctx, json!({"nodes": ["n1"]}), &out)
            .await
            .unwrap();
        assert_eq!(node.calls(), vec!["limit n1 None"]);
    }

    #[tokio::test]
    async fn test_node_failure_fails_step() {
        let node = Arc::new(FakeNode {
            fail_on: Some("n2".to_string()),
            ..Default::default()
        });
        let ctx = context(node);
        let (out, _, _) = output(1);
        let err = SoftLimitAction
            .run(&ctx, json!({"nodes": ["n1", "n2"], "limit": null}), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Node(_)));
    }
}
