//! `payments` and `zkapp-txs`: schedule transaction traffic on nodes

use crate::action::{decode, until_cancelled, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::{PaymentsParams, ZkappsParams};
use netdrill_resilience::launch_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Share of the traffic assigned to one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeShare {
    pub node: String,
    pub tps: f64,
    pub fee_payers: Vec<String>,
}

/// Split `tps` over `nodes`
///
/// No node is asked for less than `min_tps` unless a single node is used.
/// Fee payers are dealt round-robin so no two nodes share one.
pub fn split_traffic(
    tps: f64,
    min_tps: f64,
    nodes: &[String],
    fee_payers: &[String],
) -> Result<Vec<NodeShare>, ActionError> {
    if nodes.is_empty() {
        return Err(ActionError::InvalidInput("no nodes to send traffic through".to_string()));
    }
    if fee_payers.is_empty() {
        return Err(ActionError::InvalidInput("no fee payers".to_string()));
    }

    let mut count = nodes.len().min(fee_payers.len());
    if min_tps > 0.0 {
        count = count.min((tps / min_tps).floor() as usize);
    }
    let count = count.max(1);

    let mut shares: Vec<NodeShare> = nodes[..count]
        .iter()
        .map(|node| NodeShare {
            node: node.clone(),
            tps: tps / count as f64,
            fee_payers: Vec::new(),
        })
        .collect();
    for (i, payer) in fee_payers.iter().enumerate() {
        shares[i % count].fee_payers.push(payer.clone());
    }
    Ok(shares)
}

pub struct PaymentsAction;

#[async_trait]
impl Action for PaymentsAction {
    fn name(&self) -> &'static str {
        "payments"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: PaymentsParams = decode(params)?;
        let shares = split_traffic(params.sub.tps, params.sub.min_tps, &params.nodes, &params.fee_payers)?;
        info!(
            "Scheduling {} payments tps over {} nodes for {} minutes",
            params.sub.tps,
            shares.len(),
            params.sub.duration_min
        );

        let base = &params.sub;
        let handles = launch_all(
            &ctx.token,
            shares.iter().map(|share| {
                move |token: CancellationToken| async move {
                    let mut sub = base.clone();
                    sub.tps = share.tps;
                    until_cancelled(
                        &token,
                        ctx.node.schedule_payments(&share.node, &sub, &share.fee_payers),
                    )
                    .await
                }
            }),
        )
        .await?;

        for (share, handle) in shares.iter().zip(&handles) {
            info!("Scheduled payments on {}: {}", share.node, handle);
            output.emit("participant", &share.node, true, false)?;
        }
        Ok(())
    }
}

pub struct ZkappsAction;

#[async_trait]
impl Action for ZkappsAction {
    fn name(&self) -> &'static str {
        "zkapp-txs"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: ZkappsParams = decode(params)?;
        let shares = split_traffic(params.sub.tps, params.sub.min_tps, &params.nodes, &params.fee_payers)?;
        info!(
            "Scheduling {} zkapp tps over {} nodes for {} minutes",
            params.sub.tps,
            shares.len(),
            params.sub.duration_min
        );

        let base = &params.sub;
        let handles = launch_all(
            &ctx.token,
            shares.iter().map(|share| {
                move |token: CancellationToken| async move {
                    let mut sub = base.clone();
                    sub.tps = share.tps;
                    until_cancelled(
                        &token,
                        ctx.node.schedule_zkapps(&share.node, &sub, &share.fee_payers),
                    )
                    .await
                }
            }),
        )
        .await?;

        for (share, handle) in shares.iter().zip(&handles) {
            info!("Scheduled zkapp transactions on {}: {}", share.node, handle);
            output.emit("participant", &share.node, true, false)?;
        }
        Ok(())
    }
}
