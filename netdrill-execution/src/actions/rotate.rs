//! `rotate`: move balance between keys through the rotation servers

use crate::action::{decode, until_cancelled, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use crate::node::TransferRequest;
use async_trait::async_trait;
use netdrill_core::params::RotateParams;
use netdrill_resilience::launch_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Transfers implied by a rotation, paired with the server sending each
pub fn transfers(params: &RotateParams, password: &str) -> Result<Vec<(String, TransferRequest)>, ActionError> {
    let n = params.pubkeys.len();
    if params.rest_servers.len() != n || params.mapping.len() != n {
        return Err(ActionError::InvalidInput(format!(
            "rotation lists differ in length: {} pubkeys, {} servers, {} mappings",
            n,
            params.rest_servers.len(),
            params.mapping.len()
        )));
    }

    params
        .mapping
        .iter()
        .enumerate()
        .filter(|(from, to)| *from != **to)
        .map(|(from, &to)| {
            let receiver = params.pubkeys.get(to).ok_or_else(|| {
                ActionError::InvalidInput(format!("mapping {} -> {} is out of range", from, to))
            })?;
            Ok((
                params.rest_servers[from].clone(),
                TransferRequest {
                    sender: params.pubkeys[from].clone(),
                    receiver: receiver.clone(),
                    ratio: params.ratio,
                    fee: params.fee,
                    password: password.to_string(),
                },
            ))
        })
        .collect()
}

pub struct RotateAction;

#[async_trait]
impl Action for RotateAction {
    fn name(&self) -> &'static str {
        "rotate"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        let params: RotateParams = decode(params)?;
        let password = if params.password_env.is_empty() {
            String::new()
        } else {
            std::env::var(&params.password_env).map_err(|_| {
                ActionError::InvalidInput(format!("password variable {} is not set", params.password_env))
            })?
        };
        let transfers = transfers(&params, &password)?;
        info!("Rotating balance of {} keys", transfers.len());

        launch_all(
            &ctx.token,
            transfers.iter().map(|(server, request)| {
                move |token: CancellationToken| async move {
                    until_cancelled(&token, ctx.node.transfer(server, request)).await
                }
            }),
        )
        .await?;
        Ok(())
    }
}
