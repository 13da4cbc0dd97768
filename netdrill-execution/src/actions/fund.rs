//! `fund-keys`: create and fund accounts through the daemon CLI
//!
//! Each request spawns one `advanced itn-create-accounts` process per paying
//! private key. Batches run request waves concurrently, never letting two
//! requests that share a private key run at the same time, and every request
//! is retried across the configured funding daemon ports.

use crate::action::{decode, Action, ActionContext, ActionIO};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::FundParams;
use netdrill_resilience::{launch_all, partition_waves, EndpointRotation};
use serde_json::Value;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Variable the daemon CLI reads the key password from
pub const PASSWORD_VAR: &str = "MINA_PRIVKEY_PASS";

/// Accounts created by each paying key; the remainder goes to the first keys
pub fn split_accounts(num: u64, keys: usize) -> Vec<u64> {
    if keys == 0 {
        return Vec::new();
    }
    let keys = keys as u64;
    (0..keys)
        .map(|i| num / keys + u64::from(i < num % keys))
        .collect()
}

/// Arguments of the process funding through key `index`
pub fn fund_args(
    params: &FundParams,
    index: usize,
    accounts: u64,
    amount_per_account: u64,
    port: Option<&str>,
) -> Vec<String> {
    let mut args = vec![
        "advanced".to_string(),
        "itn-create-accounts".to_string(),
        "--amount".to_string(),
        amount_per_account.saturating_mul(accounts).to_string(),
        "--fee".to_string(),
        params.fee.to_string(),
        "--key-prefix".to_string(),
        format!("{}-{}", params.prefix, index),
        "--num-accounts".to_string(),
        accounts.to_string(),
        "--privkey-path".to_string(),
        params.privkeys[index].clone(),
    ];
    if let Some(port) = port {
        args.push("--daemon-port".to_string());
        args.push(port.to_string());
    }
    args
}

fn check(params: &FundParams) -> Result<(), ActionError> {
    if params.num == 0 {
        return Err(ActionError::InvalidInput(format!(
            "no accounts to create under {}",
            params.prefix
        )));
    }
    if params.privkeys.is_empty() {
        return Err(ActionError::InvalidInput(format!(
            "no private keys to fund {} from",
            params.prefix
        )));
    }
    Ok(())
}

/// Daemon CLI invocation with only the search path and the key password set
///
/// `exec` is looked up in `search_path`, which is also the child's `PATH`.
fn daemon_command(exec: &str, args: &[String], password: &str, search_path: Option<&OsStr>) -> Command {
    let mut command = Command::new(exec);
    command.args(args).env_clear();
    if let Some(path) = search_path {
        command.env("PATH", path);
    }
    command
        .env(PASSWORD_VAR, password)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

async fn run_process(exec: &str, args: Vec<String>, password: &str, token: &CancellationToken) -> Result<(), ActionError> {
    let search_path = std::env::var_os("PATH");
    let child = daemon_command(exec, &args, password, search_path.as_deref()).spawn()?;

    let output = tokio::select! {
        _ = token.cancelled() => return Err(ActionError::Cancelled),
        output = child.wait_with_output() => output?,
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!("{} {} finished: {}", exec, args.join(" "), stderr.trim());
    if !output.status.success() {
        return Err(ActionError::Process(format!(
            "{} exited with {}: {}",
            exec,
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Run every per-key process of one request through `port`
async fn fund_via(
    ctx: &ActionContext,
    params: &FundParams,
    password: &str,
    port: Option<String>,
    token: &CancellationToken,
) -> Result<(), ActionError> {
    let amount_per_account = params.amount / params.num;
    let accounts = split_accounts(params.num, params.privkeys.len());
    let exec = ctx.daemon_exec.as_str();
    let port = port.as_deref();

    launch_all(
        token,
        accounts
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(index, n)| {
                let args = fund_args(params, index, *n, amount_per_account, port);
                move |token: CancellationToken| async move { run_process(exec, args, password, &token).await }
            }),
    )
    .await?;
    Ok(())
}

/// Fund one request, rotating over the funding ports from `base`
async fn fund(
    ctx: &ActionContext,
    params: &FundParams,
    base: usize,
    token: &CancellationToken,
) -> Result<(), ActionError> {
    check(params)?;
    let password = if params.password_env.is_empty() {
        String::new()
    } else {
        std::env::var(&params.password_env).unwrap_or_else(|_| {
            warn!("Password variable {} is not set", params.password_env);
            String::new()
        })
    };

    info!(
        "Funding {} accounts under {} from {} keys",
        params.num,
        params.prefix,
        params.privkeys.len()
    );
    let rotation = EndpointRotation::new(ctx.config.fund_daemon_ports.clone());
    rotation
        .execute(base, |port| fund_via(ctx, params, &password, port.cloned(), token))
        .await
}

pub struct FundAction;

#[async_trait]
impl Action for FundAction {
    fn name(&self) -> &'static str {
        "fund-keys"
    }

    async fn run(&self, ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        let params: FundParams = decode(params)?;
        fund(ctx, &params, 0, &ctx.token).await
    }

    fn is_batch(&self) -> bool {
        true
    }

    /// Reject funding into a key directory that already holds files
    fn validate(&self, params: &Value) -> Result<(), ActionError> {
        let params: FundParams = serde_json::from_value(params.clone())?;
        let Some(dir) = Path::new(&params.prefix).parent() else {
            return Ok(());
        };
        let populated = std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if populated {
            return Err(ActionError::InvalidInput(format!(
                "path '{}' already exists, re-generate the script with a unique experiment name or another fund keys directory",
                dir.display()
            )));
        }
        Ok(())
    }

    async fn run_many(&self, ctx: &ActionContext, batch: Vec<ActionIO>) -> Result<(), ActionError> {
        let requests = batch
            .into_iter()
            .map(|io| decode::<FundParams>(io.params))
            .collect::<Result<Vec<_>, _>>()?;
        let key_sets: Vec<&[String]> = requests.iter().map(|r| r.privkeys.as_slice()).collect();
        let ports = ctx.config.fund_daemon_ports.len().max(1);

        for wave in partition_waves(&key_sets) {
            let base = wave.start % ports;
            debug!("Funding wave {}-{} from port index {}", wave.start, wave.end, base);
            launch_all(
                &ctx.token,
                requests[wave].iter().map(|request| {
                    move |token: CancellationToken| async move { fund(ctx, request, base, &token).await }
                }),
            )
            .await?;
        }
        Ok(())
    }
}
