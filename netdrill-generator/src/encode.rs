//! Script encoding
//!
//! Sequences every round into one script. The order is fixed: invocation
//! comment, optional soft limit, bootstrap funding, pool funding, then the
//! rounds. Round commands reference each other relatively, so nothing may be
//! inserted between them.

use crate::error::GenerateError;
use crate::params::GenParams;
use crate::round::{generate, soft_limit};
use log::info;
use netdrill_core::params::{DiscoveryParams, FundParams, WaitParams};
use netdrill_core::{ActionTag, Command, Reference, ScriptEntry};
use rand::Rng;
use std::io::Write;

/// Fixed headroom added to the bootstrap funding amount
const BOOTSTRAP_BUFFER: u64 = 2_000_000_000;

/// Destination of an encoded script
pub trait ScriptWriter {
    fn comment(&mut self, comment: &str) -> Result<(), GenerateError>;

    fn command(&mut self, command: &Command) -> Result<(), GenerateError>;

    /// Write a command, preceded by its comment if it has one
    fn entry(&mut self, command: &Command) -> Result<(), GenerateError> {
        if let Some(comment) = &command.comment {
            self.comment(comment)?;
        }
        self.command(command)
    }
}

/// Writes newline-delimited JSON
pub struct JsonLinesWriter<W: Write> {
    inner: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn line(&mut self, entry: &ScriptEntry) -> Result<(), GenerateError> {
        serde_json::to_writer(&mut self.inner, entry)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> ScriptWriter for JsonLinesWriter<W> {
    fn comment(&mut self, comment: &str) -> Result<(), GenerateError> {
        self.line(&ScriptEntry::Comment(comment.to_string()))
    }

    fn command(&mut self, command: &Command) -> Result<(), GenerateError> {
        self.line(&ScriptEntry::Command(command.clone()))
    }
}

/// Keeps the encoded script in memory
#[derive(Debug, Default, Clone)]
pub struct ScriptBuffer {
    pub entries: Vec<ScriptEntry>,
}

impl ScriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands only, in script order
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.entries.iter().filter_map(|entry| match entry {
            ScriptEntry::Command(command) => Some(command),
            ScriptEntry::Comment(_) => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ScriptEntry::Comment(comment) => Some(comment.as_str()),
            ScriptEntry::Command(_) => None,
        })
    }
}

impl ScriptWriter for ScriptBuffer {
    fn comment(&mut self, comment: &str) -> Result<(), GenerateError> {
        self.entries.push(ScriptEntry::Comment(comment.to_string()));
        Ok(())
    }

    fn command(&mut self, command: &Command) -> Result<(), GenerateError> {
        // The comment was already pushed as its own entry
        self.entries.push(ScriptEntry::Command(Command {
            comment: None,
            ..command.clone()
        }));
        Ok(())
    }
}

fn fund_command(params: &FundParams) -> Result<Command, GenerateError> {
    Ok(Command::new(ActionTag::FundKeys, serde_json::to_value(params)?))
}

/// Largest amount a generated funding key has to hand out
///
/// Pools are spread round-robin over the generated keys, `per_cmd` keys per
/// pool. Amounts use floor division throughout.
fn max_bucket_amount(funds: &[FundParams], generated: u64, per_cmd: u64) -> u64 {
    let mut buckets = vec![0u64; generated as usize];
    for (i, fund) in funds.iter().enumerate() {
        if fund.num == 0 {
            continue;
        }
        let start = (i as u64 * per_cmd) % generated;
        let items_per_key = fund.num / per_cmd + 1;
        let per_generated_key = (fund.amount / fund.num).saturating_mul(items_per_key);
        for j in start..start + per_cmd {
            let bucket = &mut buckets[(j % generated) as usize];
            *bucket = bucket.saturating_add(per_generated_key);
        }
    }
    buckets.into_iter().max().unwrap_or(0)
}

/// Encode the whole experiment into `writer`
pub fn encode<R, W>(params: &GenParams, rng: &mut R, writer: &mut W) -> Result<(), GenerateError>
where
    R: Rng + ?Sized,
    W: ScriptWriter + ?Sized,
{
    writer.comment(&format!("Generated with: {}", serde_json::to_string(params)?))?;

    if params.sets_soft_limit() {
        writer.entry(&Command::new(
            ActionTag::Discovery,
            serde_json::to_value(DiscoveryParams::default())?,
        ))?;
        let nodes = Reference::output(-1, "participant").to_value();
        writer.entry(&soft_limit(nodes, params.soft_limit_value()))?;
    }

    writer.comment("Funding keys for the experiment")?;

    let mut commands = Vec::new();
    let mut funds = Vec::new();
    for round in 0..params.rounds {
        let generated = generate(params, round, rng)?;
        commands.extend(generated.commands);
        funds.extend(generated.payment_fund);
        funds.extend(generated.zkapp_fund);
    }

    let per_cmd = params.privkeys_per_fund_cmd.max(1);
    let mut privkeys = params.privkeys.clone();
    if params.generate_fund_keys > 0 {
        let generated = params.generate_fund_keys;
        let keys_dir = params.experiment_keys_dir();
        privkeys = (0..generated)
            .map(|i| format!("{}/key-0-{}", keys_dir, i))
            .collect();
        let per_key = max_bucket_amount(&funds, generated, per_cmd);
        let bootstrap = FundParams {
            amount: per_key
                .saturating_mul(generated)
                .saturating_mul(3)
                / 2
                + BOOTSTRAP_BUFFER,
            fee: params.fund_fee,
            prefix: format!("{}/key", keys_dir),
            num: generated,
            privkeys: params.privkeys.clone(),
            password_env: params.password_env.clone(),
        };
        writer.entry(&fund_command(&bootstrap)?)?;
        writer.entry(&Command::new(
            ActionTag::Wait,
            serde_json::to_value(WaitParams::seconds(1))?,
        ))?;
    }

    for (i, mut fund) in funds.into_iter().enumerate() {
        if !privkeys.is_empty() {
            let start = (i * per_cmd as usize) % privkeys.len();
            fund.privkeys = privkeys
                .iter()
                .cycle()
                .skip(start)
                .take(per_cmd as usize)
                .cloned()
                .collect();
        }
        writer.entry(&fund_command(&fund)?)?;
    }

    info!(
        "Encoded {} rounds ({} round commands) for experiment {}",
        params.rounds,
        commands.len(),
        params.experiment_name
    );
    for command in &commands {
        writer.entry(command)?;
    }
    Ok(())
}
