//! Round generation
//!
//! A round is a self-contained chain of commands. References inside a round
//! only point at earlier commands of the same round, so rounds can be
//! concatenated freely by the encoder.

use crate::error::GenerateError;
use crate::format::format_duration;
use crate::params::GenParams;
use crate::requirements::{payment_keygen_requirements, zkapp_keygen_requirements};
use crate::sampling::{sample_stop_ratio, sample_tps};
use log::debug;
use netdrill_core::params::{
    DiscoveryParams, FundParams, KeyloaderParams, PaymentSubParams, RotateParams, WaitParams,
    ZkappSubParams,
};
use netdrill_core::{ActionTag, Command, Reference};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

/// Ratios at or below this are treated as zero
const RATIO_EPSILON: f64 = 1e-6;

/// Zkapp ratios this close to 0 or 1 send a single transaction type
const ZKAPP_RATIO_EPSILON: f64 = 1e-3;

/// Zkapps deployed in a max-cost round
const MAX_COST_ZKAPPS_TO_DEPLOY: u32 = 8;

/// Commands of one round plus the key pools they send from
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRound {
    pub commands: Vec<Command>,
    pub payment_fund: Option<FundParams>,
    pub zkapp_fund: Option<FundParams>,
}

/// Output `name` of the command at `index` within the round
#[derive(Debug, Clone, Copy)]
struct Output {
    index: usize,
    name: &'static str,
}

#[derive(Default)]
struct RoundBuilder {
    commands: Vec<Command>,
}

impl RoundBuilder {
    fn push(&mut self, command: Command) -> usize {
        self.commands.push(command);
        self.commands.len() - 1
    }

    /// Reference from the next command to `output`
    fn reference(&self, output: Output) -> Reference {
        Reference::output(output.index as i64 - self.commands.len() as i64, output.name)
    }

    /// Same as [`reference`](Self::reference), substituting `[]` when missing
    fn reference_or_empty(&self, output: Output) -> Value {
        self.reference(output).or_else(json!([])).to_value()
    }
}

fn payload<T: Serialize>(params: &T) -> Result<Value, GenerateError> {
    Ok(serde_json::to_value(params)?)
}

/// Serialize `params` and set each `(field, value)` pair on top of it
fn payload_with<T: Serialize>(params: &T, fields: Vec<(&str, Value)>) -> Result<Value, GenerateError> {
    let mut value = payload(params)?;
    if let Value::Object(ref mut map) = value {
        for (field, field_value) in fields {
            map.insert(field.to_string(), field_value);
        }
    }
    Ok(value)
}

fn discovery(params: DiscoveryParams) -> Result<Command, GenerateError> {
    Ok(Command::new(ActionTag::Discovery, payload(&params)?))
}

fn wait(params: WaitParams) -> Result<Command, GenerateError> {
    Ok(Command::new(ActionTag::Wait, payload(&params)?))
}

fn load_keys(dir: &str) -> Result<Command, GenerateError> {
    let params = KeyloaderParams {
        dir: dir.to_string(),
    };
    Ok(Command::new(ActionTag::LoadKeys, payload(&params)?))
}

/// Soft limit command applied to the nodes of `nodes`
pub(crate) fn soft_limit(nodes: Value, limit: Option<i64>) -> Command {
    let comment = match limit {
        Some(limit) => format!("Setting zkapp soft limit to {}", limit),
        None => "Resetting zkapp soft limit".to_string(),
    };
    Command::new(
        ActionTag::SetZkappSoftLimit,
        json!({ "nodes": nodes, "limit": limit }),
    )
    .with_comment(comment)
}

fn sample(group: Value, ratios: &[f64]) -> Command {
    Command::new(ActionTag::Sample, json!({ "group": group, "ratios": ratios }))
}

fn scheduling_comment(kind: &str, tps: f64, duration_min: u64) -> String {
    format!(
        "Scheduling {} {} to be sent over period of {} minutes ({:.2} txs/min)",
        (tps * duration_min as f64 * 60.0) as u64,
        kind,
        duration_min,
        tps * 60.0
    )
}

fn rotation_mapping<R: Rng + ?Sized>(params: &GenParams, rng: &mut R) -> Vec<usize> {
    let count = params.rotation_keys.len();
    if params.rotation_permutation {
        let mut mapping: Vec<usize> = (0..count).collect();
        mapping.shuffle(rng);
        mapping
    } else {
        (0..count).map(|_| rng.gen_range(0..count)).collect()
    }
}

/// Generate the commands of round `round` and the key pools it needs
pub fn generate<R: Rng + ?Sized>(
    params: &GenParams,
    round: u64,
    rng: &mut R,
) -> Result<GeneratedRound, GenerateError> {
    let keys_dir = params.experiment_keys_dir();
    let zkapps_keys_dir = format!("{}/round-{}/zkapps", keys_dir, round);
    let payments_keys_dir = format!("{}/round-{}/payments", keys_dir, round);

    let mut tps = sample_tps(params.base_tps, params.stress_tps, rng);
    let mut max_cost = params.max_cost;
    let mut zkapp_ratio = params.zkapp_ratio;
    if params.mix_max_cost_tps_ratio > ZKAPP_RATIO_EPSILON && round % 2 == 1 {
        max_cost = true;
        zkapp_ratio = 1.0;
        tps *= params.mix_max_cost_tps_ratio;
    }

    let only_zkapps = (1.0 - zkapp_ratio).abs() < ZKAPP_RATIO_EPSILON;
    let only_payments = zkapp_ratio < ZKAPP_RATIO_EPSILON;
    let zkapp_tps = tps * zkapp_ratio;
    let experiment_name = format!("{}-{}", params.experiment_name, round);

    let mut zkapp_params = ZkappSubParams {
        experiment_name: experiment_name.clone(),
        tps: zkapp_tps,
        min_tps: params.min_tps,
        duration_min: params.round_duration_min,
        gap: params.gap,
        min_balance_change: params.min_balance_change,
        max_balance_change: params.max_balance_change,
        min_fee: params.min_zkapp_fee,
        max_fee: params.max_zkapp_fee,
        deployment_fee: params.deployment_fee,
        max_cost,
        zkapps_to_deploy: 0,
        new_account_ratio: params.new_account_ratio,
    };
    if max_cost {
        zkapp_params.zkapps_to_deploy = MAX_COST_ZKAPPS_TO_DEPLOY;
        zkapp_params.new_account_ratio = 0.0;
    }
    let payment_params = PaymentSubParams {
        experiment_name,
        tps: tps - zkapp_tps,
        min_tps: params.min_tps,
        duration_min: params.round_duration_min,
        min_fee: params.min_payment_fee,
        max_fee: params.max_payment_fee,
        amount: params.payment_amount,
        receiver: params.payment_receiver.clone(),
    };

    debug!(
        "Round {}: tps {:.4}, zkapp share {:.4}, max-cost {}",
        round, tps, zkapp_tps, max_cost
    );

    let large_pauses_before = round
        .checked_div(params.large_pause_every_n_rounds)
        .unwrap_or(0);
    let round_start_min = round
        .saturating_mul(params.round_duration_min.saturating_add(params.pause_min))
        .saturating_add(large_pauses_before.saturating_mul(params.large_pause_min));

    let mut b = RoundBuilder::default();

    if !params.rotation_keys.is_empty() {
        let rotate = RotateParams {
            pubkeys: params.rotation_keys.clone(),
            rest_servers: params.rotation_servers.clone(),
            mapping: rotation_mapping(params, rng),
            ratio: params.rotation_ratio,
            fee: params.fund_fee,
            password_env: params.password_env.clone(),
        };
        b.push(Command::new(ActionTag::Rotate, payload(&rotate)?));
    }

    let start_message = format!(
        "Starting round {}, {} after start",
        round,
        format_duration(round_start_min, 0)
    );
    let discovered = b.push(
        discovery(DiscoveryParams {
            only_block_producers: false,
            no_block_producers: params.send_from_non_bps_only,
        })?
        .with_comment(start_message),
    );
    let mut participants = Output {
        index: discovered,
        name: "participant",
    };

    if params.sets_soft_limit() {
        let mut limited = participants;
        if params.send_from_non_bps_only {
            // Senders exclude block producers but the limit applies to every node
            limited.index = b.push(discovery(DiscoveryParams::default())?);
        }
        let nodes = b.reference_or_empty(limited);
        b.push(soft_limit(nodes, params.soft_limit_value()));
    }

    if 1.0 - params.sender_ratio > RATIO_EPSILON {
        let group = b.reference_or_empty(participants);
        let index = b.push(sample(group, &[params.sender_ratio]));
        participants = Output {
            index,
            name: "group1",
        };
    }

    let senders = if only_payments {
        let keys = b.push(load_keys(&payments_keys_dir)?);
        let cmd = payments_command(&b, keys, participants, &payment_params)?;
        Output {
            index: b.push(cmd),
            name: "participant",
        }
    } else if only_zkapps {
        let keys = b.push(load_keys(&zkapps_keys_dir)?);
        let cmd = zkapps_command(&b, keys, participants, &zkapp_params)?;
        Output {
            index: b.push(cmd),
            name: "participant",
        }
    } else {
        let zkapp_keys = b.push(load_keys(&zkapps_keys_dir)?);
        let payment_keys = b.push(load_keys(&payments_keys_dir)?);
        let cmd = zkapps_command(&b, zkapp_keys, participants, &zkapp_params)?;
        let zkapps = b.push(cmd);
        let cmd = payments_command(&b, payment_keys, participants, &payment_params)?;
        let payments = b.push(cmd);
        let join = json!({
            "group1": b.reference(Output { index: payments, name: "participant" }).to_value(),
            "group2": b.reference(Output { index: zkapps, name: "participant" }).to_value(),
        });
        Output {
            index: b.push(Command::new(ActionTag::Join, join)),
            name: "group",
        }
    };

    let round_secs = params.round_duration_min.saturating_mul(60);
    let mut stop_waits: Vec<u64> = (0..params.stops_per_round)
        .map(|_| if round_secs > 0 { rng.gen_range(0..round_secs) } else { 0 })
        .collect();
    stop_waits.sort_unstable();
    for i in (1..stop_waits.len()).rev() {
        stop_waits[i] -= stop_waits[i - 1];
    }

    let targets = if params.stop_only_bps {
        "block producers"
    } else {
        "nodes"
    };
    let mut elapsed = 0u64;
    for wait_secs in stop_waits {
        let comment = format!(
            "Running round {}, {} after start, waiting for {}",
            round,
            format_duration(round_start_min, elapsed),
            format_duration(0, wait_secs)
        );
        b.push(wait(WaitParams::seconds(wait_secs))?.with_comment(comment));

        let online = b.push(discovery(DiscoveryParams {
            only_block_producers: params.stop_only_bps,
            no_block_producers: false,
        })?);
        let except = json!({
            "group": b.reference_or_empty(Output { index: online, name: "participant" }),
            "except": b.reference_or_empty(senders),
        });
        let candidates = Output {
            index: b.push(Command::new(ActionTag::Except, except)),
            name: "group",
        };

        let stop_ratio = sample_stop_ratio(params.min_stop_ratio, params.max_stop_ratio, rng);
        let clean_ratio = params.stop_clean_ratio * stop_ratio;
        let no_clean_ratio = (1.0 - params.stop_clean_ratio) * stop_ratio;
        let fractions: Vec<(f64, bool)> = [(clean_ratio, true), (no_clean_ratio, false)]
            .into_iter()
            .filter(|(ratio, _)| *ratio > RATIO_EPSILON)
            .collect();

        if !fractions.is_empty() {
            let ratios: Vec<f64> = fractions.iter().map(|(ratio, _)| *ratio).collect();
            let group = b.reference_or_empty(candidates);
            let sampled = b.push(sample(group, &ratios));
            for (position, (ratio, clean)) in fractions.into_iter().enumerate() {
                let comment = format!(
                    "Stopping {:.1}% {} {} cleaning",
                    ratio * 100.0,
                    targets,
                    if clean { "with" } else { "without" }
                );
                let nodes = b.reference(Output {
                    index: sampled,
                    name: GROUP_NAMES[position],
                });
                b.push(stop_command(params.use_restart_script, nodes, clean).with_comment(comment));
            }
        }
        elapsed += wait_secs;
    }

    if round + 1 < params.rounds {
        let comment = format!(
            "Waiting for remainder of round {}, {} after start",
            round,
            format_duration(round_start_min, elapsed)
        );
        b.push(wait(WaitParams::seconds(round_secs.saturating_sub(elapsed)))?.with_comment(comment));

        if params.pause_min > 0 {
            let comment = format!(
                "Pause after round {}, {} after start",
                round,
                format_duration(round_start_min + params.round_duration_min, 0)
            );
            b.push(wait(WaitParams::minutes(params.pause_min))?.with_comment(comment));
        }

        let large_pause_due = (round + 1)
            .checked_rem(params.large_pause_every_n_rounds)
            .is_some_and(|rem| rem == 0);
        if params.large_pause_min > 0 && large_pause_due {
            let comment = format!(
                "Large pause after round {}, {} after start",
                round,
                format_duration(
                    round_start_min + params.round_duration_min + params.pause_min,
                    0
                )
            );
            b.push(wait(WaitParams::minutes(params.large_pause_min))?.with_comment(comment));
        }
    }

    let zkapp_fund = (!only_payments).then(|| {
        let req = zkapp_keygen_requirements(zkapp_tps, &zkapp_params);
        FundParams {
            amount: req.amount,
            fee: params.fund_fee,
            prefix: format!("{}/key", zkapps_keys_dir),
            num: req.keys,
            privkeys: Vec::new(),
            password_env: params.password_env.clone(),
        }
    });
    let payment_fund = (!only_zkapps).then(|| {
        let req = payment_keygen_requirements(payment_params.tps, params.gap, &payment_params);
        FundParams {
            amount: req.amount,
            fee: params.fund_fee,
            prefix: format!("{}/key", payments_keys_dir),
            num: req.keys,
            privkeys: Vec::new(),
            password_env: params.password_env.clone(),
        }
    });

    Ok(GeneratedRound {
        commands: b.commands,
        payment_fund,
        zkapp_fund,
    })
}

const GROUP_NAMES: [&str; 2] = ["group1", "group2"];

fn payments_command(
    b: &RoundBuilder,
    keys: usize,
    nodes: Output,
    params: &PaymentSubParams,
) -> Result<Command, GenerateError> {
    let value = payload_with(
        params,
        vec![
            ("feePayers", b.reference(Output { index: keys, name: "key" }).to_value()),
            ("nodes", b.reference(nodes).to_value()),
        ],
    )?;
    Ok(Command::new(ActionTag::Payments, value).with_comment(scheduling_comment(
        "payments",
        params.tps,
        params.duration_min,
    )))
}

fn zkapps_command(
    b: &RoundBuilder,
    keys: usize,
    nodes: Output,
    params: &ZkappSubParams,
) -> Result<Command, GenerateError> {
    let value = payload_with(
        params,
        vec![
            ("feePayers", b.reference(Output { index: keys, name: "key" }).to_value()),
            ("nodes", b.reference(nodes).to_value()),
        ],
    )?;
    let kind = if params.max_cost {
        "max-cost zkapp transactions"
    } else {
        "zkapp transactions"
    };
    Ok(Command::new(ActionTag::ZkappTxs, value).with_comment(scheduling_comment(
        kind,
        params.tps,
        params.duration_min,
    )))
}

fn stop_command(use_restart_script: bool, nodes: Reference, clean: bool) -> Command {
    let tag = if use_restart_script {
        ActionTag::Restart
    } else {
        ActionTag::StopDaemon
    };
    let mut params = json!({ "nodes": nodes.to_value() });
    if clean {
        params["clean"] = Value::Bool(true);
    }
    Command::new(tag, params)
}
