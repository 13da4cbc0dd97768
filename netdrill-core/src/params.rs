//! Parameter payloads for each action
//!
//! These are the *resolved* shapes: by the time an action decodes its
//! payload every output reference has been substituted with a literal.
//! All payloads use camelCase field names on the wire.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of `discovery`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryParams {
    /// Only return nodes that produce blocks
    pub only_block_producers: bool,
    /// Exclude nodes that produce blocks
    pub no_block_producers: bool,
}

/// Parameters of `set-zkapp-soft-limit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftLimitParams {
    pub nodes: Vec<String>,
    /// `None` resets the limit on each node
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Parameters of `sample`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleParams {
    pub group: Vec<String>,
    /// One ratio per disjoint output group (`group1`, `group2`, ...)
    pub ratios: Vec<f64>,
}

/// Parameters of `except`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptParams {
    pub group: Vec<String>,
    #[serde(default)]
    pub except: Vec<String>,
}

/// Parameters of `join`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    #[serde(default)]
    pub group1: Vec<String>,
    #[serde(default)]
    pub group2: Vec<String>,
}

/// Parameters of `load-keys`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyloaderParams {
    pub dir: String,
}

/// Payment traffic shape, shared by the generator and the `payments` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubParams {
    pub experiment_name: String,
    pub tps: f64,
    /// Lowest rate a single node is asked to sustain
    #[serde(default)]
    pub min_tps: f64,
    pub duration_min: u64,
    pub min_fee: u64,
    pub max_fee: u64,
    pub amount: u64,
    pub receiver: String,
}

/// Parameters of `payments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsParams {
    #[serde(flatten)]
    pub sub: PaymentSubParams,
    pub fee_payers: Vec<String>,
    pub nodes: Vec<String>,
}

/// Zkapp traffic shape, shared by the generator and the `zkapp-txs` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkappSubParams {
    pub experiment_name: String,
    pub tps: f64,
    #[serde(default)]
    pub min_tps: f64,
    pub duration_min: u64,
    /// Seconds between two dependent transactions of one key
    pub gap: u64,
    pub min_balance_change: u64,
    pub max_balance_change: u64,
    pub min_fee: u64,
    pub max_fee: u64,
    pub deployment_fee: u64,
    pub max_cost: bool,
    pub zkapps_to_deploy: u32,
    pub new_account_ratio: f64,
}

/// Parameters of `zkapp-txs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkappsParams {
    #[serde(flatten)]
    pub sub: ZkappSubParams,
    pub fee_payers: Vec<String>,
    pub nodes: Vec<String>,
}

/// Parameters of `stop-daemon` and `restart`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopParams {
    pub nodes: Vec<String>,
    /// Wipe the node state before it comes back
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clean: bool,
}

/// Parameters of `rotate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateParams {
    pub pubkeys: Vec<String>,
    pub rest_servers: Vec<String>,
    /// Key `i` sends to key `mapping[i]`
    pub mapping: Vec<usize>,
    pub ratio: f64,
    pub fee: u64,
    pub password_env: String,
}

/// Parameters of `wait`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitParams {
    pub minutes: u64,
    pub seconds: u64,
}

impl WaitParams {
    pub fn minutes(minutes: u64) -> Self {
        Self { minutes, seconds: 0 }
    }

    pub fn seconds(seconds: u64) -> Self {
        Self { minutes: 0, seconds }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.minutes.saturating_mul(60).saturating_add(self.seconds))
    }
}

/// Parameters of `fund-keys`: create `num` funded accounts under `prefix`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundParams {
    /// Total amount spread over all created accounts
    pub amount: u64,
    pub fee: u64,
    pub prefix: String,
    pub num: u64,
    /// Paths of the private keys paying for the accounts
    pub privkeys: Vec<String>,
    /// Environment variable holding the key password
    #[serde(default)]
    pub password_env: String,
}
