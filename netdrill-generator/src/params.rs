//! Experiment parameters and their defaults

use serde::{Deserialize, Serialize};

/// Experiment-wide generation parameters
///
/// Built once from user input merged over [`GenParams::default`] and read-only
/// while generating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenParams {
    /// Lowest rate a single node is asked to sustain
    pub min_tps: f64,
    /// Network-wide rate around which rounds are sampled
    pub base_tps: f64,
    /// Two standard deviations above `base_tps`
    pub stress_tps: f64,
    pub sender_ratio: f64,
    pub zkapp_ratio: f64,
    pub new_account_ratio: f64,
    pub stop_clean_ratio: f64,
    pub min_stop_ratio: f64,
    pub max_stop_ratio: f64,

    pub round_duration_min: u64,
    pub pause_min: u64,
    pub rounds: u64,
    pub stops_per_round: u64,
    /// Seconds between two dependent transactions of one key
    pub gap: u64,

    pub send_from_non_bps_only: bool,
    pub stop_only_bps: bool,
    pub use_restart_script: bool,
    pub max_cost: bool,

    pub experiment_name: String,
    pub password_env: String,
    pub fund_key_prefix: String,
    pub privkeys: Vec<String>,
    pub payment_receiver: String,
    pub privkeys_per_fund_cmd: u64,
    /// Number of funding keys derived from the single privkey, 0 to fund directly
    pub generate_fund_keys: u64,

    pub rotation_keys: Vec<String>,
    pub rotation_servers: Vec<String>,
    pub rotation_permutation: bool,
    pub rotation_ratio: f64,

    /// Every other round becomes a max-cost zkapp round at this share of the rate
    pub mix_max_cost_tps_ratio: f64,
    pub large_pause_every_n_rounds: u64,
    pub large_pause_min: u64,

    pub min_balance_change: u64,
    pub max_balance_change: u64,
    pub deployment_fee: u64,
    pub payment_amount: u64,
    pub min_zkapp_fee: u64,
    pub max_zkapp_fee: u64,
    pub fund_fee: u64,
    pub min_payment_fee: u64,
    pub max_payment_fee: u64,

    /// -2 leaves the limit alone, -1 resets it, anything else sets it
    pub zkapp_soft_limit: i64,
}

/// Soft limit value meaning "do not touch"
pub const SOFT_LIMIT_UNCHANGED: i64 = -2;

impl Default for GenParams {
    fn default() -> Self {
        Self {
            min_tps: 0.01,
            base_tps: 0.3,
            stress_tps: 1.0,
            sender_ratio: 0.5,
            zkapp_ratio: 0.5,
            new_account_ratio: 0.0,
            stop_clean_ratio: 0.1,
            min_stop_ratio: 0.0,
            max_stop_ratio: 0.5,
            round_duration_min: 30,
            pause_min: 15,
            rounds: 4,
            stops_per_round: 2,
            gap: 180,
            send_from_non_bps_only: false,
            stop_only_bps: false,
            use_restart_script: false,
            max_cost: false,
            experiment_name: "exp-0".to_string(),
            password_env: String::new(),
            fund_key_prefix: "./fund_keys".to_string(),
            privkeys: Vec::new(),
            payment_receiver: String::new(),
            privkeys_per_fund_cmd: 1,
            generate_fund_keys: 20,
            rotation_keys: Vec::new(),
            rotation_servers: Vec::new(),
            rotation_permutation: false,
            rotation_ratio: 0.3,
            mix_max_cost_tps_ratio: 0.0,
            large_pause_every_n_rounds: 8,
            large_pause_min: 0,
            min_balance_change: 0,
            max_balance_change: 1_000,
            deployment_fee: 1_000_000_000,
            payment_amount: 100_000,
            min_zkapp_fee: 1_000_000_000,
            max_zkapp_fee: 2_000_000_000,
            fund_fee: 1_000_000_000,
            min_payment_fee: 100_000_000,
            max_payment_fee: 200_000_000,
            zkapp_soft_limit: SOFT_LIMIT_UNCHANGED,
        }
    }
}

impl GenParams {
    /// Directory under which all keys of this experiment live
    pub fn experiment_keys_dir(&self) -> String {
        format!("{}/{}", self.fund_key_prefix, self.experiment_name)
    }

    /// Whether a soft-limit command has to be emitted
    pub fn sets_soft_limit(&self) -> bool {
        self.zkapp_soft_limit > SOFT_LIMIT_UNCHANGED
    }

    /// Soft limit payload value, `None` meaning reset
    pub fn soft_limit_value(&self) -> Option<i64> {
        (self.zkapp_soft_limit >= 0).then_some(self.zkapp_soft_limit)
    }
}

/// User-facing experiment input where every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorInput {
    pub experiment_name: Option<String>,
    pub min_tps: Option<f64>,
    pub base_tps: Option<f64>,
    pub stress_tps: Option<f64>,
    pub sender_ratio: Option<f64>,
    pub zkapp_ratio: Option<f64>,
    pub new_account_ratio: Option<f64>,
    pub stop_clean_ratio: Option<f64>,
    pub min_stop_ratio: Option<f64>,
    pub max_stop_ratio: Option<f64>,
    pub round_duration_min: Option<u64>,
    pub pause_min: Option<u64>,
    pub rounds: Option<u64>,
    pub stops_per_round: Option<u64>,
    pub gap: Option<u64>,
    pub send_from_non_bps_only: Option<bool>,
    pub stop_only_bps: Option<bool>,
    pub use_restart_script: Option<bool>,
    pub max_cost: Option<bool>,
    pub password_env: Option<String>,
    pub fund_key_prefix: Option<String>,
    pub privkeys: Option<Vec<String>>,
    pub payment_receiver: Option<String>,
    pub privkeys_per_fund_cmd: Option<u64>,
    pub generate_fund_keys: Option<u64>,
    pub rotation_keys: Option<Vec<String>>,
    pub rotation_servers: Option<Vec<String>>,
    pub rotation_permutation: Option<bool>,
    pub rotation_ratio: Option<f64>,
    pub mix_max_cost_tps_ratio: Option<f64>,
    pub large_pause_every_n_rounds: Option<u64>,
    pub large_pause_min: Option<u64>,
    pub min_balance_change: Option<u64>,
    pub max_balance_change: Option<u64>,
    pub deployment_fee: Option<u64>,
    pub payment_amount: Option<u64>,
    pub min_zkapp_fee: Option<u64>,
    pub max_zkapp_fee: Option<u64>,
    pub fund_fee: Option<u64>,
    pub min_payment_fee: Option<u64>,
    pub max_payment_fee: Option<u64>,
    pub zkapp_soft_limit: Option<i64>,
}

macro_rules! merge {
    ($params:ident, $input:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $input.$field {
                $params.$field = value;
            }
        )+
    };
}

impl GeneratorInput {
    /// Merge the provided fields over the defaults
    pub fn apply_with_defaults(self) -> GenParams {
        self.apply_over(GenParams::default())
    }

    /// Merge the provided fields over `params`
    pub fn apply_over(self, mut params: GenParams) -> GenParams {
        let input = self;
        merge!(
            params,
            input,
            experiment_name,
            min_tps,
            base_tps,
            stress_tps,
            sender_ratio,
            zkapp_ratio,
            new_account_ratio,
            stop_clean_ratio,
            min_stop_ratio,
            max_stop_ratio,
            round_duration_min,
            pause_min,
            rounds,
            stops_per_round,
            gap,
            send_from_non_bps_only,
            stop_only_bps,
            use_restart_script,
            max_cost,
            password_env,
            fund_key_prefix,
            privkeys,
            payment_receiver,
            privkeys_per_fund_cmd,
            generate_fund_keys,
            rotation_keys,
            rotation_servers,
            rotation_permutation,
            rotation_ratio,
            mix_max_cost_tps_ratio,
            large_pause_every_n_rounds,
            large_pause_min,
            min_balance_change,
            max_balance_change,
            deployment_fee,
            payment_amount,
            min_zkapp_fee,
            max_zkapp_fee,
            fund_fee,
            min_payment_fee,
            max_payment_fee,
            zkapp_soft_limit,
        );
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_merges_over_defaults() {
        let input: GeneratorInput = serde_json::from_value(json!({
            "experimentName": "soak-1",
            "rounds": 2,
            "zkappRatio": 0.0,
            "privkeys": ["/keys/fund"]
        }))
        .unwrap();

        let params = input.apply_with_defaults();
        assert_eq!(params.experiment_name, "soak-1");
        assert_eq!(params.rounds, 2);
        assert_eq!(params.zkapp_ratio, 0.0);
        assert_eq!(params.privkeys, vec!["/keys/fund"]);
        // Untouched fields keep their defaults
        assert_eq!(params.base_tps, 0.3);
        assert_eq!(params.gap, 180);
        assert_eq!(params.zkapp_soft_limit, SOFT_LIMIT_UNCHANGED);
    }

    #[test]
    fn test_soft_limit_value() {
        let mut params = GenParams::default();
        assert!(!params.sets_soft_limit());

        params.zkapp_soft_limit = -1;
        assert!(params.sets_soft_limit());
        assert_eq!(params.soft_limit_value(), None);

        params.zkapp_soft_limit = 5;
        assert_eq!(params.soft_limit_value(), Some(5));
    }
}
