//! Experiment parameter validation
//!
//! Checks form a table; each carries its own message and category code.
//! Callers presenting problems to a user collect every failure, callers
//! gating file creation stop at the first one.

use crate::params::GenParams;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Longest accepted experiment name, exclusive
const MAX_EXPERIMENT_NAME_LEN: usize = 50;

/// Characters that would escape the key directory or break a shell
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Category of a validation failure, doubling as the CLI exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    Range,
    InvalidName,
    MissingInput,
    InconsistentRotation,
    OutputDirExists,
    MissingKeyFile,
    Duration,
}

impl ValidationCode {
    pub fn code(&self) -> i32 {
        match self {
            ValidationCode::Range => 2,
            ValidationCode::InvalidName => 3,
            ValidationCode::MissingInput => 4,
            ValidationCode::InconsistentRotation => 5,
            ValidationCode::OutputDirExists => 6,
            ValidationCode::MissingKeyFile => 7,
            ValidationCode::Duration => 9,
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationCode::Range => "range",
            ValidationCode::InvalidName => "invalid-name",
            ValidationCode::MissingInput => "missing-input",
            ValidationCode::InconsistentRotation => "inconsistent-rotation",
            ValidationCode::OutputDirExists => "output-dir-exists",
            ValidationCode::MissingKeyFile => "missing-key-file",
            ValidationCode::Duration => "duration",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationFailure {
    fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

type Check = fn(&GenParams) -> Option<ValidationFailure>;

fn fail_if(condition: bool, code: ValidationCode, message: &str) -> Option<ValidationFailure> {
    condition.then(|| ValidationFailure::new(code, message))
}

fn out_of_unit_range(value: f64) -> bool {
    !(0.0..=1.0).contains(&value)
}

fn check_ratios(p: &GenParams) -> Option<ValidationFailure> {
    let ratios = [
        (p.sender_ratio, "sender ratio"),
        (p.zkapp_ratio, "zkapp ratio"),
        (p.min_stop_ratio, "min stop ratio"),
        (p.max_stop_ratio, "max stop ratio"),
        (p.stop_clean_ratio, "stop-clean ratio"),
        (p.mix_max_cost_tps_ratio, "max-cost-mixed ratio"),
        (p.rotation_ratio, "rotation ratio"),
    ];
    ratios
        .iter()
        .find(|(value, _)| out_of_unit_range(*value))
        .map(|(_, name)| ValidationFailure::new(ValidationCode::Range, format!("Invalid {}", name)))
}

fn check_stop_ratio_order(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.min_stop_ratio > p.max_stop_ratio,
        ValidationCode::Range,
        "min stop ratio exceeds max stop ratio",
    )
}

fn check_fee_order(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.min_zkapp_fee > p.max_zkapp_fee
            || p.min_payment_fee > p.max_payment_fee
            || p.min_balance_change > p.max_balance_change,
        ValidationCode::Range,
        "minimum fee or balance change exceeds its maximum",
    )
}

fn check_tps(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.base_tps <= 0.0 || p.stress_tps < p.base_tps || p.min_tps < 0.0,
        ValidationCode::Range,
        "wrong tps: base should be positive and not above stress",
    )
}

fn check_max_cost_exclusive(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.max_cost && p.mix_max_cost_tps_ratio > 1e-3,
        ValidationCode::Range,
        "both max-cost-mixed and max-cost specified",
    )
}

fn check_large_pause_cadence(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.large_pause_every_n_rounds == 0,
        ValidationCode::Range,
        "wrong large-pause-every: should be a positive number",
    )
}

fn check_rounds(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(p.rounds == 0, ValidationCode::Range, "rounds should be a positive number")
}

fn check_round_duration(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.round_duration_min == 0 || p.round_duration_min.saturating_mul(60) < p.gap.saturating_mul(4),
        ValidationCode::Duration,
        "increase round duration: roundDurationMin*60 should be more than gap*4",
    )
}

fn check_new_account_ratio(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.new_account_ratio < 0.0,
        ValidationCode::Range,
        "wrong new account ratio",
    )
}

fn check_experiment_name(p: &GenParams) -> Option<ValidationFailure> {
    let name = p.experiment_name.as_str();
    if name.trim().is_empty() {
        return Some(ValidationFailure::new(
            ValidationCode::InvalidName,
            "experiment name is required",
        ));
    }
    fail_if(
        name.len() >= MAX_EXPERIMENT_NAME_LEN
            || name.chars().any(|c| c.is_whitespace() || FORBIDDEN_NAME_CHARS.contains(&c)),
        ValidationCode::InvalidName,
        "experiment name should be shorter than 50 characters without spaces or path characters",
    )
}

fn check_privkeys_present(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.privkeys.is_empty(),
        ValidationCode::MissingInput,
        "funding private key files are required",
    )
}

fn check_single_privkey_for_generation(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.generate_fund_keys > 0 && p.privkeys.len() > 1,
        ValidationCode::MissingInput,
        "when funding keys are generated, only a single private key should be provided",
    )
}

fn check_privkeys_per_fund(p: &GenParams) -> Option<ValidationFailure> {
    let available = if p.generate_fund_keys > 0 {
        p.generate_fund_keys
    } else {
        p.privkeys.len() as u64
    };
    fail_if(
        p.privkeys_per_fund_cmd == 0 || available < p.privkeys_per_fund_cmd,
        ValidationCode::MissingInput,
        "number of private keys is less than privkeys per fund command",
    )
}

fn check_rotation(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.rotation_keys.len() != p.rotation_servers.len(),
        ValidationCode::InconsistentRotation,
        "wrong rotation configuration: keys and servers differ in length",
    )
}

fn check_payment_receiver(p: &GenParams) -> Option<ValidationFailure> {
    fail_if(
        p.payment_receiver.trim().is_empty() && p.zkapp_ratio < 0.999,
        ValidationCode::MissingInput,
        "payment receiver not specified",
    )
}

fn check_output_dir(p: &GenParams) -> Option<ValidationFailure> {
    let dir = p.experiment_keys_dir();
    Path::new(&dir).exists().then(|| {
        ValidationFailure::new(
            ValidationCode::OutputDirExists,
            format!("key directory {} already exists", dir),
        )
    })
}

fn check_privkey_files(p: &GenParams) -> Option<ValidationFailure> {
    p.privkeys
        .iter()
        .find(|path| !Path::new(path).is_file())
        .map(|path| {
            ValidationFailure::new(
                ValidationCode::MissingKeyFile,
                format!("file not found or missing permissions for privkey {}", path),
            )
        })
}

const CHECKS: &[Check] = &[
    check_ratios,
    check_stop_ratio_order,
    check_fee_order,
    check_tps,
    check_max_cost_exclusive,
    check_large_pause_cadence,
    check_rounds,
    check_round_duration,
    check_new_account_ratio,
    check_experiment_name,
    check_privkeys_present,
    check_single_privkey_for_generation,
    check_privkeys_per_fund,
    check_rotation,
    check_payment_receiver,
    check_output_dir,
    check_privkey_files,
];

/// Run every check and collect all failures
pub fn validate_all(params: &GenParams) -> Vec<ValidationFailure> {
    CHECKS.iter().filter_map(|check| check(params)).collect()
}

/// Stop at the first failing check
pub fn validate_first(params: &GenParams) -> Result<(), ValidationFailure> {
    match CHECKS.iter().find_map(|check| check(params)) {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        params: GenParams,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("fund.key");
        std::fs::write(&key, "secret").unwrap();
        let params = GenParams {
            privkeys: vec![key.to_string_lossy().into_owned()],
            payment_receiver: "B62qreceiver".to_string(),
            fund_key_prefix: dir.path().join("keys").to_string_lossy().into_owned(),
            ..Default::default()
        };
        Fixture { dir, params }
    }

    fn codes(params: &GenParams) -> Vec<ValidationCode> {
        validate_all(params).into_iter().map(|f| f.code).collect()
    }

    #[test]
    fn test_valid_params_pass() {
        let f = fixture();
        assert!(validate_all(&f.params).is_empty());
        assert!(validate_first(&f.params).is_ok());
    }

    #[test]
    fn test_ratio_out_of_range() {
        let f = fixture();
        let p = GenParams {
            sender_ratio: 1.5,
            ..f.params
        };
        let failure = validate_first(&p).unwrap_err();
        assert_eq!(failure.code, ValidationCode::Range);
        assert_eq!(failure.code.code(), 2);
        assert_eq!(failure.message, "Invalid sender ratio");
    }

    #[test]
    fn test_collects_every_failure() {
        let f = fixture();
        let p = GenParams {
            zkapp_ratio: -0.1,
            rotation_keys: vec!["k".to_string()],
            payment_receiver: String::new(),
            gap: 1_000,
            ..f.params
        };
        let found = codes(&p);
        assert!(found.contains(&ValidationCode::Range));
        assert!(found.contains(&ValidationCode::InconsistentRotation));
        assert!(found.contains(&ValidationCode::MissingInput));
        assert!(found.contains(&ValidationCode::Duration));
    }

    #[test]
    fn test_zkapp_only_needs_no_receiver() {
        let f = fixture();
        let p = GenParams {
            zkapp_ratio: 1.0,
            payment_receiver: String::new(),
            ..f.params
        };
        assert!(validate_all(&p).is_empty());
    }

    #[test]
    fn test_existing_output_dir() {
        let f = fixture();
        std::fs::create_dir_all(f.dir.path().join("keys").join("exp-0")).unwrap();
        assert_eq!(codes(&f.params), vec![ValidationCode::OutputDirExists]);
    }

    #[test]
    fn test_missing_key_file() {
        let f = fixture();
        let p = GenParams {
            privkeys: vec![f.dir.path().join("absent.key").to_string_lossy().into_owned()],
            ..f.params
        };
        assert_eq!(codes(&p), vec![ValidationCode::MissingKeyFile]);
    }

    #[test]
    fn test_generated_fund_keys_need_single_privkey() {
        let f = fixture();
        let mut p = f.params.clone();
        p.privkeys.push(p.privkeys[0].clone());
        assert_eq!(codes(&p), vec![ValidationCode::MissingInput]);

        p.generate_fund_keys = 0;
        p.privkeys_per_fund_cmd = 3;
        assert_eq!(codes(&p), vec![ValidationCode::MissingInput]);
    }

    #[test]
    fn test_experiment_names() {
        let f = fixture();
        for bad in ["", "has space", "a/b", "x".repeat(50).as_str(), "q?"] {
            let p = GenParams {
                experiment_name: bad.to_string(),
                ..f.params.clone()
            };
            assert_eq!(codes(&p), vec![ValidationCode::InvalidName], "{:?}", bad);
        }
    }

    #[test]
    fn test_max_cost_exclusive() {
        let f = fixture();
        let p = GenParams {
            max_cost: true,
            mix_max_cost_tps_ratio: 0.5,
            ..f.params
        };
        assert_eq!(
            validate_first(&p).unwrap_err().message,
            "both max-cost-mixed and max-cost specified"
        );
    }
}
