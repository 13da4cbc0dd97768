//! CLI argument parsing definitions

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use netdrill_generator::{GenParams, GeneratorInput};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Generate and run network load experiments", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an experiment script
    Generate {
        #[command(flatten)]
        params: ParamsArgs,

        /// Seed for the random generator, for reproducible scripts
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// What to print
        #[arg(long, value_enum, default_value_t = GenerateMode::Script)]
        mode: GenerateMode,

        /// Write the script here instead of stdout
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Execute a script against the network
    Run {
        /// Script to execute, stdin when omitted
        #[arg(value_name = "SCRIPT")]
        script: Option<PathBuf>,

        /// Experiment name, defaults to the script file name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        /// Free-form description stored with the experiment
        #[arg(long, value_name = "TEXT")]
        description: Option<String>,
    },

    /// Check experiment parameters without generating anything
    Validate {
        #[command(flatten)]
        params: ParamsArgs,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        #[arg(value_name = "PATH")]
        config_file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenerateMode {
    /// The experiment script
    Script,
    /// 10000 draws of the per-round tps
    TpsDistribution,
    /// 10000 draws of the stop ratio
    StopRatioDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

/// Experiment parameters: a JSON input file overlaid with flags
#[derive(Args, Debug, Default)]
pub struct ParamsArgs {
    /// JSON file with experiment parameters
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Experiment name
    #[arg(long, value_name = "NAME")]
    pub experiment_name: Option<String>,

    /// Number of rounds
    #[arg(long)]
    pub rounds: Option<u64>,

    /// Minutes of traffic per round
    #[arg(long)]
    pub round_duration_min: Option<u64>,

    /// Minutes of pause between rounds
    #[arg(long)]
    pub pause_min: Option<u64>,

    /// Base transactions per second
    #[arg(long)]
    pub base_tps: Option<f64>,

    /// Extra tps added under stress
    #[arg(long)]
    pub stress_tps: Option<f64>,

    /// Share of nodes sending traffic
    #[arg(long)]
    pub sender_ratio: Option<f64>,

    /// Share of traffic sent as zkapp transactions
    #[arg(long)]
    pub zkapp_ratio: Option<f64>,

    /// Node stop events per round
    #[arg(long)]
    pub stops_per_round: Option<u64>,

    /// Private key paying for funding (repeatable)
    #[arg(long = "privkey", value_name = "PATH")]
    pub privkeys: Vec<String>,

    /// Directory funded keys are created under
    #[arg(long, value_name = "DIR")]
    pub fund_key_prefix: Option<String>,

    /// Receiver of payments
    #[arg(long, value_name = "PUBKEY")]
    pub payment_receiver: Option<String>,

    /// Generate this many fresh paying keys first
    #[arg(long)]
    pub generate_fund_keys: Option<u64>,
}

impl ParamsArgs {
    /// Merge the input file, then the flags, over the defaults
    pub fn resolve(&self) -> Result<GenParams> {
        let mut input = match &self.input {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str::<GeneratorInput>(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => GeneratorInput::default(),
        };

        macro_rules! overlay {
            ($($field:ident),+) => {
                $(
                    if let Some(value) = self.$field.clone() {
                        input.$field = Some(value);
                    }
                )+
            };
        }
        overlay!(
            experiment_name,
            rounds,
            round_duration_min,
            pause_min,
            base_tps,
            stress_tps,
            sender_ratio,
            zkapp_ratio,
            stops_per_round,
            fund_key_prefix,
            payment_receiver,
            generate_fund_keys
        );
        if !self.privkeys.is_empty() {
            input.privkeys = Some(self.privkeys.clone());
        }

        Ok(input.apply_with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_input_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"experimentName": "from-file", "rounds": 3, "baseTps": 0.5}}"#).unwrap();

        let args = ParamsArgs {
            input: Some(file.path().to_path_buf()),
            rounds: Some(7),
            privkeys: vec!["/keys/a".to_string()],
            ..Default::default()
        };
        let params = args.resolve().unwrap();
        assert_eq!(params.experiment_name, "from-file");
        assert_eq!(params.rounds, 7);
        assert_eq!(params.base_tps, 0.5);
        assert_eq!(params.privkeys, vec!["/keys/a"]);
    }

    #[test]
    fn test_parse_generate_command() {
        let cli = Cli::try_parse_from([
            "netdrill",
            "generate",
            "--experiment-name",
            "exp",
            "--privkey",
            "/a",
            "--privkey",
            "/b",
            "--mode",
            "tps-distribution",
            "--seed",
            "42",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { params, seed, mode, .. } => {
                assert_eq!(params.privkeys, vec!["/a", "/b"]);
                assert_eq!(seed, Some(42));
                assert_eq!(mode, GenerateMode::TpsDistribution);
            }
            _ => panic!("expected generate"),
        }
    }
}
