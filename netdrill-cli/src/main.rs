mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands, ConfigFormat, GenerateMode, ParamsArgs};
use netdrill_config::{ConfigLoader, NetdrillConfig};
use netdrill_execution::{ExperimentRunner, HttpNodeControl};
use netdrill_generator::{encode, sample_stop_ratio, sample_tps, validate_all, validate_first, JsonLinesWriter};
use netdrill_logging::init_logging;
use netdrill_storage::{
    ExperimentRepository, ExperimentState, ExperimentStore, FileExperimentRepository,
    InMemoryExperimentRepository,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, error, info, warn};

/// Draws printed by the distribution modes
const DISTRIBUTION_SAMPLES: usize = 10_000;

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<NetdrillConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                eprintln!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

fn handle_generate(params: &ParamsArgs, seed: Option<u64>, mode: GenerateMode, output: Option<&PathBuf>) -> Result<i32> {
    let params = params.resolve()?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match mode {
        GenerateMode::TpsDistribution => {
            let mut out = BufWriter::new(std::io::stdout().lock());
            for _ in 0..DISTRIBUTION_SAMPLES {
                writeln!(out, "{}", sample_tps(params.base_tps, params.stress_tps, &mut rng))?;
            }
            out.flush()?;
            return Ok(0);
        }
        GenerateMode::StopRatioDistribution => {
            let mut out = BufWriter::new(std::io::stdout().lock());
            for _ in 0..DISTRIBUTION_SAMPLES {
                writeln!(
                    out,
                    "{}",
                    sample_stop_ratio(params.min_stop_ratio, params.max_stop_ratio, &mut rng)
                )?;
            }
            out.flush()?;
            return Ok(0);
        }
        GenerateMode::Script => {}
    }

    if let Err(failure) = validate_first(&params) {
        error!("Invalid experiment parameters: {}", failure);
        eprintln!("{}", failure);
        return Ok(failure.code.code());
    }

    info!(
        "Generating {} rounds for experiment {}",
        params.rounds, params.experiment_name
    );
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = JsonLinesWriter::new(BufWriter::new(file));
            encode(&params, &mut rng, &mut writer)?;
            writer.into_inner().flush()?;
            info!("Script written to {}", path.display());
        }
        None => {
            let mut writer = JsonLinesWriter::new(BufWriter::new(std::io::stdout().lock()));
            encode(&params, &mut rng, &mut writer)?;
            writer.into_inner().flush()?;
        }
    }
    Ok(0)
}

fn handle_validate(params: &ParamsArgs) -> Result<i32> {
    let params = params.resolve()?;
    let failures = validate_all(&params);
    if failures.is_empty() {
        println!("Experiment parameters are valid");
        return Ok(0);
    }
    for failure in &failures {
        eprintln!("[{}] {}", failure.code, failure);
    }
    Ok(failures[0].code.code())
}

async fn handle_run(
    config: &NetdrillConfig,
    script: Option<&PathBuf>,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<i32> {
    let repository: Arc<dyn ExperimentRepository> = match &config.storage.state_dir {
        Some(dir) => {
            debug!("Mirroring experiment state to {}", dir.display());
            Arc::new(FileExperimentRepository::new(dir))
        }
        None => Arc::new(InMemoryExperimentRepository::new()),
    };
    let store = Arc::new(ExperimentStore::new(repository));

    let name = match (name, script) {
        (Some(name), _) => name.to_string(),
        (None, Some(path)) => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .context("Script path has no file name, pass --name")?,
        (None, None) => format!("experiment-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S")),
    };
    if !store.name_is_unique(&name).await {
        anyhow::bail!("An experiment named {} already exists", name);
    }

    let setup = json!({
        "script": script.map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string()),
    });
    let mut state = ExperimentState::new(&name, setup);
    if let Some(description) = description {
        state = state.with_description(description);
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let node = HttpNodeControl::new(&config.daemon).context("Failed to build daemon client")?;
    let runner = ExperimentRunner::new(store.clone(), config.daemon.clone(), Arc::new(node));

    let cancel_store = store.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling experiment");
            if let Err(e) = cancel_store.cancel().await {
                warn!("Nothing to cancel: {}", e);
            }
        }
    });

    info!("Starting experiment {}", name);
    match runner.run(state, reader).await {
        Ok(steps) => {
            info!("Experiment {} completed {} steps", name, steps);
            Ok(0)
        }
        Err(e) => {
            error!("Experiment {} failed: {}", name, e);
            eprintln!("{}", e);
            Ok(e.code())
        }
    }
}

fn handle_config(config: &NetdrillConfig, command: &ConfigCommands) -> Result<i32> {
    match command {
        ConfigCommands::Show { format } => {
            let rendered = match format {
                ConfigFormat::Yaml => serde_yaml::to_string(config)?,
                ConfigFormat::Json => serde_json::to_string_pretty(config)?,
            };
            println!("{}", rendered);
            Ok(0)
        }
        ConfigCommands::Validate { config_file } => {
            match ConfigLoader::new().from_file(config_file) {
                Ok(_) => {
                    println!("Configuration {} is valid", config_file.display());
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("Configuration {} is invalid: {}", config_file.display(), e);
                    Ok(1)
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let guard = init_logging(&config.logging, cli.log_level.as_deref())?;
    debug!("netdrill CLI starting");

    let code = match &cli.command {
        Commands::Generate {
            params,
            seed,
            mode,
            output,
        } => handle_generate(params, *seed, *mode, output.as_ref())?,
        Commands::Run {
            script,
            name,
            description,
        } => handle_run(&config, script.as_ref(), name.as_deref(), description.as_deref()).await?,
        Commands::Validate { params } => handle_validate(params)?,
        Commands::Config { config_cmd } => handle_config(&config, config_cmd)?,
    };

    if code != 0 {
        drop(guard);
        std::process::exit(code);
    }
    Ok(())
}
