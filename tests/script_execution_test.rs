//! Generated scripts executed against an in-memory network

mod common;

use async_trait::async_trait;
use common::FakeNetwork;
use netdrill_config::DaemonConfig;
use netdrill_core::params::FundParams;
use netdrill_execution::{
    Action, ActionContext, ActionError, ActionIO, ActionRegistry, Engine, EngineError, MemorySink,
    StepOutput,
};
use netdrill_generator::{encode, GenParams, JsonLinesWriter};
use netdrill_storage::{ExperimentState, ExperimentStatus, ExperimentStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Stands in for the daemon CLI: writes one key file per account
struct LocalFundAction;

impl LocalFundAction {
    fn create(params: Value) -> Result<(), ActionError> {
        let params: FundParams = serde_json::from_value(params)?;
        let prefix = Path::new(&params.prefix);
        if let Some(dir) = prefix.parent() {
            std::fs::create_dir_all(dir)?;
        }
        for i in 0..params.num {
            std::fs::write(format!("{}-0-{}", params.prefix, i), "private")?;
            std::fs::write(format!("{}-0-{}.pub", params.prefix, i), "public")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Action for LocalFundAction {
    fn name(&self) -> &'static str {
        "fund-keys"
    }

    async fn run(&self, _ctx: &ActionContext, params: Value, _output: &StepOutput) -> Result<(), ActionError> {
        Self::create(params)
    }

    fn is_batch(&self) -> bool {
        true
    }

    async fn run_many(&self, _ctx: &ActionContext, batch: Vec<ActionIO>) -> Result<(), ActionError> {
        for io in batch {
            Self::create(io.params)?;
        }
        Ok(())
    }
}

fn script_for(params: &GenParams, seed: u64) -> Vec<u8> {
    let mut writer = JsonLinesWriter::new(Vec::new());
    encode(params, &mut StdRng::seed_from_u64(seed), &mut writer).unwrap();
    writer.into_inner()
}

fn context(network: Arc<FakeNetwork>, token: CancellationToken) -> ActionContext {
    let config = DaemonConfig {
        daemon_exec: Some("mina".to_string()),
        ..Default::default()
    };
    ActionContext::new(config, network, token)
}

#[tokio::test]
async fn test_unknown_tag_fails_and_leaves_store_running() {
    let store = Arc::new(ExperimentStore::in_memory());
    let token = CancellationToken::new();
    store
        .add(ExperimentState::new("exp", json!({})), token.clone())
        .await
        .unwrap();

    let engine = Engine::new(
        Arc::new(ActionRegistry::with_builtin()),
        context(Arc::new(FakeNetwork::default()), token),
    )
    .with_sink(Arc::new(MemorySink::new()))
    .with_listener(store.clone());

    let script = "\"a comment\"\n{\"action\":\"unknown-tag\",\"params\":{}}\n";
    let err = engine.run(script.as_bytes()).await.unwrap_err();

    assert!(matches!(err, EngineError::UnknownAction(ref tag) if tag == "unknown-tag"));
    assert_eq!(err.code(), 10);
    let state = store.atomic_get().await.unwrap();
    assert_eq!(state.status, ExperimentStatus::Running);
    assert_eq!(state.logs, vec!["a comment"]);
}

#[tokio::test(start_paused = true)]
async fn test_single_payment_round_runs_end_to_end() {
    let keys = tempfile::tempdir().unwrap();
    let params = GenParams {
        rounds: 1,
        sender_ratio: 1.0,
        zkapp_ratio: 0.0,
        stops_per_round: 0,
        generate_fund_keys: 0,
        base_tps: 0.5,
        stress_tps: 0.5,
        gap: 10,
        experiment_name: "e2e".to_string(),
        fund_key_prefix: keys.path().to_string_lossy().into_owned(),
        privkeys: vec!["/keys/bp-0".to_string()],
        payment_receiver: "B62qreceiver".to_string(),
        ..Default::default()
    };
    let script = script_for(&params, 11);

    let mut registry = ActionRegistry::with_builtin();
    registry.register(Arc::new(LocalFundAction));
    let network = Arc::new(FakeNetwork::with_nodes(&["n0", "n1"]));
    let sink = Arc::new(MemorySink::new());
    let engine = Engine::new(
        Arc::new(registry),
        context(network.clone(), CancellationToken::new()),
    )
    .with_sink(sink.clone());

    let steps = engine.run(&script[..]).await.unwrap();
    assert_eq!(steps, 4);

    let requests = network.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.starts_with("payments ")));

    // discovery and payments report participants, loaded keys stay private
    let names: Vec<String> = sink.records().into_iter().map(|r| r.name).collect();
    assert_eq!(names.iter().filter(|n| *n == "participant").count(), 4);
    assert!(!names.iter().any(|n| n == "key"));
    let loaded = engine.cache().get(2, "key").unwrap();
    assert_eq!(loaded.values.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_traffic_with_stops_runs_end_to_end() {
    for seed in 0..8 {
        let keys = tempfile::tempdir().unwrap();
        let params = GenParams {
            rounds: 1,
            stops_per_round: 3,
            base_tps: 0.5,
            stress_tps: 0.5,
            gap: 10,
            generate_fund_keys: 0,
            experiment_name: format!("mixed-{}", seed),
            fund_key_prefix: keys.path().to_string_lossy().into_owned(),
            privkeys: vec!["/keys/bp-0".to_string()],
            payment_receiver: "B62qreceiver".to_string(),
            ..Default::default()
        };
        let script = script_for(&params, seed);
        let commands = script.split(|b| *b == b'\n').filter(|line| line.starts_with(b"{")).count();

        let mut registry = ActionRegistry::with_builtin();
        registry.register(Arc::new(LocalFundAction));
        let network = Arc::new(FakeNetwork::with_nodes(&["n0", "n1", "n2", "n3", "n4", "n5"]));
        let engine = Engine::new(
            Arc::new(registry),
            context(network.clone(), CancellationToken::new()),
        )
        .with_sink(Arc::new(MemorySink::new()));

        let steps = engine.run(&script[..]).await.unwrap_or_else(|e| panic!("seed {}: {}", seed, e));
        assert_eq!(steps, commands);

        let requests = network.requests();
        let senders: Vec<&str> = requests
            .iter()
            .filter(|r| r.starts_with("payments ") || r.starts_with("zkapps "))
            .filter_map(|r| r.split(' ').nth(1))
            .collect();
        assert!(requests.iter().any(|r| r.starts_with("payments ")));
        assert!(requests.iter().any(|r| r.starts_with("zkapps ")));

        // Nodes sending traffic are never stopped in the same round
        for stop in requests.iter().filter(|r| r.starts_with("stop ")) {
            let node = stop.split(' ').nth(1).unwrap();
            assert!(!senders.contains(&node), "seed {}: stopped sender {}", seed, node);
        }
    }
}

#[tokio::test]
async fn test_batch_validation_stops_before_running() {
    let keys = tempfile::tempdir().unwrap();
    let prefix = keys.path().join("round-0").join("payments").join("key");
    std::fs::create_dir_all(prefix.parent().unwrap()).unwrap();
    std::fs::write(keys.path().join("round-0/payments/key-0-0"), "private").unwrap();

    let payload = json!({
        "amount": 100, "fee": 1, "prefix": prefix, "num": 1, "privkeys": ["/keys/bp-0"]
    });
    let script = format!("{}\n", json!({"action": "fund-keys", "params": payload}));

    let engine = Engine::new(
        Arc::new(ActionRegistry::with_builtin()),
        context(Arc::new(FakeNetwork::default()), CancellationToken::new()),
    )
    .with_sink(Arc::new(MemorySink::new()));
    let err = engine.run(script.as_bytes()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { step: 0, .. }));
}

#[tokio::test]
async fn test_same_seed_same_script() {
    let params = GenParams {
        privkeys: vec!["/keys/bp-0".to_string()],
        payment_receiver: "B62qreceiver".to_string(),
        ..Default::default()
    };
    assert_eq!(script_for(&params, 3), script_for(&params, 3));
}
