//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use netdrill_core::params::{DiscoveryParams, PaymentSubParams, ZkappSubParams};
use netdrill_execution::{ActionError, NodeControl, TransferRequest};
use parking_lot::Mutex;

/// In-memory network: a fixed node list and a log of every request
#[derive(Default)]
pub struct FakeNetwork {
    pub nodes: Vec<String>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn with_nodes(nodes: &[&str]) -> Self {
        Self {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<String> {
        let mut requests = self.requests.lock().clone();
        requests.sort();
        requests
    }
}

#[async_trait]
impl NodeControl for FakeNetwork {
    async fn discover(&self, _filter: &DiscoveryParams) -> Result<Vec<String>, ActionError> {
        Ok(self.nodes.clone())
    }

    async fn set_zkapp_soft_limit(&self, node: &str, limit: Option<i64>) -> Result<(), ActionError> {
        self.requests.lock().push(format!("limit {} {:?}", node, limit));
        Ok(())
    }

    async fn schedule_payments(
        &self,
        node: &str,
        _params: &PaymentSubParams,
        fee_payers: &[String],
    ) -> Result<String, ActionError> {
        self.requests
            .lock()
            .push(format!("payments {} {}", node, fee_payers.len()));
        Ok(format!("payments-{}", node))
    }

    async fn schedule_zkapps(
        &self,
        node: &str,
        _params: &ZkappSubParams,
        fee_payers: &[String],
    ) -> Result<String, ActionError> {
        self.requests
            .lock()
            .push(format!("zkapps {} {}", node, fee_payers.len()));
        Ok(format!("zkapps-{}", node))
    }

    async fn stop_daemon(&self, node: &str, clean: bool) -> Result<(), ActionError> {
        self.requests.lock().push(format!("stop {} {}", node, clean));
        Ok(())
    }

    async fn transfer(&self, server: &str, request: &TransferRequest) -> Result<(), ActionError> {
        self.requests
            .lock()
            .push(format!("transfer {} {}", server, request.sender));
        Ok(())
    }
}
