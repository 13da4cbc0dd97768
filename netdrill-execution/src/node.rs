//! Daemon control client
//!
//! Actions reach the nodes under test through [`NodeControl`]. The HTTP
//! implementation posts GraphQL documents to `http://<node>/graphql`, asks
//! the online-status service which nodes are up, and forwards key rotation
//! transfers to the rotation REST servers.

use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_config::DaemonConfig;
use netdrill_core::params::{DiscoveryParams, PaymentSubParams, ZkappSubParams};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Balance move requested from a rotation server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender: String,
    pub receiver: String,
    /// Share of the sender balance to move
    pub ratio: f64,
    pub fee: u64,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password: String,
}

/// Operations the actions perform against daemons
#[async_trait]
pub trait NodeControl: Send + Sync {
    /// Addresses of the nodes currently online
    async fn discover(&self, filter: &DiscoveryParams) -> Result<Vec<String>, ActionError>;

    async fn set_zkapp_soft_limit(&self, node: &str, limit: Option<i64>) -> Result<(), ActionError>;

    /// Schedule payments on `node`, returning the scheduler handle
    async fn schedule_payments(
        &self,
        node: &str,
        params: &PaymentSubParams,
        fee_payers: &[String],
    ) -> Result<String, ActionError>;

    /// Schedule zkapp transactions on `node`, returning the scheduler handle
    async fn schedule_zkapps(
        &self,
        node: &str,
        params: &ZkappSubParams,
        fee_payers: &[String],
    ) -> Result<String, ActionError>;

    async fn stop_daemon(&self, node: &str, clean: bool) -> Result<(), ActionError>;

    async fn transfer(&self, server: &str, request: &TransferRequest) -> Result<(), ActionError>;
}

const SET_SOFT_LIMIT: &str =
    "mutation ($limit: Int) { setZkappSoftLimit(input: {limit: $limit}) }";
const SCHEDULE_PAYMENTS: &str =
    "mutation ($input: PaymentsDetails!) { schedulePayments(input: $input) }";
const SCHEDULE_ZKAPPS: &str =
    "mutation ($input: ZkappCommandsDetails!) { scheduleZkappCommands(input: $input) }";
const STOP_DAEMON: &str =
    "mutation ($delaySec: Int!, $clean: Boolean!) { stopDaemon(delaySec: $delaySec, clean: $clean) }";

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// One entry of the online-status service listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnlineNode {
    address: String,
    #[serde(default)]
    block_producer: bool,
}

/// [`NodeControl`] over HTTP
pub struct HttpNodeControl {
    client: reqwest::Client,
    online_url: Option<Url>,
    graphql_port: u16,
    stop_delay: Duration,
    print_requests: bool,
}

impl HttpNodeControl {
    pub fn new(config: &DaemonConfig) -> Result<Self, ActionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let online_url = config
            .online_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ActionError::InvalidInput(format!("online url: {}", e)))?;
        Ok(Self {
            client,
            online_url,
            graphql_port: config.graphql_port,
            stop_delay: config.stop_daemon_delay,
            print_requests: config.print_requests,
        })
    }

    fn graphql_url(&self, node: &str) -> Result<Url, ActionError> {
        let with_scheme = if node.contains("://") {
            node.to_string()
        } else {
            format!("http://{}", node)
        };
        let mut url = Url::parse(&with_scheme)
            .map_err(|e| ActionError::InvalidInput(format!("node address {}: {}", node, e)))?;
        if url.port().is_none() {
            url.set_port(Some(self.graphql_port))
                .map_err(|_| ActionError::InvalidInput(format!("node address {}", node)))?;
        }
        url.set_path("/graphql");
        Ok(url)
    }

    async fn graphql(&self, node: &str, query: &str, variables: Value) -> Result<Value, ActionError> {
        let url = self.graphql_url(node)?;
        if self.print_requests {
            debug!("GraphQL request to {}: {} {}", url, query, variables);
        }
        let response: GraphqlResponse = self
            .client
            .post(url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.errors.first() {
            return Err(ActionError::Node(format!("{}: {}", node, error.message)));
        }
        Ok(response.data.unwrap_or(Value::Null))
    }

    fn handle(data: &Value, field: &str) -> String {
        match &data[field] {
            Value::String(handle) => handle.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl NodeControl for HttpNodeControl {
    async fn discover(&self, filter: &DiscoveryParams) -> Result<Vec<String>, ActionError> {
        let url = self
            .online_url
            .clone()
            .ok_or_else(|| ActionError::InvalidInput("no online url configured".to_string()))?;
        let nodes: Vec<OnlineNode> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(nodes
            .into_iter()
            .filter(|node| !(filter.only_block_producers && !node.block_producer))
            .filter(|node| !(filter.no_block_producers && node.block_producer))
            .map(|node| node.address)
            .collect())
    }

    async fn set_zkapp_soft_limit(&self, node: &str, limit: Option<i64>) -> Result<(), ActionError> {
        self.graphql(node, SET_SOFT_LIMIT, json!({ "limit": limit }))
            .await
            .map(|_| ())
    }

    async fn schedule_payments(
        &self,
        node: &str,
        params: &PaymentSubParams,
        fee_payers: &[String],
    ) -> Result<String, ActionError> {
        let mut input = serde_json::to_value(params)?;
        input["senders"] = json!(fee_payers);
        let data = self
            .graphql(node, SCHEDULE_PAYMENTS, json!({ "input": input }))
            .await?;
        Ok(Self::handle(&data, "schedulePayments"))
    }

    async fn schedule_zkapps(
        &self,
        node: &str,
        params: &ZkappSubParams,
        fee_payers: &[String],
    ) -> Result<String, ActionError> {
        let mut input = serde_json::to_value(params)?;
        input["feePayers"] = json!(fee_payers);
        let data = self
            .graphql(node, SCHEDULE_ZKAPPS, json!({ "input": input }))
            .await?;
        Ok(Self::handle(&data, "scheduleZkappCommands"))
    }

    async fn stop_daemon(&self, node: &str, clean: bool) -> Result<(), ActionError> {
        let variables = json!({ "delaySec": self.stop_delay.as_secs(), "clean": clean });
        self.graphql(node, STOP_DAEMON, variables).await.map(|_| ())
    }

    async fn transfer(&self, server: &str, request: &TransferRequest) -> Result<(), ActionError> {
        let base = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };
        let url = Url::parse(&base)
            .and_then(|url| url.join("transfer"))
            .map_err(|e| ActionError::InvalidInput(format!("rotation server {}: {}", server, e)))?;
        self.client
            .post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
