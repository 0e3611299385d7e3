//! ELA main chain node client

use crate::config::NetworkConfig;
use crate::error::{PipelineError, Result};
use crate::jsonrpc::{JsonRpcClient, JsonRpcError};
use crate::submitter::Broadcaster;
use crate::types::RawTransaction;
use serde_json::json;

/// JSON-RPC client for an ELA node
pub struct ElaNodeClient {
    rpc: JsonRpcClient,
}

impl ElaNodeClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(rpc_url)?,
        })
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::new(config.rpc_url.clone())
    }
}

impl Broadcaster for ElaNodeClient {
    async fn broadcast(&self, raw: &RawTransaction) -> Result<String> {
        let txid: Option<String> = self
            .rpc
            .call("sendrawtransaction", json!({ "data": raw.hex() }))
            .await
            .map_err(|e| match e.downcast_ref::<JsonRpcError>() {
                Some(rpc) => PipelineError::Broadcast(rpc.message.clone()).into(),
                None => e.wrap_err(format!("Failed to reach {}", self.rpc.url())),
            })?;

        txid.filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::Broadcast("node returned no txid".into()).into())
    }
}
