//! ERC-4337 bundler client

use crate::error::{PipelineError, Result};
use crate::jsonrpc::{JsonRpcClient, JsonRpcError};
use crate::types::{GasEstimate, UserOperation, UserOperationReceipt};
use alloy::primitives::{Address, B256};
use eyre::Report;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// Bundler RPC surface used by the pipeline
pub trait BundlerApi: Send + Sync {
    /// `eth_sendUserOperation`, returns the user operation hash
    fn send_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> impl Future<Output = Result<B256>> + Send;

    /// `eth_estimateUserOperationGas`
    fn estimate_user_operation_gas(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> impl Future<Output = Result<GasEstimate>> + Send;

    /// `eth_getUserOperationReceipt`, `None` until the operation is mined
    fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> impl Future<Output = Result<Option<UserOperationReceipt>>> + Send;
}

impl<B: BundlerApi> BundlerApi for Arc<B> {
    async fn send_user_operation(&self, op: &UserOperation, entry_point: Address) -> Result<B256> {
        self.as_ref().send_user_operation(op, entry_point).await
    }

    async fn estimate_user_operation_gas(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<GasEstimate> {
        self.as_ref().estimate_user_operation_gas(op, entry_point).await
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>> {
        self.as_ref().get_user_operation_receipt(user_op_hash).await
    }
}

/// JSON-RPC bundler client
pub struct BundlerClient {
    rpc: JsonRpcClient,
}

fn bundler_error(method: &str, e: Report) -> Report {
    match e.downcast_ref::<JsonRpcError>() {
        Some(rpc) => PipelineError::BundlerRpc {
            code: Some(rpc.code),
            message: rpc.message.clone(),
        }
        .into(),
        None => e.wrap_err(format!("{method} failed")),
    }
}

impl BundlerClient {
    pub fn new(bundler_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(bundler_url)?,
        })
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<R>> {
        self.rpc
            .call(method, params)
            .await
            .map_err(|e| bundler_error(method, e))
    }

    /// Call that must produce a result
    async fn call_required<R: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R> {
        self.call(method, params).await?.ok_or_else(|| {
            PipelineError::BundlerRpc {
                code: None,
                message: format!("{method} returned no result"),
            }
            .into()
        })
    }

    /// `eth_supportedEntryPoints`
    pub async fn supported_entry_points(&self) -> Result<Vec<Address>> {
        self.call_required("eth_supportedEntryPoints", json!([]))
            .await
    }
}

impl BundlerApi for BundlerClient {
    async fn send_user_operation(&self, op: &UserOperation, entry_point: Address) -> Result<B256> {
        let hash: B256 = self
            .call_required("eth_sendUserOperation", json!([op, entry_point]))
            .await?;
        tracing::info!("Bundler accepted user operation {}", hash);
        Ok(hash)
    }

    async fn estimate_user_operation_gas(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<GasEstimate> {
        self.call_required("eth_estimateUserOperationGas", json!([op, entry_point]))
            .await
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>> {
        self.call("eth_getUserOperationReceipt", json!([user_op_hash]))
            .await
    }
}
