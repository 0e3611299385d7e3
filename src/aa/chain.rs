//! EVM chain reads needed to build user operations

use crate::contracts::{IEntryPoint, ISimpleAccountFactory, UserOp};
use crate::types::{FeeEstimate, UserOperation};
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{aliases::U192, Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::{Client, Url};
use eyre::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout for EVM node calls
pub const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Type alias for read-only provider
type ReadProvider = Arc<RootProvider<Ethereum>>;

/// Chain state the user operation pipeline depends on
pub trait AccountChain: Send + Sync {
    /// Next entry point nonce of `sender` (key 0)
    fn get_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> impl Future<Output = Result<U256>> + Send;

    /// Deployed bytecode at `address`, empty when nothing is deployed
    fn get_code(&self, address: Address) -> impl Future<Output = Result<Bytes>> + Send;

    /// Counterfactual account address for `owner` / `salt`
    fn get_sender_address(
        &self,
        factory: Address,
        owner: Address,
        salt: U256,
    ) -> impl Future<Output = Result<Address>> + Send;

    /// Hash the entry point will verify the signature against
    fn get_user_op_hash(
        &self,
        entry_point: Address,
        op: &UserOperation,
    ) -> impl Future<Output = Result<B256>> + Send;

    /// Current EIP-1559 fee suggestion
    fn estimate_fees(&self) -> impl Future<Output = Result<FeeEstimate>> + Send;
}

/// AccountChain over an HTTP JSON-RPC endpoint
#[derive(Debug)]
pub struct RpcAccountChain {
    provider: ReadProvider,
}

impl RpcAccountChain {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url: Url = rpc_url.parse().context("Invalid RPC URL")?;
        let client = Client::builder()
            .timeout(RPC_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        // Read-only provider without fillers (we only do eth_call operations)
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_reqwest(client, url);

        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>, what: &str) -> Result<Bytes> {
        self.provider
            .call(
                alloy::rpc::types::TransactionRequest::default()
                    .with_to(to)
                    .with_input(data),
            )
            .await
            .with_context(|| format!("Failed to call {what}"))
    }
}

impl AccountChain for RpcAccountChain {
    async fn get_nonce(&self, entry_point: Address, sender: Address) -> Result<U256> {
        let call = IEntryPoint::getNonceCall {
            sender,
            key: U192::ZERO,
        };
        let result = self.eth_call(entry_point, call.abi_encode(), "getNonce").await?;

        IEntryPoint::getNonceCall::abi_decode_returns(&result).context("Failed to decode nonce")
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.provider
            .get_code_at(address)
            .await
            .context("Failed to get code")
    }

    async fn get_sender_address(
        &self,
        factory: Address,
        owner: Address,
        salt: U256,
    ) -> Result<Address> {
        let call = ISimpleAccountFactory::getAddressCall { owner, salt };
        let result = self.eth_call(factory, call.abi_encode(), "getAddress").await?;

        ISimpleAccountFactory::getAddressCall::abi_decode_returns(&result)
            .context("Failed to decode account address")
    }

    async fn get_user_op_hash(&self, entry_point: Address, op: &UserOperation) -> Result<B256> {
        let call = IEntryPoint::getUserOpHashCall {
            userOp: UserOp::from(op),
        };
        let result = self
            .eth_call(entry_point, call.abi_encode(), "getUserOpHash")
            .await?;

        IEntryPoint::getUserOpHashCall::abi_decode_returns(&result)
            .context("Failed to decode user operation hash")
    }

    async fn estimate_fees(&self) -> Result<FeeEstimate> {
        match self.provider.estimate_eip1559_fees().await {
            Ok(fees) => Ok(FeeEstimate {
                max_fee_per_gas: U256::from(fees.max_fee_per_gas),
                max_priority_fee_per_gas: U256::from(fees.max_priority_fee_per_gas),
            }),
            Err(e) => {
                // Legacy chains have no fee history
                tracing::debug!("EIP-1559 fee estimate unavailable, using gas price: {}", e);
                let gas_price = self
                    .provider
                    .get_gas_price()
                    .await
                    .context("Failed to get gas price")?;
                Ok(FeeEstimate {
                    max_fee_per_gas: U256::from(gas_price),
                    max_priority_fee_per_gas: U256::from(gas_price),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_provider_builds_with_timeout_client() {
        assert_ok!(RpcAccountChain::new("http://localhost:8545"));
        assert!(RPC_TIMEOUT <= Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_rpc_url_is_rejected() {
        assert_err!(RpcAccountChain::new("not a url"));
    }
}
