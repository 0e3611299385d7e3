//! ERC-4337 user operation pipeline
//!
//! Stages run strictly in order:
//! `Building → NonceResolved → Hashed → Signed → Submitted → Pending → Mined | TimedOut`.
//! Submission to the bundler is the commit point; nothing after it is retried.

pub mod batch;
pub mod bundler;
pub mod chain;
pub mod poller;
pub mod resolver;

pub use batch::{decode_batch, encode_batch};
pub use bundler::{BundlerApi, BundlerClient};
pub use chain::{AccountChain, RpcAccountChain};
pub use poller::ReceiptPoller;
pub use resolver::{build_init_code, AccountResolver, ResolvedAccount};

use crate::command::{CommandKind, UserOperationData};
use crate::config::AccountAbstractionConfig;
use crate::constants::DUMMY_SIGNATURE;
use crate::coordinator::SignatureCoordinator;
use crate::encoding::decode_hex;
use crate::error::{classify, invalid, PipelineError, Result};
use crate::signer::{DigestSigner, RequestMeta, SignatureRequest};
use crate::types::{Call, UserOperation, UserOperationReceipt};
use alloy::primitives::{hex, Address, Bytes, B256, U256};
use eyre::Context;
use std::future::Future;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Where a user operation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOpStage {
    Building,
    NonceResolved,
    Hashed,
    Signed,
    Submitted,
    Pending,
    Mined,
    TimedOut,
}

/// Calls to run through the owner's smart account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOpRequest {
    pub owner: Address,
    /// Known account address; derived from the factory when absent
    pub sender: Option<Address>,
    pub calls: Vec<Call>,
}

impl UserOpRequest {
    pub fn from_data(data: &UserOperationData, owner: Option<Address>) -> Result<Self> {
        let owner = owner.ok_or_else(|| invalid("wallet has no EVM owner account"))?;
        if data.calls.is_empty() {
            return Err(invalid("a user operation needs at least one call"));
        }

        let calls = data
            .calls
            .iter()
            .map(|input| {
                let value = match &input.value {
                    Some(value) => {
                        let text = value.as_decimal();
                        U256::from_str(&text)
                            .map_err(|_| invalid(format!("call value {text:?} is not an integer")))?
                    }
                    None => U256::ZERO,
                };
                Ok(Call::new(input.to, input.data.clone().unwrap_or_default()).with_value(value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            owner,
            sender: data.sender,
            calls,
        })
    }
}

/// Result of a submitted user operation
#[derive(Debug, Clone, PartialEq)]
pub struct UserOpOutcome {
    pub user_op_hash: B256,
    /// `None` when polling ran out before the operation was mined
    pub receipt: Option<UserOperationReceipt>,
    /// Every stage the operation went through, in order
    pub history: Vec<UserOpStage>,
}

impl UserOpOutcome {
    pub fn stage(&self) -> Option<UserOpStage> {
        self.history.last().copied()
    }
}

/// Runs user operations on behalf of the command pipeline
pub trait UserOpRunner: Send + Sync {
    /// `Ok(None)` when the user did not sign
    fn run_user_operation<S: DigestSigner>(
        &self,
        request: UserOpRequest,
        coordinator: &SignatureCoordinator<S>,
        meta: RequestMeta,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Option<UserOpOutcome>>> + Send;
}

/// Runner for deployments without account abstraction
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAccountAbstraction;

impl UserOpRunner for NoAccountAbstraction {
    async fn run_user_operation<S: DigestSigner>(
        &self,
        _request: UserOpRequest,
        _coordinator: &SignatureCoordinator<S>,
        _meta: RequestMeta,
        _cancel: &CancellationToken,
    ) -> Result<Option<UserOpOutcome>> {
        Err(PipelineError::UnsupportedCommandType(CommandKind::UserOperation.to_string()).into())
    }
}

/// Stage history with a log line per transition
struct Stages(Vec<UserOpStage>);

impl Stages {
    fn enter(&mut self, stage: UserOpStage) {
        tracing::info!("User operation stage: {:?}", stage);
        self.0.push(stage);
    }
}

pub struct UserOpPipeline<C, B> {
    chain: C,
    bundler: B,
    resolver: AccountResolver,
    poller: ReceiptPoller,
    entry_point: Address,
    chain_id: u64,
}

impl UserOpPipeline<RpcAccountChain, BundlerClient> {
    /// Pipeline over the configured EVM node and bundler
    pub fn from_config(config: &AccountAbstractionConfig) -> Result<Self> {
        let chain = RpcAccountChain::new(&config.rpc_url)?;
        let bundler = BundlerClient::new(config.bundler_url.clone())?;
        Ok(Self::new(chain, bundler, config))
    }
}

impl<C: AccountChain, B: BundlerApi> UserOpPipeline<C, B> {
    pub fn new(chain: C, bundler: B, config: &AccountAbstractionConfig) -> Self {
        Self {
            chain,
            bundler,
            resolver: AccountResolver::new(config.entry_point, config.factory, config.salt),
            poller: ReceiptPoller::new(config.polling),
            entry_point: config.entry_point,
            chain_id: config.chain_id,
        }
    }

    pub fn bundler(&self) -> &B {
        &self.bundler
    }

    pub fn poller(&self) -> &ReceiptPoller {
        &self.poller
    }

    /// Assemble an unsigned operation with fees and gas limits filled in
    pub async fn build(&self, request: &UserOpRequest) -> Result<UserOperation> {
        let account = self
            .resolver
            .resolve(&self.chain, request.owner, request.sender)
            .await?;
        self.assemble(request, account).await
    }

    async fn assemble(
        &self,
        request: &UserOpRequest,
        account: ResolvedAccount,
    ) -> Result<UserOperation> {
        let call_data = encode_batch(&request.calls)?;
        let fees = self.chain.estimate_fees().await?;

        let mut op = UserOperation {
            sender: account.sender,
            nonce: account.nonce,
            init_code: account.init_code,
            call_data,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            signature: Bytes::from(decode_hex(DUMMY_SIGNATURE)?),
            ..Default::default()
        };

        let gas = self
            .bundler
            .estimate_user_operation_gas(&op, self.entry_point)
            .await
            .context("Failed to estimate user operation gas")?;
        op.call_gas_limit = gas.call_gas_limit;
        op.verification_gas_limit = gas.verification_gas_limit;
        op.pre_verification_gas = gas.pre_verification_gas;

        Ok(op.unsigned())
    }

    /// Hash the entry point will check, cross-checked against the offline hash
    async fn user_op_hash(&self, op: &UserOperation) -> Result<B256> {
        let hash = self
            .chain
            .get_user_op_hash(self.entry_point, op)
            .await
            .context("Failed to get user operation hash")?;

        let offline = op.hash(self.entry_point, self.chain_id);
        if offline != hash {
            tracing::warn!(
                "Entry point hash {} differs from local hash {} (chain id {})",
                hash,
                offline,
                self.chain_id
            );
        }
        Ok(hash)
    }

    async fn run<S: DigestSigner>(
        &self,
        request: UserOpRequest,
        coordinator: &SignatureCoordinator<S>,
        meta: RequestMeta,
        cancel: &CancellationToken,
    ) -> Result<Option<UserOpOutcome>> {
        let mut stages = Stages(Vec::new());
        stages.enter(UserOpStage::Building);

        let account = self
            .resolver
            .resolve(&self.chain, request.owner, request.sender)
            .await?;
        stages.enter(UserOpStage::NonceResolved);

        let op = self.assemble(&request, account).await?;
        let hash = self.user_op_hash(&op).await?;
        stages.enter(UserOpStage::Hashed);

        let signature = match coordinator
            .request_signature(SignatureRequest::new(hex::encode(hash), meta), cancel)
            .await?
        {
            Some(signature) => signature,
            None => return Ok(None),
        };
        let op = op.with_signature(Bytes::from(decode_hex(&signature)?));
        stages.enter(UserOpStage::Signed);

        let user_op_hash = self.bundler.send_user_operation(&op, self.entry_point).await?;
        if user_op_hash != hash {
            tracing::warn!("Bundler returned hash {} for operation {}", user_op_hash, hash);
        }
        stages.enter(UserOpStage::Submitted);

        stages.enter(UserOpStage::Pending);
        let receipt = match self.poller.wait(&self.bundler, user_op_hash, cancel).await {
            Ok(receipt) => {
                stages.enter(UserOpStage::Mined);
                Some(receipt)
            }
            Err(e) => {
                if matches!(classify(&e), Some(PipelineError::ReceiptTimeout { .. })) {
                    stages.enter(UserOpStage::TimedOut);
                }
                tracing::warn!("Unable to confirm user operation {}: {:#}", user_op_hash, e);
                None
            }
        };

        Ok(Some(UserOpOutcome {
            user_op_hash,
            receipt,
            history: stages.0,
        }))
    }
}

impl<C: AccountChain, B: BundlerApi> UserOpRunner for UserOpPipeline<C, B> {
    async fn run_user_operation<S: DigestSigner>(
        &self,
        request: UserOpRequest,
        coordinator: &SignatureCoordinator<S>,
        meta: RequestMeta,
        cancel: &CancellationToken,
    ) -> Result<Option<UserOpOutcome>> {
        self.run(request, coordinator, meta, cancel).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{PollingPolicy, SignerConfig};
    use crate::signer::{LocalSigner, SignatureResponse};
    use crate::types::{FeeEstimate, GasEstimate, TransactionReceiptInfo};
    use alloy::primitives::address;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    pub(crate) const CHAIN_ID: u64 = 20;
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// In-memory entry point / factory / fee source
    pub(crate) struct MockChain {
        pub sender: Address,
        pub nonce: U256,
        pub code: Bytes,
    }

    impl Default for MockChain {
        fn default() -> Self {
            Self {
                sender: address!("3333333333333333333333333333333333333333"),
                nonce: U256::ZERO,
                code: Bytes::new(),
            }
        }
    }

    impl AccountChain for MockChain {
        async fn get_nonce(&self, _entry_point: Address, _sender: Address) -> Result<U256> {
            Ok(self.nonce)
        }

        async fn get_code(&self, _address: Address) -> Result<Bytes> {
            Ok(self.code.clone())
        }

        async fn get_sender_address(
            &self,
            _factory: Address,
            _owner: Address,
            _salt: U256,
        ) -> Result<Address> {
            Ok(self.sender)
        }

        async fn get_user_op_hash(&self, entry_point: Address, op: &UserOperation) -> Result<B256> {
            Ok(op.hash(entry_point, CHAIN_ID))
        }

        async fn estimate_fees(&self) -> Result<FeeEstimate> {
            Ok(FeeEstimate {
                max_fee_per_gas: U256::from(2_000_000_000u64),
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            })
        }
    }

    /// Bundler stub with scripted receipt lookups
    #[derive(Default)]
    pub(crate) struct MockBundler {
        receipt: Option<UserOperationReceipt>,
        receipt_on: u32,
        failing: u32,
        receipt_calls: AtomicU32,
        pub sent: Mutex<Vec<UserOperation>>,
        pub estimated: Mutex<Vec<UserOperation>>,
        pub reject_send: Option<String>,
        reject_estimate: Option<String>,
    }

    impl MockBundler {
        /// Return `receipt` from the `attempt`-th lookup on
        pub fn receipt_after(mut self, attempt: u32, receipt: UserOperationReceipt) -> Self {
            self.receipt = Some(receipt);
            self.receipt_on = attempt;
            self
        }

        /// Fail the first `count` lookups with a transport error
        pub fn failing_lookups(mut self, count: u32) -> Self {
            self.failing = count;
            self
        }

        /// Fail gas estimation with a bundler RPC error carrying `message`
        pub fn rejecting_estimate(mut self, message: &str) -> Self {
            self.reject_estimate = Some(message.to_string());
            self
        }

        pub fn receipt_calls(&self) -> u32 {
            self.receipt_calls.load(Ordering::SeqCst)
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl BundlerApi for MockBundler {
        async fn send_user_operation(
            &self,
            op: &UserOperation,
            entry_point: Address,
        ) -> Result<B256> {
            self.sent.lock().unwrap().push(op.clone());
            match &self.reject_send {
                Some(message) => Err(PipelineError::BundlerRpc {
                    code: Some(-32500),
                    message: message.clone(),
                }
                .into()),
                None => Ok(op.hash(entry_point, CHAIN_ID)),
            }
        }

        async fn estimate_user_operation_gas(
            &self,
            op: &UserOperation,
            _entry_point: Address,
        ) -> Result<GasEstimate> {
            self.estimated.lock().unwrap().push(op.clone());
            if let Some(message) = &self.reject_estimate {
                return Err(PipelineError::BundlerRpc {
                    code: Some(-32500),
                    message: message.clone(),
                }
                .into());
            }
            Ok(GasEstimate {
                pre_verification_gas: U256::from(50_000),
                verification_gas_limit: U256::from(400_000),
                call_gas_limit: U256::from(120_000),
            })
        }

        async fn get_user_operation_receipt(
            &self,
            _user_op_hash: B256,
        ) -> Result<Option<UserOperationReceipt>> {
            let call = self.receipt_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failing {
                eyre::bail!("connection reset by peer");
            }
            match &self.receipt {
                Some(receipt) if call >= self.receipt_on => Ok(Some(receipt.clone())),
                _ => Ok(None),
            }
        }
    }

    pub(crate) fn sample_receipt() -> UserOperationReceipt {
        UserOperationReceipt {
            user_op_hash: B256::repeat_byte(0xab),
            entry_point: None,
            sender: address!("3333333333333333333333333333333333333333"),
            nonce: U256::ZERO,
            paymaster: None,
            actual_gas_cost: U256::from(21_000),
            actual_gas_used: U256::from(21_000),
            success: true,
            reason: None,
            logs: Vec::new(),
            receipt: TransactionReceiptInfo {
                transaction_hash: B256::repeat_byte(0xcd),
                transaction_index: None,
                block_hash: B256::repeat_byte(0xef),
                block_number: U256::from(16),
                from: None,
                to: None,
                cumulative_gas_used: None,
                gas_used: U256::from(21_000),
                effective_gas_price: None,
                status: None,
            },
        }
    }

    fn config(attempts: u32) -> AccountAbstractionConfig {
        AccountAbstractionConfig::new()
            .with_polling(PollingPolicy::fixed(Duration::from_millis(2000), attempts))
    }

    fn request() -> UserOpRequest {
        UserOpRequest {
            owner: address!("00000000000000000000000000000000000000e1"),
            sender: None,
            calls: vec![
                Call::new(address!("1111111111111111111111111111111111111111"), vec![0x01]),
                Call::new(address!("2222222222222222222222222222222222222222"), vec![0x02]),
            ],
        }
    }

    fn local_coordinator() -> SignatureCoordinator<LocalSigner> {
        SignatureCoordinator::new(
            LocalSigner::from_private_key(KEY).unwrap(),
            SignerConfig::default(),
        )
    }

    struct Refusing;

    impl DigestSigner for Refusing {
        async fn sign_digest(&self, _request: SignatureRequest) -> Result<SignatureResponse> {
            Ok(SignatureResponse::Cancelled)
        }
    }

    #[tokio::test]
    async fn test_build_fills_gas_and_batch() {
        let bundler = MockBundler::default();
        let pipeline = UserOpPipeline::new(MockChain::default(), bundler, &config(3));
        let op = pipeline.build(&request()).await.unwrap();

        assert!(op.signature.is_empty());
        assert!(op.deploys_account());
        assert_eq!(op.call_gas_limit, U256::from(120_000));
        assert_eq!(op.verification_gas_limit, U256::from(400_000));
        assert_eq!(decode_batch(&op.call_data).unwrap(), request().calls);

        // gas was estimated with the dummy signature in place
        let estimated = pipeline.bundler().estimated.lock().unwrap();
        assert_eq!(estimated[0].signature.len(), 65);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mined_operation_history() {
        let bundler = MockBundler::default().receipt_after(2, sample_receipt());
        let pipeline = UserOpPipeline::new(MockChain::default(), bundler, &config(5));

        let outcome = pipeline
            .run_user_operation(
                request(),
                &local_coordinator(),
                RequestMeta::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            outcome.history,
            vec![
                UserOpStage::Building,
                UserOpStage::NonceResolved,
                UserOpStage::Hashed,
                UserOpStage::Signed,
                UserOpStage::Submitted,
                UserOpStage::Pending,
                UserOpStage::Mined,
            ]
        );
        assert!(outcome.receipt.is_some());

        let sent = pipeline.bundler().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].signature.len(), 65);
        assert_eq!(outcome.user_op_hash, sent[0].hash(config(5).entry_point, CHAIN_ID));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_operation_times_out() {
        let pipeline = UserOpPipeline::new(MockChain::default(), MockBundler::default(), &config(3));
        let outcome = pipeline
            .run_user_operation(
                request(),
                &local_coordinator(),
                RequestMeta::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.stage(), Some(UserOpStage::TimedOut));
        assert!(outcome.receipt.is_none());
        assert_eq!(pipeline.bundler().receipt_calls(), 3);
    }

    #[tokio::test]
    async fn test_refused_signature_submits_nothing() {
        let pipeline = UserOpPipeline::new(MockChain::default(), MockBundler::default(), &config(3));
        let coordinator = SignatureCoordinator::new(Refusing, SignerConfig::default());

        let outcome = pipeline
            .run_user_operation(request(), &coordinator, RequestMeta::default(), &CancellationToken::new())
            .await;

        assert_eq!(tokio_test::assert_ok!(outcome), None);
        assert_eq!(pipeline.bundler().sent_count(), 0);
    }

    #[tokio::test]
    async fn test_bundler_rejection_is_fatal() {
        let bundler = MockBundler {
            reject_send: Some("AA25 invalid account nonce".into()),
            ..Default::default()
        };
        let pipeline = UserOpPipeline::new(MockChain::default(), bundler, &config(3));

        let result = pipeline
            .run_user_operation(
                request(),
                &local_coordinator(),
                RequestMeta::default(),
                &CancellationToken::new(),
            )
            .await;
        let err = tokio_test::assert_err!(result);

        assert!(matches!(classify(&err), Some(PipelineError::BundlerRpc { .. })));
        assert_eq!(pipeline.bundler().sent_count(), 1);
        assert_eq!(pipeline.bundler().receipt_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_account_abstraction_is_unsupported() {
        let err = NoAccountAbstraction
            .run_user_operation(
                request(),
                &local_coordinator(),
                RequestMeta::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(PipelineError::UnsupportedCommandType(_))
        ));
    }

    #[test]
    fn test_request_from_command_data() {
        let data: UserOperationData = serde_json::from_value(serde_json::json!({
            "calls": [
                { "to": "0x1111111111111111111111111111111111111111", "value": "0x10" },
                { "to": "0x2222222222222222222222222222222222222222", "value": 5, "data": "0xabcd" }
            ]
        }))
        .unwrap();

        let owner = address!("00000000000000000000000000000000000000e1");
        let request = UserOpRequest::from_data(&data, Some(owner)).unwrap();
        assert_eq!(request.calls[0].value, U256::from(16));
        assert_eq!(request.calls[1].value, U256::from(5));
        assert_eq!(request.calls[1].data, Bytes::from(vec![0xab, 0xcd]));

        let err = UserOpRequest::from_data(&data, None).unwrap_err();
        assert!(matches!(classify(&err), Some(PipelineError::Validation(_))));
    }
}
