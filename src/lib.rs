//! Transaction pipeline for Elastos wallets
//!
//! Turns wallet commands into signed chain transactions:
//!
//! - Classic path: command → payload → digest → external signature → raw
//!   transaction → ELA node broadcast
//! - ERC-4337 path: calls → user operation (nonce, initCode, gas) → entry
//!   point hash → signature → bundler → receipt polling
//!
//! Keys never enter the pipeline; signatures come from a [`DigestSigner`].
//!
//! # Example
//!
//! ```rust,ignore
//! use wallet_txflow::{
//!     ActiveContext, CommandPipeline, CommandRequest, ElaNodeClient, NetworkConfig,
//!     SignerConfig, WalletContext,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let network = NetworkConfig::from_env();
//!     let node = ElaNodeClient::from_config(&network)?;
//!     let (signer, mut inbox) = wallet_txflow::signer::channel(8);
//!
//!     // Present each digest to the user and answer it
//!     tokio::spawn(async move {
//!         while let Some(pending) = inbox.recv().await {
//!             pending.cancel();
//!         }
//!     });
//!
//!     let active = ActiveContext::new(WalletContext::new("wallet-1", network));
//!     let pipeline = CommandPipeline::new(signer, node, active, SignerConfig::from_env()?);
//!
//!     let request: CommandRequest = serde_json::from_str(r#"{
//!         "type": "withdraw",
//!         "data": { "amount": 500000000, "proposalHash": "...", "ownerPublicKey": "...", "recipient": "E..." }
//!     }"#)?;
//!     let outcome = pipeline.process(request, CancellationToken::new()).await;
//!     println!("{outcome:?}");
//!
//!     Ok(())
//! }
//! ```

pub mod aa;
pub mod builder;
pub mod command;
pub mod config;
pub mod constants;
pub mod context;
pub mod contracts;
pub mod coordinator;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod intent;
pub mod jsonrpc;
pub mod node;
pub mod pipeline;
pub mod signer;
pub mod submitter;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use aa::{BundlerClient, RpcAccountChain, UserOpOutcome, UserOpPipeline, UserOpStage};
pub use builder::PayloadBuilder;
pub use command::{Command, CommandKind, CommandRequest};
pub use config::{AccountAbstractionConfig, Backoff, NetworkConfig, PollingPolicy, SignerConfig};
pub use context::{ActiveContext, WalletContext, WalletLocks, WalletType};
pub use coordinator::SignatureCoordinator;
pub use digest::{compute_digest, Digest, DigestScheme};
pub use error::{eyre, Context, PipelineError, Presentation, Report, Result};
pub use intent::{ChannelResponder, Feedback, IntentResponder, IntentResponse, TracingFeedback};
pub use node::ElaNodeClient;
pub use pipeline::{CommandOutcome, CommandPipeline};
pub use signer::{DigestSigner, IntentSigner, LocalSigner, RemoteSigner};
pub use submitter::{Broadcaster, ElaTransactionEncoder, TransactionEncoder, TransactionSubmitter, TxResult};
pub use types::{Payload, SignedPayload, UserOperation, UserOperationReceipt};
