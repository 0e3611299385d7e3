//! Error types for the transaction pipeline
//!
//! Uses `eyre` for ergonomic error handling with context. Failures that the
//! top-level handler must tell apart travel inside the report as a
//! [`PipelineError`] and are recovered with [`classify`].

use alloy::primitives::B256;
use std::time::Duration;

pub use eyre::{eyre, Context, Report, Result};

/// Failures with a defined user-facing treatment
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The command `type` matches no known variant
    #[error("unsupported command type: {0}")]
    UnsupportedCommandType(String),

    /// Local validation failed before any network call
    #[error("invalid command: {0}")]
    Validation(String),

    /// No digest can be computed for the payload
    #[error("digest computation failed: {0}")]
    DigestComputation(String),

    /// The user dismissed the external signer
    #[error("signing request was cancelled")]
    SigningCancelled,

    /// The external signer did not answer in time
    #[error("signing request timed out after {0:?}")]
    SigningTimeout(Duration),

    /// Another command is already in flight for this wallet
    #[error("wallet {0} already has a command in flight")]
    WalletBusy(String),

    /// The wallet belongs to a different chain than the active network
    #[error("wallet chain {wallet} does not match active network chain {network}")]
    ChainMismatch { wallet: String, network: String },

    /// The bundler answered without a result
    #[error("bundler rpc error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    BundlerRpc { code: Option<i64>, message: String },

    /// The chain node rejected the raw transaction
    #[error("broadcast rejected: {0}")]
    Broadcast(String),

    /// The user operation was accepted but no receipt showed up in time
    #[error("no receipt for user operation {user_op_hash} after {attempts} attempts")]
    ReceiptTimeout { user_op_hash: B256, attempts: u32 },
}

/// How a failed command is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Abort without any message
    Silent,
    /// Blocking popup carrying the error message
    Popup,
    /// "Unable to confirm": the operation may still land on-chain
    Unconfirmed,
}

impl PipelineError {
    pub fn presentation(&self) -> Presentation {
        match self {
            PipelineError::SigningCancelled | PipelineError::SigningTimeout(_) => {
                Presentation::Silent
            }
            PipelineError::ReceiptTimeout { .. } => Presentation::Unconfirmed,
            PipelineError::UnsupportedCommandType(_)
            | PipelineError::Validation(_)
            | PipelineError::DigestComputation(_)
            | PipelineError::WalletBusy(_)
            | PipelineError::ChainMismatch { .. }
            | PipelineError::BundlerRpc { .. }
            | PipelineError::Broadcast(_) => Presentation::Popup,
        }
    }
}

/// Shorthand for a validation failure wrapped in a report
pub fn invalid(message: impl Into<String>) -> Report {
    PipelineError::Validation(message.into()).into()
}

/// Recover the typed error from anywhere in the report chain
pub fn classify(report: &Report) -> Option<&PipelineError> {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
}

/// Presentation for an arbitrary report; untyped failures are popups
pub fn presentation_of(report: &Report) -> Presentation {
    classify(report)
        .map(PipelineError::presentation)
        .unwrap_or(Presentation::Popup)
}
