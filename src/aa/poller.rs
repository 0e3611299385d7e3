//! Bounded receipt polling

use super::bundler::BundlerApi;
use crate::config::PollingPolicy;
use crate::error::{PipelineError, Result};
use crate::types::UserOperationReceipt;
use alloy::primitives::B256;
use tokio_util::sync::CancellationToken;

/// Polls the bundler until a receipt shows up or the attempts run out
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptPoller {
    policy: PollingPolicy,
}

impl ReceiptPoller {
    pub fn new(policy: PollingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    /// Wait for the receipt of `user_op_hash`.
    ///
    /// Failed lookups count as attempts and are retried. Exhaustion yields
    /// `ReceiptTimeout`; the operation may still be mined later, and the
    /// caller can wait again with the same hash.
    pub async fn wait<B: BundlerApi>(
        &self,
        bundler: &B,
        user_op_hash: B256,
        cancel: &CancellationToken,
    ) -> Result<UserOperationReceipt> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match bundler.get_user_operation_receipt(user_op_hash).await {
                Ok(Some(receipt)) => {
                    tracing::info!(
                        "User operation {} mined in block {} (success: {})",
                        user_op_hash,
                        receipt.receipt.block_number,
                        receipt.success
                    );
                    return Ok(receipt);
                }
                Ok(None) => {
                    tracing::debug!(
                        "No receipt for {} yet (attempt {}/{})",
                        user_op_hash,
                        attempt,
                        max_attempts
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Receipt lookup for {} failed (attempt {}/{}): {:#}",
                        user_op_hash,
                        attempt,
                        max_attempts,
                        e
                    );
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        eyre::bail!("Receipt polling for {} cancelled", user_op_hash);
                    }
                    _ = tokio::time::sleep(self.policy.delay_after(attempt)) => {}
                }
            }
        }

        Err(PipelineError::ReceiptTimeout {
            user_op_hash,
            attempts: max_attempts,
        }
        .into())
    }
}
