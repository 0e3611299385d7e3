//! Transaction submitter: signed payload → raw transaction → broadcast

use crate::context::WalletContext;
use crate::encoding::{decode_hex, ElaWriter};
use crate::error::{PipelineError, Result};
use crate::types::{RawTransaction, SignedPayload, TxKind};
use eyre::Context;
use std::sync::Arc;

/// Transaction format version
const TX_VERSION: u8 = 0x09;

/// Version byte of every payload this crate produces
const PAYLOAD_VERSION: u8 = 0x00;

/// Turns a signed payload into its chain encoding
pub trait TransactionEncoder: Send + Sync {
    fn encode(&self, signed: &SignedPayload) -> Result<RawTransaction>;
}

/// Sends raw transactions to a chain node
pub trait Broadcaster: Send + Sync {
    /// Broadcast once, returning the transaction id
    fn broadcast(
        &self,
        raw: &RawTransaction,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

impl<B: Broadcaster> Broadcaster for Arc<B> {
    async fn broadcast(&self, raw: &RawTransaction) -> Result<String> {
        self.as_ref().broadcast(raw).await
    }
}

/// Main chain encoding with no inputs or outputs.
///
/// Fees for council transactions are paid by the node's fee policy, the
/// signature rides inside the payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElaTransactionEncoder;

impl TransactionEncoder for ElaTransactionEncoder {
    fn encode(&self, signed: &SignedPayload) -> Result<RawTransaction> {
        let kind = TxKind::of(&signed.payload);
        let signature = decode_hex(&signed.signature).context("Signature is not hex")?;

        let mut w = ElaWriter::new();
        w.write_u8(TX_VERSION).write_u8(kind as u8).write_u8(PAYLOAD_VERSION);
        signed.payload.encode_unsigned(&mut w)?;
        w.write_var_bytes(&signature)
            // attributes, inputs, outputs
            .write_var_uint(0)
            .write_var_uint(0)
            .write_var_uint(0)
            .write_u32(0)
            // programs
            .write_var_uint(0);

        Ok(RawTransaction::new(kind, w.as_bytes()))
    }
}

/// Result of a successful broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub txid: String,
    pub raw: RawTransaction,
}

pub struct TransactionSubmitter<B> {
    encoder: Arc<dyn TransactionEncoder>,
    broadcaster: B,
}

impl<B: Broadcaster> TransactionSubmitter<B> {
    pub fn new(broadcaster: B) -> Self {
        Self {
            encoder: Arc::new(ElaTransactionEncoder),
            broadcaster,
        }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn TransactionEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    /// Encode and broadcast exactly once. Rejections are not retried.
    pub async fn submit(&self, signed: &SignedPayload, wallet: &WalletContext) -> Result<TxResult> {
        if signed.signature.trim().is_empty() {
            eyre::bail!("Refusing to submit an unsigned {} payload", signed.payload.kind());
        }
        if wallet.chain_code != wallet.network.chain_code {
            return Err(PipelineError::ChainMismatch {
                wallet: wallet.chain_code.clone(),
                network: wallet.network.chain_code.clone(),
            }
            .into());
        }

        let raw = self.encoder.encode(signed)?;
        tracing::info!(
            "Broadcasting {} transaction ({} bytes) to {}",
            signed.payload.kind(),
            raw.hex().len() / 2,
            wallet.network.network
        );

        let txid = self.broadcaster.broadcast(&raw).await?;
        tracing::info!("Transaction accepted: {}", txid);
        Ok(TxResult { txid, raw })
    }
}
