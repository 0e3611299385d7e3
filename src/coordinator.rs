//! Digest / signature coordination
//!
//! Computes the digest of a payload, asks the external signer for a
//! signature and waits for exactly one answer. Cancellation, a dismissed
//! request and an expired wait all end in "no signature" rather than an
//! error, so nothing downstream can broadcast.

use crate::config::SignerConfig;
use crate::digest::compute_digest;
use crate::encoding::decode_hex;
use crate::error::{classify, PipelineError, Result};
use crate::signer::{DigestSigner, RequestMeta, SignatureRequest, SignatureResponse};
use crate::types::{Payload, SignedPayload};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct SignatureCoordinator<S> {
    signer: S,
    timeout: Duration,
}

impl<S: DigestSigner> SignatureCoordinator<S> {
    pub fn new(signer: S, config: SignerConfig) -> Self {
        Self {
            signer,
            timeout: config.timeout,
        }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Sign a classic payload.
    ///
    /// `Ok(None)` means the user did not sign; digest errors are returned
    /// before the signer is ever contacted.
    pub async fn sign(
        &self,
        payload: Payload,
        meta: RequestMeta,
        cancel: &CancellationToken,
    ) -> Result<Option<SignedPayload>> {
        let digest = compute_digest(&payload)?.to_hex();
        let request = SignatureRequest::new(digest.clone(), meta);

        let signed = self
            .request_signature(request, cancel)
            .await?
            .map(|signature| SignedPayload {
                payload,
                digest,
                signature,
            });
        Ok(signed)
    }

    /// Forward an already computed digest and wait for one answer
    pub async fn request_signature(
        &self,
        request: SignatureRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let command_type = request.meta.command_type.clone();

        let answer = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Signing {} cancelled by caller", command_type);
                return Ok(None);
            }
            answer = tokio::time::timeout(self.timeout, self.signer.sign_digest(request)) => answer,
        };

        let response = match answer {
            Err(_) => {
                tracing::warn!("Signer did not answer {} within {:?}", command_type, self.timeout);
                return Ok(None);
            }
            Ok(Err(e)) => match classify(&e) {
                Some(PipelineError::SigningCancelled) | Some(PipelineError::SigningTimeout(_)) => {
                    tracing::info!("Signing {} ended without a signature: {}", command_type, e);
                    return Ok(None);
                }
                _ => return Err(e),
            },
            Ok(Ok(response)) => response,
        };

        match response {
            SignatureResponse::Cancelled => {
                tracing::info!("User dismissed signing {}", command_type);
                Ok(None)
            }
            SignatureResponse::Signed(signature) => {
                decode_hex(&signature)
                    .map_err(|_| eyre::eyre!("Signer returned a non-hex signature"))?;
                Ok(Some(signature))
            }
        }
    }
}
