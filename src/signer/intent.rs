//! In-process signer backed by a request channel
//!
//! The wallet UI owns the `SignatureInbox`, shows each pending request to the
//! user and answers it. Dropping a request without answering counts as a
//! cancellation.

use super::{DigestSigner, SignatureRequest, SignatureResponse};
use crate::error::Result;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// Create a connected signer / inbox pair
pub fn channel(capacity: usize) -> (IntentSigner, SignatureInbox) {
    let (tx, rx) = mpsc::channel(capacity);
    (IntentSigner { requests: tx }, SignatureInbox { requests: rx })
}

/// Signer half, held by the pipeline
#[derive(Debug, Clone)]
pub struct IntentSigner {
    requests: mpsc::Sender<PendingSignature>,
}

/// Receiving half, held by whatever presents requests to the user
#[derive(Debug)]
pub struct SignatureInbox {
    requests: mpsc::Receiver<PendingSignature>,
}

impl SignatureInbox {
    /// Next pending request, `None` once every signer handle is gone
    pub async fn recv(&mut self) -> Option<PendingSignature> {
        self.requests.recv().await
    }
}

/// A request waiting for the user's answer
#[derive(Debug)]
pub struct PendingSignature {
    pub request: SignatureRequest,
    responder: oneshot::Sender<SignatureResponse>,
}

impl PendingSignature {
    pub fn approve(self, signature: impl Into<String>) {
        self.respond(SignatureResponse::Signed(signature.into()));
    }

    pub fn cancel(self) {
        self.respond(SignatureResponse::Cancelled);
    }

    /// Answer with a raw intent result (`{ "result": { "signature": ... } }`)
    pub fn respond_with(self, result: &Value) {
        self.respond(SignatureResponse::from_intent_result(result));
    }

    fn respond(self, response: SignatureResponse) {
        // The requester may have timed out already
        let _ = self.responder.send(response);
    }
}

impl DigestSigner for IntentSigner {
    async fn sign_digest(&self, request: SignatureRequest) -> Result<SignatureResponse> {
        let (responder, answer) = oneshot::channel();
        tracing::debug!("Requesting signature for digest {}", request.digest);

        self.requests
            .send(PendingSignature { request, responder })
            .await
            .map_err(|_| eyre::eyre!("Signature inbox is closed"))?;

        Ok(answer.await.unwrap_or(SignatureResponse::Cancelled))
    }
}
