//! External signer abstraction
//!
//! The pipeline never holds private keys. A digest is handed to a
//! `DigestSigner`, which can be:
//! - `IntentSigner`: forwards the request to an in-process wallet UI over a channel
//! - `RemoteSigner`: a REST signing service that approves requests asynchronously
//! - `LocalSigner`: an EVM private key, for tests and headless tooling

mod intent;
mod local;
mod remote;

pub use intent::{channel, IntentSigner, PendingSignature, SignatureInbox};
pub use local::LocalSigner;
pub use remote::RemoteSigner;

use crate::error::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Correlation data carried alongside a signature request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    pub command_id: Option<String>,
    pub command_type: String,
    pub suggestion_id: Option<String>,
}

/// Digest plus metadata, as presented to the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureRequest {
    /// Display hex, no 0x prefix
    pub digest: String,
    pub meta: RequestMeta,
}

impl SignatureRequest {
    pub fn new(digest: impl Into<String>, meta: RequestMeta) -> Self {
        Self {
            digest: digest.into(),
            meta,
        }
    }

    /// Intent body understood by wallet signers: `{ "data": "<digest>" }`
    pub fn intent_payload(&self) -> Value {
        json!({ "data": self.digest })
    }
}

/// Outcome of a signature request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureResponse {
    Signed(String),
    Cancelled,
}

impl SignatureResponse {
    /// Read an intent result of the form `{ "result": { "signature": "..." } }`.
    ///
    /// Anything without a non-empty signature counts as a cancellation.
    pub fn from_intent_result(value: &Value) -> Self {
        match value
            .pointer("/result/signature")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            Some(signature) => SignatureResponse::Signed(signature.to_string()),
            None => SignatureResponse::Cancelled,
        }
    }
}

/// Produces a signature over a digest
pub trait DigestSigner: Send + Sync {
    fn sign_digest(
        &self,
        request: SignatureRequest,
    ) -> impl std::future::Future<Output = Result<SignatureResponse>> + Send;
}

impl<S: DigestSigner> DigestSigner for Arc<S> {
    async fn sign_digest(&self, request: SignatureRequest) -> Result<SignatureResponse> {
        self.as_ref().sign_digest(request).await
    }
}
