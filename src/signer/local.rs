//! Local private key signer

use super::{DigestSigner, SignatureRequest, SignatureResponse};
use crate::encoding::decode_hex;
use alloy::primitives::{hex, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use eyre::{Context, Result};

/// Signs digests with a raw EVM private key.
///
/// Signatures are EIP-191 personal messages over the digest bytes, the form
/// smart accounts verify for user operation hashes.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    signer: PrivateKeySigner,
}

impl LocalSigner {
    /// Create a new LocalSigner from a private key hex string
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let signer = LocalSigner::from_private_key("0x...")?;
    /// ```
    pub fn from_private_key(private_key: impl AsRef<str>) -> Result<Self> {
        let key = private_key.as_ref();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let signer: PrivateKeySigner = key.parse().context("Failed to parse private key")?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl DigestSigner for LocalSigner {
    async fn sign_digest(&self, request: SignatureRequest) -> Result<SignatureResponse> {
        let digest = decode_hex(&request.digest).context("Digest is not hex")?;
        let signature = self
            .signer
            .sign_message(&digest)
            .await
            .context("Failed to sign digest")?;

        Ok(SignatureResponse::Signed(format!(
            "0x{}",
            hex::encode(signature.as_bytes())
        )))
    }
}
